//! dgr-core: Dangerous Goods Lookup Core Library
//!
//! Configuration, error types, record models, the data-store lookup client
//! and reply formatting for the DGR lookup bot.

pub mod config;
pub mod error;
pub mod format;
pub mod lookup;
pub mod models;

pub use config::{Config, LookupConfig, SupabaseConfig, TelegramConfig};
pub use error::{Error, LookupError, LookupResult, Result};
pub use lookup::{HazmatLookup, SupabaseClient};
pub use models::{DgrClass, HazmatRecord};
