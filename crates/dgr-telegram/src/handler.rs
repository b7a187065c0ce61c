//! Conversation handler
//!
//! Maps inbound events to replies, driving the per-conversation
//! pending-input flag:
//!
//! - `IDLE` (flag false): free text is ignored.
//! - `AWAITING_INPUT` (flag true): the next text message is looked up as a
//!   UN number and the flag is cleared whatever the outcome.
//!
//! Independent of Telegram types apart from [`Menu`], so it can be driven
//! directly in tests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use dgr_core::format::{self, escape_html};
use dgr_core::lookup::{self, HazmatLookup};
use dgr_core::LookupConfig;

use crate::commands::Command;
use crate::menu::{Action, Menu};
use crate::session::{ConversationKey, InMemorySessionStore};

pub const WELCOME_TEXT: &str = "Welcome! Please choose an action.";
pub const START_APP_TEXT: &str =
    "You have started the app! Click the button below to check a UN number:";
pub const UN_PROMPT_TEXT: &str = "Please enter the UN number (e.g., 1023):";
pub const UN_LOOKUP_FAILED_TEXT: &str =
    "There was an error fetching the UN number. Please try again.";
pub const CLASSES_FAILED_TEXT: &str =
    "There was an error fetching the DGR classes. Please try again.";
pub const NO_CLASSES_TEXT: &str = "No DGR classes found.";

/// An inbound event from the messaging client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Action(Action),
    Text(String),
}

/// Outbound reply: HTML text with an optional inline menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub menu: Option<Menu>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            menu: None,
        }
    }

    pub fn with_menu(text: impl Into<String>, menu: Menu) -> Self {
        Self {
            text: text.into(),
            menu: Some(menu),
        }
    }
}

/// Routes events to lookups and replies
pub struct ConversationHandler {
    lookup: Arc<dyn HazmatLookup>,
    sessions: InMemorySessionStore,
    lookup_timeout: Duration,
    class_list_limit: usize,
}

impl ConversationHandler {
    pub fn new(lookup: Arc<dyn HazmatLookup>, config: &LookupConfig) -> Self {
        Self {
            lookup,
            sessions: InMemorySessionStore::new(),
            lookup_timeout: Duration::from_secs(config.timeout_secs),
            class_list_limit: config.class_list_limit,
        }
    }

    /// Override the per-lookup timeout
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &InMemorySessionStore {
        &self.sessions
    }

    /// Handle one event for `key`.
    ///
    /// Returns the reply to send, or `None` when the event produces no reply.
    /// The conversation's session stays locked until the reply is built.
    pub async fn handle(&self, key: ConversationKey, event: Inbound) -> Option<Reply> {
        let slot = self.sessions.slot(key);
        let mut session = slot.lock().await;

        match event {
            Inbound::Command(Command::Start) => {
                info!("Received /start from {}", key);
                Some(Reply::with_menu(WELCOME_TEXT, Menu::Main))
            }
            Inbound::Command(Command::Help) => {
                info!("Received /help from {}", key);
                Some(Reply::text(help_text()))
            }
            Inbound::Command(Command::Uncheck) | Inbound::Action(Action::UnCheck) => {
                info!("UN check requested by {}", key);
                session.begin_un_check();
                Some(Reply::text(UN_PROMPT_TEXT))
            }
            Inbound::Action(Action::StartApp) => {
                info!("Start App selected by {}", key);
                Some(Reply::with_menu(START_APP_TEXT, Menu::StartApp))
            }
            Inbound::Action(Action::ListDgrClasses) => {
                info!("List DGR Classes selected by {}", key);
                Some(self.list_classes().await)
            }
            Inbound::Text(text) => {
                if !session.take_awaiting() {
                    return None;
                }
                Some(self.lookup_un_number(key, text.trim()).await)
            }
        }
    }

    async fn lookup_un_number(&self, key: ConversationKey, un_number: &str) -> Reply {
        info!("User {} entered UN number: {}", key, un_number);

        if un_number.is_empty() {
            warn!("Empty UN number from {}", key);
            return Reply::text(format::not_found(un_number));
        }

        let result = lookup::bounded(
            self.lookup_timeout,
            self.lookup.find_by_un_number(un_number),
        )
        .await;

        match result {
            Ok(rows) => match rows.first() {
                Some(record) => Reply::text(format::format_record(un_number, record)),
                None => Reply::text(format::not_found(un_number)),
            },
            Err(e) => {
                error!("Error looking up UN number {}: {}", un_number, e);
                Reply::text(UN_LOOKUP_FAILED_TEXT)
            }
        }
    }

    async fn list_classes(&self) -> Reply {
        match lookup::bounded(self.lookup_timeout, self.lookup.list_classes()).await {
            Ok(classes) if classes.is_empty() => Reply::text(NO_CLASSES_TEXT),
            Ok(classes) => Reply::text(format::format_class_list(&classes, self.class_list_limit)),
            Err(e) => {
                error!("Error fetching DGR classes: {}", e);
                Reply::text(CLASSES_FAILED_TEXT)
            }
        }
    }
}

fn help_text() -> String {
    use teloxide::utils::command::BotCommands;

    format!(
        "<b>DGR lookup bot</b>\n\n{}",
        escape_html(&Command::descriptions().to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dgr_core::{DgrClass, HazmatRecord, LookupError, LookupResult};

    const KEY: ConversationKey = ConversationKey {
        chat_id: 1001,
        user_id: 1001,
    };

    /// In-memory lookup with canned rows
    #[derive(Default)]
    struct ScriptedLookup {
        rows: HashMap<String, Vec<HazmatRecord>>,
        classes: Vec<DgrClass>,
        fail: bool,
        delay: Option<Duration>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }

        fn failure(table: &'static str) -> LookupError {
            LookupError::Store {
                table,
                status: 503,
                message: "unavailable".to_string(),
            }
        }
    }

    #[async_trait]
    impl HazmatLookup for ScriptedLookup {
        async fn find_by_un_number(&self, key: &str) -> LookupResult<Vec<HazmatRecord>> {
            self.queries.lock().unwrap().push(key.to_string());
            self.pause().await;
            if self.fail {
                return Err(Self::failure("dgr_un_list"));
            }
            Ok(self.rows.get(key).cloned().unwrap_or_default())
        }

        async fn list_classes(&self) -> LookupResult<Vec<DgrClass>> {
            self.pause().await;
            if self.fail {
                return Err(Self::failure("dgr_classes"));
            }
            Ok(self.classes.clone())
        }
    }

    fn coal_gas() -> HazmatRecord {
        HazmatRecord {
            un_number: Some("1023".to_string()),
            name_description: Some("Coal gas, compressed".to_string()),
            class_division: Some("2.3".to_string()),
            sub_risk: Some("2.1".to_string()),
            packing_group: Some(String::new()),
            special_provision: None,
            limited_quantities: Some("Forbidden".to_string()),
            excepted_quantity: Some("E0".to_string()),
        }
    }

    fn classes(n: usize) -> Vec<DgrClass> {
        (1..=n)
            .map(|i| DgrClass {
                icao_class: Some(format!("{}", i)),
                description: Some(format!("Class {}", i)),
                iata_code: Some(format!("R{}", i)),
            })
            .collect()
    }

    fn handler_with(lookup: ScriptedLookup) -> (ConversationHandler, Arc<ScriptedLookup>) {
        let lookup = Arc::new(lookup);
        let handler = ConversationHandler::new(lookup.clone(), &LookupConfig::default());
        (handler, lookup)
    }

    fn seeded() -> (ConversationHandler, Arc<ScriptedLookup>) {
        let mut rows = HashMap::new();
        rows.insert("1023".to_string(), vec![coal_gas()]);
        handler_with(ScriptedLookup {
            rows,
            classes: classes(3),
            ..Default::default()
        })
    }

    async fn begin_check(handler: &ConversationHandler) {
        handler.handle(KEY, Inbound::Action(Action::UnCheck)).await;
    }

    #[tokio::test]
    async fn test_start_replies_with_main_menu() {
        let (handler, _) = seeded();

        let reply = handler.handle(KEY, Inbound::Command(Command::Start)).await.unwrap();

        assert_eq!(reply, Reply::with_menu(WELCOME_TEXT, Menu::Main));
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_start_app_replies_with_un_check_button() {
        let (handler, _) = seeded();

        let reply = handler.handle(KEY, Inbound::Action(Action::StartApp)).await.unwrap();

        assert_eq!(reply.text, START_APP_TEXT);
        assert_eq!(reply.menu, Some(Menu::StartApp));
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_un_check_sets_flag_and_prompts_once() {
        let (handler, lookup) = seeded();

        let reply = handler.handle(KEY, Inbound::Action(Action::UnCheck)).await;

        assert_eq!(reply, Some(Reply::text(UN_PROMPT_TEXT)));
        assert!(handler.sessions().is_awaiting(KEY).await);
        assert!(lookup.queries().is_empty());

        // Selecting it again while already waiting still prompts.
        let again = handler.handle(KEY, Inbound::Action(Action::UnCheck)).await;
        assert_eq!(again, Some(Reply::text(UN_PROMPT_TEXT)));
        assert!(handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_uncheck_command_matches_button() {
        let (handler, _) = seeded();

        let reply = handler.handle(KEY, Inbound::Command(Command::Uncheck)).await;

        assert_eq!(reply, Some(Reply::text(UN_PROMPT_TEXT)));
        assert!(handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_start_while_awaiting_is_not_looked_up() {
        let (handler, lookup) = seeded();
        begin_check(&handler).await;

        let event = crate::commands::message_event("/start", "dgr_bot");
        let reply = handler.handle(KEY, event).await.unwrap();

        assert_eq!(reply, Reply::with_menu(WELCOME_TEXT, Menu::Main));
        assert!(lookup.queries().is_empty());
        assert!(handler.sessions().is_awaiting(KEY).await);

        let event = crate::commands::message_event("1023", "dgr_bot");
        let reply = handler.handle(KEY, event).await.unwrap();
        assert!(reply.text.contains("Details for UN number 1023"));
        assert_eq!(lookup.queries(), vec!["1023".to_string()]);
    }

    #[tokio::test]
    async fn test_text_while_idle_is_ignored() {
        let (handler, lookup) = seeded();

        let reply = handler.handle(KEY, Inbound::Text("1023".to_string())).await;

        assert!(reply.is_none());
        assert!(lookup.queries().is_empty());
    }

    #[tokio::test]
    async fn test_found_record_is_formatted_and_flag_reset() {
        let (handler, lookup) = seeded();
        begin_check(&handler).await;

        let reply = handler
            .handle(KEY, Inbound::Text("  1023 \n".to_string()))
            .await
            .unwrap();

        assert_eq!(lookup.queries(), vec!["1023".to_string()]);
        assert!(reply.text.contains("Details for UN number 1023:"));
        for label in [
            "Name/Description:",
            "Class/Division:",
            "Sub Risk:",
            "Packing Group:",
            "Special Provision:",
            "Limited Quantities:",
            "Excepted Quantity:",
        ] {
            assert!(reply.text.contains(label), "missing {}", label);
        }
        assert_eq!(reply.text.matches("N/A").count(), 2);
        assert!(reply.menu.is_none());
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let mut second = coal_gas();
        second.name_description = Some("Duplicate".to_string());
        let mut rows = HashMap::new();
        rows.insert("1023".to_string(), vec![coal_gas(), second]);
        let (handler, _) = handler_with(ScriptedLookup {
            rows,
            ..Default::default()
        });
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Text("1023".to_string())).await.unwrap();

        assert!(reply.text.contains("Coal gas, compressed"));
        assert!(!reply.text.contains("Duplicate"));
    }

    #[tokio::test]
    async fn test_not_found_and_flag_reset() {
        let (handler, _) = seeded();
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Text("9999".to_string())).await;

        assert_eq!(
            reply,
            Some(Reply::text("No information found for UN number 9999."))
        );
        assert!(!handler.sessions().is_awaiting(KEY).await);

        // Back to idle: further text is ignored.
        assert!(handler.handle(KEY, Inbound::Text("1023".to_string())).await.is_none());
    }

    #[tokio::test]
    async fn test_blank_input_is_not_found_without_query() {
        let (handler, lookup) = seeded();
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Text("   ".to_string())).await;

        assert_eq!(reply, Some(Reply::text("No information found for UN number .")));
        assert!(lookup.queries().is_empty());
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_lookup_failure_replies_generic_and_resets() {
        let (handler, _) = handler_with(ScriptedLookup {
            fail: true,
            ..Default::default()
        });
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Text("1023".to_string())).await;

        assert_eq!(reply, Some(Reply::text(UN_LOOKUP_FAILED_TEXT)));
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_lookup_timeout_replies_generic_and_resets() {
        let (handler, _) = handler_with(ScriptedLookup {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let handler = handler.with_lookup_timeout(Duration::from_millis(20));
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Text("1023".to_string())).await;

        assert_eq!(reply, Some(Reply::text(UN_LOOKUP_FAILED_TEXT)));
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_list_classes_enumerates_every_row_in_order() {
        let (handler, _) = handler_with(ScriptedLookup {
            classes: classes(5),
            ..Default::default()
        });

        let reply = handler
            .handle(KEY, Inbound::Action(Action::ListDgrClasses))
            .await
            .unwrap();

        assert_eq!(reply.text.matches("ICAO Class:").count(), 5);
        let positions: Vec<usize> = (1..=5)
            .map(|i| reply.text.find(&format!("<b>{}.</b> ICAO Class: {}\n", i, i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_list_classes_leaves_flag_untouched() {
        let (handler, lookup) = seeded();
        begin_check(&handler).await;

        handler.handle(KEY, Inbound::Action(Action::ListDgrClasses)).await;
        assert!(handler.sessions().is_awaiting(KEY).await);

        // The pending UN check is still honoured afterwards.
        let reply = handler.handle(KEY, Inbound::Text("1023".to_string())).await;
        assert!(reply.is_some());
        assert_eq!(lookup.queries(), vec!["1023".to_string()]);
    }

    #[tokio::test]
    async fn test_list_classes_is_repeatable() {
        let (handler, _) = seeded();

        let first = handler.handle(KEY, Inbound::Action(Action::ListDgrClasses)).await;
        let second = handler.handle(KEY, Inbound::Action(Action::ListDgrClasses)).await;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_classes_empty() {
        let (handler, _) = handler_with(ScriptedLookup::default());

        let reply = handler.handle(KEY, Inbound::Action(Action::ListDgrClasses)).await;

        assert_eq!(reply, Some(Reply::text(NO_CLASSES_TEXT)));
    }

    #[tokio::test]
    async fn test_list_classes_failure_keeps_pending_check() {
        let (handler, _) = handler_with(ScriptedLookup {
            fail: true,
            ..Default::default()
        });
        begin_check(&handler).await;

        let reply = handler.handle(KEY, Inbound::Action(Action::ListDgrClasses)).await;

        assert_eq!(reply, Some(Reply::text(CLASSES_FAILED_TEXT)));
        assert!(handler.sessions().is_awaiting(KEY).await);
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let (handler, _) = seeded();

        let reply = handler.handle(KEY, Inbound::Command(Command::Help)).await.unwrap();

        assert!(reply.text.contains("/start"));
        assert!(reply.text.contains("/uncheck"));
        assert!(reply.text.contains("/help"));
    }

    #[tokio::test]
    async fn test_sessions_are_per_conversation() {
        let (handler, _) = seeded();
        let other = ConversationKey::new(2002, 2002);
        begin_check(&handler).await;

        let reply = handler.handle(other, Inbound::Text("1023".to_string())).await;

        assert!(reply.is_none());
        assert!(handler.sessions().is_awaiting(KEY).await);
        assert!(!handler.sessions().is_awaiting(other).await);
    }

    #[tokio::test]
    async fn test_same_conversation_events_are_serialized() {
        let mut rows = HashMap::new();
        rows.insert("1023".to_string(), vec![coal_gas()]);
        let (handler, lookup) = handler_with(ScriptedLookup {
            rows,
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        begin_check(&handler).await;

        let (a, b) = tokio::join!(
            handler.handle(KEY, Inbound::Text("1023".to_string())),
            handler.handle(KEY, Inbound::Text("1023".to_string())),
        );

        // Only one message consumes the pending check.
        assert_eq!([a.is_some(), b.is_some()].iter().filter(|r| **r).count(), 1);
        assert_eq!(lookup.queries().len(), 1);
        assert!(!handler.sessions().is_awaiting(KEY).await);
    }
}
