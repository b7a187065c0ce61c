//! Inline menus and the button actions they carry

use std::fmt;
use std::str::FromStr;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Button actions, identified on the wire by their callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    StartApp,
    UnCheck,
    ListDgrClasses,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::StartApp, Action::UnCheck, Action::ListDgrClasses];

    /// Callback data sent back by the client when the button is pressed
    pub const fn callback_data(self) -> &'static str {
        match self {
            Action::StartApp => "start_app",
            Action::UnCheck => "un_check",
            Action::ListDgrClasses => "list_dgr_classes",
        }
    }

    /// Button caption
    pub const fn label(self) -> &'static str {
        match self {
            Action::StartApp => "Start App",
            Action::UnCheck => "UN-CHECK",
            Action::ListDgrClasses => "List DGR Classes",
        }
    }

    fn button(self) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(self.label(), self.callback_data())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callback_data())
    }
}

/// Callback data that matches no [`Action`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.callback_data() == data)
            .ok_or_else(|| UnknownAction(data.to_string()))
    }
}

/// Keyboards attached to menu replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    /// Shown for `/start`
    Main,
    /// Shown after "Start App"
    StartApp,
}

impl Menu {
    pub fn actions(self) -> &'static [Action] {
        match self {
            Menu::Main => &[Action::StartApp, Action::ListDgrClasses],
            Menu::StartApp => &[Action::UnCheck],
        }
    }

    /// Single-row inline keyboard with this menu's actions
    pub fn keyboard(self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![
            self.actions().iter().map(|action| action.button()).collect::<Vec<_>>(),
        ])
    }
}
