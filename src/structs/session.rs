use serde::{Deserialize, Serialize};

/// The identity carried by a valid session cookie. `is_admin` is only a hint
/// for rendering, admin routes re-read the flag from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Flash {
        Flash { level: FlashLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Flash {
        Flash { level: FlashLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Flash {
        Flash { level: FlashLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Flash {
        Flash { level: FlashLevel::Error, message: message.into() }
    }

    pub fn errors(messages: Vec<String>) -> Vec<Flash> {
        messages.into_iter().map(Flash::error).collect()
    }
}
