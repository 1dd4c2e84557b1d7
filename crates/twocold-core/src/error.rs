//! Error types for twocold-core.
//!
//! # Recovery
//!
//! No error in this module is retried inside the crate. Every failure aborts
//! the current navigation sequence and is handed back to the caller; the next
//! call to [`crate::LegacySessionNavigator::reach`] starts again from a fresh
//! fetch of the main page and re-derives its position from page classification.
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`Error::UnexpectedPage`] | The portal answered with a page other than the one the step required |
//! | [`Error::NotOnDeviceList`] | A directional command was requested before reaching the device's list |
//! | [`Error::Transport`] | The request could not be completed |
//! | [`Error::HttpStatus`] | The portal answered with a non-success status |
//! | [`Error::Timeout`] | The transport gave up waiting for the portal |
//! | [`Error::InvalidConfig`] | Portal settings are unusable (bad URL, client setup) |

use std::time::Duration;

use thiserror::Error;

use twocold_types::{Floor, PageState};

/// Navigation step that observed an unexpected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStep {
    /// Initial fetch of the main page.
    Fetch,
    /// Credential postback.
    Login,
    /// Room-selection postback.
    SelectRoom,
    /// Directional command postback.
    Command,
}

impl std::fmt::Display for NavigationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Login => write!(f, "login"),
            Self::SelectRoom => write!(f, "room selection"),
            Self::Command => write!(f, "device command"),
        }
    }
}

/// Errors that can occur while driving the legacy portal.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The portal returned a page the current step cannot continue from.
    #[error("Unexpected page during {step}: expected {expected}, got {actual}")]
    UnexpectedPage {
        /// The step that made the request.
        step: NavigationStep,
        /// What the step needed to see.
        expected: String,
        /// What the page classified as.
        actual: PageState,
    },

    /// A device command was requested while not on the device's list.
    #[error("Not on the device list of floor {floor} (current page: {current})")]
    NotOnDeviceList { floor: Floor, current: PageState },

    /// The request could not be sent or its response could not be read.
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The portal answered with a non-success HTTP status.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The portal did not answer in time.
    #[error("Request to {url} timed out after {duration:?}")]
    Timeout { url: String, duration: Duration },

    /// Invalid portal settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an unexpected-page error.
    pub fn unexpected_page(
        step: NavigationStep,
        expected: impl Into<String>,
        actual: PageState,
    ) -> Self {
        Self::UnexpectedPage {
            step,
            expected: expected.into(),
            actual,
        }
    }

    /// Create a transport error for `url`.
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the portal broke the navigation contract, as opposed to the
    /// network failing underneath it.
    #[must_use]
    pub fn is_remote_state(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedPage { .. } | Self::NotOnDeviceList { .. }
        )
    }
}

/// Result type alias using twocold-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unexpected_page(
            NavigationStep::Login,
            "room selection",
            PageState::DeviceList(Some(Floor::Eighth)),
        );
        assert_eq!(
            err.to_string(),
            "Unexpected page during login: expected room selection, got device list (floor 8)"
        );

        let err = Error::transport("http://portal/page.aspx", "connection refused");
        assert!(err.to_string().contains("http://portal/page.aspx"));
        assert!(err.to_string().contains("connection refused"));

        let err = Error::HttpStatus {
            url: "http://portal".to_string(),
            status: 500,
        };
        assert!(err.to_string().contains("HTTP 500"));

        let err = Error::Timeout {
            url: "http://portal".to_string(),
            duration: Duration::from_secs(15),
        };
        assert!(err.to_string().contains("15s"));
    }

    #[test]
    fn test_is_remote_state() {
        assert!(
            Error::unexpected_page(NavigationStep::Fetch, "device list", PageState::Unknown)
                .is_remote_state()
        );
        assert!(
            Error::NotOnDeviceList {
                floor: Floor::Fifth,
                current: PageState::Login,
            }
            .is_remote_state()
        );
        assert!(!Error::transport("u", "r").is_remote_state());
        assert!(!Error::InvalidConfig("x".into()).is_remote_state());
    }
}
