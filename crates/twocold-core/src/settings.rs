//! Portal addresses, credentials and room identifiers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use twocold_types::Floor;

use crate::error::{Error, Result};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How to reach and authenticate against the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    /// Base address of the ScreenMate application, without a trailing page.
    pub base_url: String,
    /// Page that shows either the room picker or a device list.
    pub main_page: String,
    /// Page that accepts the credential postback.
    pub login_page: String,
    /// Portal account name.
    pub username: String,
    /// Portal account password.
    pub password: String,
    /// Portal account type.
    pub user_type: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Room identifiers of the two floors.
    pub rooms: RoomIds,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: "http://91.192.175.234/screenmate".to_string(),
            main_page: "ScreenMatePage.aspx".to_string(),
            login_page: "LoginPage.aspx".to_string(),
            username: "8floor".to_string(),
            password: String::new(),
            user_type: "VISTA_USER".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rooms: RoomIds::default(),
        }
    }
}

impl PortalSettings {
    /// Address of the main page.
    pub fn main_url(&self) -> String {
        join_url(&self.base_url, &self.main_page)
    }

    /// Address of the login page.
    pub fn login_url(&self) -> String {
        join_url(&self.base_url, &self.login_page)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the settings can be used to build a transport.
    pub fn check(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "portal URL must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "portal timeout must be at least 1 second".to_string(),
            ));
        }
        if self.rooms.floor5 == self.rooms.floor8 {
            return Err(Error::InvalidConfig(
                "room identifiers of floors 5 and 8 must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn join_url(base: &str, page: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        page.trim_start_matches('/')
    )
}

/// Value of the portal's `roomId` field for each floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomIds {
    pub floor5: String,
    pub floor8: String,
}

impl Default for RoomIds {
    fn default() -> Self {
        Self {
            floor5: "floor5".to_string(),
            floor8: "floor8".to_string(),
        }
    }
}

impl RoomIds {
    /// Room identifier of `floor`.
    pub fn room_for(&self, floor: Floor) -> &str {
        match floor {
            Floor::Fifth => &self.floor5,
            Floor::Eighth => &self.floor8,
        }
    }

    /// Floor whose room identifier is `room`.
    pub fn floor_for(&self, room: &str) -> Option<Floor> {
        if room == self.floor5 {
            Some(Floor::Fifth)
        } else if room == self.floor8 {
            Some(Floor::Eighth)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let settings = PortalSettings {
            base_url: "http://portal.local/screenmate/".to_string(),
            ..PortalSettings::default()
        };
        assert_eq!(
            settings.main_url(),
            "http://portal.local/screenmate/ScreenMatePage.aspx"
        );
        assert_eq!(
            settings.login_url(),
            "http://portal.local/screenmate/LoginPage.aspx"
        );
    }

    #[test]
    fn test_check() {
        assert!(PortalSettings::default().check().is_ok());

        let bad_url = PortalSettings {
            base_url: "portal.local".to_string(),
            ..PortalSettings::default()
        };
        assert!(matches!(bad_url.check(), Err(Error::InvalidConfig(_))));

        let zero_timeout = PortalSettings {
            timeout_secs: 0,
            ..PortalSettings::default()
        };
        assert!(zero_timeout.check().is_err());

        let same_rooms = PortalSettings {
            rooms: RoomIds {
                floor5: "r".to_string(),
                floor8: "r".to_string(),
            },
            ..PortalSettings::default()
        };
        assert!(same_rooms.check().is_err());
    }

    #[test]
    fn test_room_mapping() {
        let rooms = RoomIds::default();
        for floor in Floor::ALL {
            assert_eq!(rooms.floor_for(rooms.room_for(floor)), Some(floor));
        }
        assert_eq!(rooms.floor_for("lobby"), None);
    }
}
