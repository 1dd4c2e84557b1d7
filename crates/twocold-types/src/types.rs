//! Core types for the twocold control bridge.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Maximum length of a device name or place, in characters.
pub const MAX_LABEL_LEN: usize = 32;

/// One of the two physical locations served by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum Floor {
    /// Fifth floor.
    Fifth,
    /// Eighth floor.
    Eighth,
}

impl Floor {
    /// All supported floors.
    pub const ALL: [Floor; 2] = [Floor::Fifth, Floor::Eighth];

    /// The floor number as used in URLs and the durable store.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Floor::Fifth => 5,
            Floor::Eighth => 8,
        }
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Floor {
    type Error = ParseError;

    fn try_from(value: u8) -> ParseResult<Self> {
        match value {
            5 => Ok(Floor::Fifth),
            8 => Ok(Floor::Eighth),
            other => Err(ParseError::UnknownFloor(other.to_string())),
        }
    }
}

impl From<Floor> for u8 {
    fn from(floor: Floor) -> Self {
        floor.number()
    }
}

impl FromStr for Floor {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| ParseError::UnknownFloor(s.to_string()))
            .and_then(Floor::try_from)
    }
}

/// Parse a device identifier from a path segment.
pub fn parse_device_id(s: &str) -> ParseResult<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidDeviceId(s.to_string()))
}

/// Persistent metadata for a single device.
///
/// `(floor, id)` is unique within a registry and `command_index` never changes
/// once assigned; edits only touch `name` and `place`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceRecord {
    /// Identifier, unique per floor.
    pub id: u32,
    /// Floor the device is installed on.
    pub floor: Floor,
    /// Where the device is (room or team).
    pub place: String,
    /// Display name.
    pub name: String,
    /// Index of the device's control element on the remote device list.
    pub command_index: u32,
}

impl DeviceRecord {
    /// Create a new record.
    pub fn new(
        floor: Floor,
        id: u32,
        name: impl Into<String>,
        place: impl Into<String>,
        command_index: u32,
    ) -> Self {
        Self {
            id,
            floor,
            place: place.into(),
            name: name.into(),
            command_index,
        }
    }

    /// Whether this record is addressed by `(floor, id)`.
    #[must_use]
    pub fn matches(&self, floor: Floor, id: u32) -> bool {
        self.floor == floor && self.id == id
    }

    /// Copy of this record with the edit applied. The command index is kept.
    #[must_use]
    pub fn with_edit(&self, edit: &DeviceEdit) -> Self {
        Self {
            name: edit.name.clone(),
            place: edit.place.clone(),
            ..self.clone()
        }
    }

    /// Attach a live enabled flag.
    #[must_use]
    pub fn into_view(self, enabled: bool) -> DeviceView {
        DeviceView {
            record: self,
            enabled,
        }
    }
}

/// A device record together with its state as read from the latest page.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceView {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub record: DeviceRecord,
    /// Whether the device is currently switched on.
    pub enabled: bool,
}

impl DeviceView {
    pub fn id(&self) -> u32 {
        self.record.id
    }

    pub fn floor(&self) -> Floor {
        self.record.floor
    }
}

/// Editable display metadata for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceEdit {
    pub name: String,
    pub place: String,
}

impl DeviceEdit {
    pub fn new(name: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            place: place.into(),
        }
    }

    /// Check that both fields are non-empty and at most [`MAX_LABEL_LEN`] characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use twocold_types::DeviceEdit;
    ///
    /// assert!(DeviceEdit::new("Kitchen", "8A").validate().is_ok());
    /// assert!(DeviceEdit::new("", "8A").validate().is_err());
    /// ```
    pub fn validate(&self) -> ParseResult<()> {
        check_label("Name", &self.name)?;
        check_label("Place", &self.place)
    }
}

fn check_label(field: &str, value: &str) -> ParseResult<()> {
    if value.is_empty() {
        return Err(ParseError::InvalidEdit(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_LABEL_LEN {
        return Err(ParseError::InvalidEdit(format!(
            "{field} is longer than {MAX_LABEL_LEN} symbols"
        )));
    }
    Ok(())
}

/// The only two commands the portal accepts against a device control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Step the control forward (switches a device on).
    Advance,
    /// Step the control back (switches a device off).
    Retreat,
}

impl Direction {
    /// Direction that moves a device towards `enabled`.
    #[must_use]
    pub fn towards(enabled: bool) -> Self {
        if enabled {
            Direction::Advance
        } else {
            Direction::Retreat
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Advance => write!(f, "advance"),
            Direction::Retreat => write!(f, "retreat"),
        }
    }
}

/// Which of the portal's pages a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// The credential form.
    Login,
    /// The room picker shown right after login.
    RoomSelection,
    /// A device list. `None` when the room on the page is not a known floor.
    DeviceList(Option<Floor>),
    /// Anything else, including error pages.
    Unknown,
}

impl PageState {
    /// Whether this is the device list of `floor`.
    #[must_use]
    pub fn is_device_list_of(&self, floor: Floor) -> bool {
        matches!(self, PageState::DeviceList(Some(f)) if *f == floor)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Login => write!(f, "login"),
            PageState::RoomSelection => write!(f, "room selection"),
            PageState::DeviceList(Some(floor)) => write!(f, "device list (floor {floor})"),
            PageState::DeviceList(None) => write!(f, "device list (unknown floor)"),
            PageState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Anti-tampering tokens that must be echoed back on the next postback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub view_state: String,
    pub event_validation: String,
}

impl SessionTokens {
    pub fn new(view_state: impl Into<String>, event_validation: impl Into<String>) -> Self {
        Self {
            view_state: view_state.into(),
            event_validation: event_validation.into(),
        }
    }

    /// Whether neither token was present on the page.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view_state.is_empty() && self.event_validation.is_empty()
    }
}

/// Session credential issued by the portal.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Value for a `Cookie` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Parse the leading `name=value` pair of a `Set-Cookie` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use twocold_types::SessionCookie;
    ///
    /// let cookie = SessionCookie::from_set_cookie("ASP.NET_SessionId=abc; path=/; HttpOnly").unwrap();
    /// assert_eq!(cookie.name, "ASP.NET_SessionId");
    /// assert_eq!(cookie.value, "abc");
    /// ```
    pub fn from_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }
}

// Session values end up in logs; keep them out.
impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}
