//! Markup and form constants of the ScreenMate portal.
//!
//! Every element id, title sentinel and form field name the bridge depends on
//! is defined here. If the portal's markup changes, this module and the room
//! identifiers in [`crate::RoomIds`] are the only places to update.

/// `<title>` of the login page.
pub const LOGIN_TITLE: &str = "TAC Vista ScreenMate - Login";
/// `<title>` of the room-selection page.
pub const ROOM_SELECTION_TITLE: &str = "TAC Vista ScreenMate";

/// Id prefix of the toggle anchors on a device list. The suffix is the command index.
pub const TOGGLE_ID_PREFIX: &str = "dataList_toggle_";
/// Id and form name of the field carrying the current room.
pub const ROOM_FIELD: &str = "roomId";

/// Hidden field holding the view state token.
pub const VIEW_STATE_FIELD: &str = "__VIEWSTATE";
/// Hidden field holding the event validation token.
pub const EVENT_VALIDATION_FIELD: &str = "__EVENTVALIDATION";
/// Form field naming the control that raised a postback.
pub const EVENT_TARGET_FIELD: &str = "__EVENTTARGET";
/// Event target that switches the device list to another room.
pub const ROOM_LOOKUP_EVENT: &str = "lookUpRoomId";

/// Login form field names.
pub const USERNAME_FIELD: &str = "userName";
pub const PASSWORD_FIELD: &str = "password";
pub const USER_TYPE_FIELD: &str = "userType";
pub const LOGIN_BUTTON_FIELD: &str = "loginButton";
pub const LOGIN_BUTTON_VALUE: &str = "Login";

/// Name of the portal's session cookie.
pub const SESSION_COOKIE_NAME: &str = "ASP.NET_SessionId";

/// Selector for any toggle anchor.
pub(crate) fn toggle_marker_selector() -> String {
    format!("a[id^=\"{TOGGLE_ID_PREFIX}\"]")
}

/// Selector for the label inside the toggle anchor of `command_index`.
pub(crate) fn toggle_label_selector(command_index: u32) -> String {
    format!("a[id=\"{TOGGLE_ID_PREFIX}{command_index}\"] > span")
}

/// Selector for an `<input>` with the given id.
pub(crate) fn input_selector(id: &str) -> String {
    format!("input[id=\"{id}\"]")
}

/// Event target of a directional command on the control at `command_index`.
///
/// # Examples
///
/// ```
/// use twocold_core::markup::directional_event;
/// use twocold_types::Direction;
///
/// assert_eq!(directional_event(18, Direction::Advance), "dataList:_ctl18:next");
/// assert_eq!(directional_event(18, Direction::Retreat), "dataList:_ctl18:previous");
/// ```
pub fn directional_event(command_index: u32, direction: twocold_types::Direction) -> String {
    let verb = match direction {
        twocold_types::Direction::Advance => "next",
        twocold_types::Direction::Retreat => "previous",
    };
    format!("dataList:_ctl{command_index}:{verb}")
}
