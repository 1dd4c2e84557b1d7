//! Simulated portal for testing.
//!
//! [`MockPortal`] implements [`Transport`] by rendering the three portal pages
//! itself, so the navigator and everything built on it can be exercised
//! without network access.
//!
//! The simulation keeps one remote session: a cookie, a login flag, the
//! selected room and the level of every device control. Each rendered page
//! carries fresh tokens and a postback is only accepted with the tokens of the
//! most recent page, as the real portal does.
//!
//! # Features
//!
//! - **Failure injection**: fail the next requests at the transport level,
//!   answer with an error page, or expire the session
//! - **Latency simulation**: delay every request
//! - **Request counters**: count fetches, postbacks and device commands

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use twocold_types::{DeviceRecord, Floor, SessionCookie};

use crate::error::{Error, Result};
use crate::markup;
use crate::settings::PortalSettings;
use crate::transport::{Form, PortalResponse, Transport};

/// A simulated ScreenMate portal.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use twocold_core::{LegacySessionNavigator, MockPortalBuilder, PortalSettings};
/// use twocold_types::Floor;
///
/// #[tokio::main]
/// async fn main() {
///     let portal = Arc::new(
///         MockPortalBuilder::new()
///             .control(Floor::Eighth, 0, true)
///             .build(),
///     );
///     let mut navigator = LegacySessionNavigator::new(portal.clone(), PortalSettings::default());
///
///     navigator.reach(Floor::Eighth).await.unwrap();
///     assert_eq!(portal.logins(), 1);
/// }
/// ```
pub struct MockPortal {
    settings: PortalSettings,
    latency: Duration,
    state: Mutex<PortalState>,
}

#[derive(Default)]
struct PortalState {
    session: Option<String>,
    sessions_issued: u32,
    authenticated: bool,
    room: Option<String>,
    tokens: Option<(String, String)>,
    tokens_issued: u64,
    controls: HashMap<Floor, BTreeMap<u32, bool>>,
    gets: u32,
    posts: u32,
    logins: u32,
    room_selections: u32,
    commands: u32,
    last_form: Option<Form>,
    transport_failures: u32,
    error_pages: u32,
}

impl std::fmt::Debug for MockPortal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MockPortal")
            .field("base_url", &self.settings.base_url)
            .field("authenticated", &state.authenticated)
            .field("room", &state.room)
            .finish()
    }
}

impl Default for MockPortal {
    fn default() -> Self {
        Self::new(PortalSettings::default())
    }
}

impl MockPortal {
    /// Create a portal that accepts the credentials in `settings` and has no devices.
    pub fn new(settings: PortalSettings) -> Self {
        Self {
            settings,
            latency: Duration::ZERO,
            state: Mutex::new(PortalState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of a device control, if the control exists.
    pub fn level(&self, floor: Floor, command_index: u32) -> Option<bool> {
        self.lock()
            .controls
            .get(&floor)
            .and_then(|controls| controls.get(&command_index))
            .copied()
    }

    /// Set the level of a device control, creating it if needed.
    pub fn set_level(&self, floor: Floor, command_index: u32, enabled: bool) {
        self.lock()
            .controls
            .entry(floor)
            .or_default()
            .insert(command_index, enabled);
    }

    /// Whether the current session has logged in.
    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    /// Value of the session cookie the portal currently recognises.
    pub fn session_id(&self) -> Option<String> {
        self.lock().session.clone()
    }

    /// Forget the session, as if it timed out on the server.
    pub fn expire_session(&self) {
        let mut state = self.lock();
        state.session = None;
        state.authenticated = false;
        state.room = None;
    }

    /// Drop the selected room so the next fetch shows the room picker.
    pub fn clear_room(&self) {
        self.lock().room = None;
    }

    /// Fail the next `count` requests with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.lock().transport_failures = count;
    }

    /// Answer the next `count` requests with a server error page.
    pub fn error_page_next(&self, count: u32) {
        self.lock().error_pages = count;
    }

    /// Number of GET requests received.
    pub fn gets(&self) -> u32 {
        self.lock().gets
    }

    /// Number of form posts received.
    pub fn posts(&self) -> u32 {
        self.lock().posts
    }

    /// Number of accepted logins.
    pub fn logins(&self) -> u32 {
        self.lock().logins
    }

    /// Number of accepted room changes.
    pub fn room_selections(&self) -> u32 {
        self.lock().room_selections
    }

    /// Number of accepted directional commands.
    pub fn commands(&self) -> u32 {
        self.lock().commands
    }

    /// The most recent form posted.
    pub fn last_form(&self) -> Option<Form> {
        self.lock().last_form.clone()
    }

    /// Reset all request counters.
    pub fn reset_counters(&self) {
        let mut state = self.lock();
        state.gets = 0;
        state.posts = 0;
        state.logins = 0;
        state.room_selections = 0;
        state.commands = 0;
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn handle_get(&self, url: &str, cookie: Option<&SessionCookie>) -> Result<PortalResponse> {
        let mut state = self.lock();
        state.gets += 1;
        state.injected_failure(url)?;

        if url != self.settings.main_url() && url != self.settings.login_url() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        }

        let issued = state.ensure_session(cookie);
        let body = if state.take_error_page() {
            error_page()
        } else if !state.authenticated {
            state.login_page()
        } else {
            state.current_page(&self.settings)
        };
        Ok(respond(url, body, issued))
    }

    fn handle_post(
        &self,
        url: &str,
        form: &[(String, String)],
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse> {
        let mut state = self.lock();
        state.posts += 1;
        state.last_form = Some(form.to_vec());
        state.injected_failure(url)?;

        let is_login = url == self.settings.login_url();
        if !is_login && url != self.settings.main_url() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        }

        let issued = state.ensure_session(cookie);
        if state.take_error_page() || !state.tokens_match(form) {
            return Ok(respond(url, error_page(), issued));
        }

        let body = if is_login {
            self.login(&mut state, form)
        } else if !state.authenticated {
            state.login_page()
        } else {
            self.postback(&mut state, form)
        };
        Ok(respond(url, body, issued))
    }

    fn login(&self, state: &mut PortalState, form: &[(String, String)]) -> String {
        let accepted = field(form, markup::USERNAME_FIELD) == Some(self.settings.username.as_str())
            && field(form, markup::PASSWORD_FIELD).unwrap_or_default() == self.settings.password
            && field(form, markup::USER_TYPE_FIELD) == Some(self.settings.user_type.as_str())
            && field(form, markup::LOGIN_BUTTON_FIELD) == Some(markup::LOGIN_BUTTON_VALUE);
        if !accepted {
            return state.login_page();
        }
        state.authenticated = true;
        state.room = None;
        state.logins += 1;
        state.room_selection_page()
    }

    fn postback(&self, state: &mut PortalState, form: &[(String, String)]) -> String {
        let target = field(form, markup::EVENT_TARGET_FIELD).unwrap_or_default();
        let room = field(form, markup::ROOM_FIELD).unwrap_or_default().to_string();

        if target == markup::ROOM_LOOKUP_EVENT {
            state.room = Some(room);
            state.room_selections += 1;
            return state.current_page(&self.settings);
        }

        let Some((command_index, advance)) = parse_command(target) else {
            return error_page();
        };
        if state.room.as_deref() != Some(room.as_str()) {
            return error_page();
        }
        let Some(floor) = self.settings.rooms.floor_for(&room) else {
            return error_page();
        };
        let Some(level) = state
            .controls
            .get_mut(&floor)
            .and_then(|controls| controls.get_mut(&command_index))
        else {
            return error_page();
        };
        // Two-position controls saturate at either end
        *level = advance;
        state.commands += 1;
        state.current_page(&self.settings)
    }
}

impl PortalState {
    fn injected_failure(&mut self, url: &str) -> Result<()> {
        if self.transport_failures > 0 {
            self.transport_failures -= 1;
            return Err(Error::transport(url, "injected failure"));
        }
        Ok(())
    }

    fn take_error_page(&mut self) -> bool {
        if self.error_pages > 0 {
            self.error_pages -= 1;
            return true;
        }
        false
    }

    /// Start a new session unless `cookie` names the current one.
    fn ensure_session(&mut self, cookie: Option<&SessionCookie>) -> Option<SessionCookie> {
        let known = match (cookie, &self.session) {
            (Some(cookie), Some(session)) => {
                cookie.name == markup::SESSION_COOKIE_NAME && &cookie.value == session
            }
            _ => false,
        };
        if known {
            return None;
        }
        self.sessions_issued += 1;
        let value = format!("mock-session-{}", self.sessions_issued);
        self.session = Some(value.clone());
        self.authenticated = false;
        self.room = None;
        self.tokens = None;
        Some(SessionCookie::new(markup::SESSION_COOKIE_NAME, value))
    }

    fn tokens_match(&self, form: &[(String, String)]) -> bool {
        match &self.tokens {
            Some((view_state, event_validation)) => {
                field(form, markup::VIEW_STATE_FIELD) == Some(view_state.as_str())
                    && field(form, markup::EVENT_VALIDATION_FIELD)
                        == Some(event_validation.as_str())
            }
            None => false,
        }
    }

    fn issue_tokens(&mut self) -> String {
        self.tokens_issued += 1;
        let view_state = format!("vs-{}", self.tokens_issued);
        let event_validation = format!("ev-{}", self.tokens_issued);
        let fields = format!(
            r#"<input type="hidden" name="{vs}" id="{vs}" value="{view_state}" />
<input type="hidden" name="{ev}" id="{ev}" value="{event_validation}" />"#,
            vs = markup::VIEW_STATE_FIELD,
            ev = markup::EVENT_VALIDATION_FIELD,
        );
        self.tokens = Some((view_state, event_validation));
        fields
    }

    fn login_page(&mut self) -> String {
        let tokens = self.issue_tokens();
        format!(
            r#"<html><head><title>{title}</title></head><body>
<form method="post" action="LoginPage.aspx">
{tokens}
<input type="text" name="userName" id="userName" />
<input type="password" name="password" id="password" />
<select name="userType" id="userType"><option value="VISTA_USER">Vista</option></select>
<input type="submit" name="loginButton" id="loginButton" value="Login" />
</form></body></html>"#,
            title = markup::LOGIN_TITLE,
        )
    }

    fn room_selection_page(&mut self) -> String {
        let tokens = self.issue_tokens();
        format!(
            r#"<html><head><title>{title}</title></head><body>
<form method="post" action="ScreenMatePage.aspx">
{tokens}
<input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
<input type="text" name="roomId" id="roomId" value="" />
</form></body></html>"#,
            title = markup::ROOM_SELECTION_TITLE,
        )
    }

    fn device_list_page(&mut self, room: &str, controls: &BTreeMap<u32, bool>) -> String {
        let tokens = self.issue_tokens();
        let rows: String = controls
            .iter()
            .map(|(index, enabled)| {
                format!(
                    r#"<tr><td><a id="{prefix}{index}" href="javascript:__doPostBack('dataList:_ctl{index}:toggle','')"><span>{level}</span></a></td></tr>
"#,
                    prefix = markup::TOGGLE_ID_PREFIX,
                    level = u8::from(*enabled),
                )
            })
            .collect();
        format!(
            r#"<html><head><title>{title} - {room}</title></head><body>
<form method="post" action="ScreenMatePage.aspx">
{tokens}
<input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
<input type="text" name="roomId" id="roomId" value="{room}" />
<table id="dataList">
{rows}</table>
</form></body></html>"#,
            title = markup::ROOM_SELECTION_TITLE,
            room = escape(room),
        )
    }

    /// Page for an authenticated session: the selected room's device list, or the room picker.
    fn current_page(&mut self, settings: &PortalSettings) -> String {
        let Some(room) = self.room.clone() else {
            return self.room_selection_page();
        };
        let controls = settings
            .rooms
            .floor_for(&room)
            .and_then(|floor| self.controls.get(&floor))
            .cloned()
            .unwrap_or_default();
        if controls.is_empty() {
            return error_page();
        }
        self.device_list_page(&room, &controls)
    }
}

fn error_page() -> String {
    "<html><head><title>Runtime Error</title></head><body><h1>Server Error in '/screenmate' Application.</h1></body></html>"
        .to_string()
}

fn respond(url: &str, body: String, cookie: Option<SessionCookie>) -> PortalResponse {
    PortalResponse {
        url: url.to_string(),
        body,
        cookies: cookie.into_iter().collect(),
    }
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Parse `dataList:_ctl{index}:{next|previous}`.
fn parse_command(target: &str) -> Option<(u32, bool)> {
    let rest = target.strip_prefix("dataList:_ctl")?;
    let (index, verb) = rest.split_once(':')?;
    let advance = match verb {
        "next" => true,
        "previous" => false,
        _ => return None,
    };
    Some((index.parse().ok()?, advance))
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl Transport for MockPortal {
    async fn get(&self, url: &str, cookie: Option<&SessionCookie>) -> Result<PortalResponse> {
        self.delay().await;
        self.handle_get(url, cookie)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse> {
        self.delay().await;
        self.handle_post(url, form, cookie)
    }
}

/// Builder for creating simulated portals with custom settings.
#[derive(Debug, Clone, Default)]
pub struct MockPortalBuilder {
    settings: PortalSettings,
    latency: Duration,
    controls: HashMap<Floor, BTreeMap<u32, bool>>,
}

impl MockPortalBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses, credentials and room identifiers the portal answers to.
    #[must_use]
    pub fn settings(mut self, settings: PortalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Delay every request by `latency`.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Add a device control.
    #[must_use]
    pub fn control(mut self, floor: Floor, command_index: u32, enabled: bool) -> Self {
        self.controls
            .entry(floor)
            .or_default()
            .insert(command_index, enabled);
        self
    }

    /// Add a switched-off control for every record.
    #[must_use]
    pub fn records(mut self, records: &[DeviceRecord]) -> Self {
        for record in records {
            self = self.control(record.floor, record.command_index, false);
        }
        self
    }

    /// Build the portal.
    #[must_use]
    pub fn build(self) -> MockPortal {
        MockPortal {
            settings: self.settings,
            latency: self.latency,
            state: Mutex::new(PortalState {
                controls: self.controls,
                ..PortalState::default()
            }),
        }
    }
}
