//! Session state machine for the portal.
//!
//! [`LegacySessionNavigator`] walks the portal from whatever page it is
//! currently showing to the device list of a requested floor:
//!
//! ```text
//! Login --credentials--> RoomSelection --room postback--> DeviceList(floor)
//!                                          ^
//! DeviceList(other floor) -----------------+
//! ```
//!
//! Each response is classified on arrival. A page that the current step cannot
//! continue from ends the sequence with [`Error::UnexpectedPage`] and discards
//! the session cookie, so the next call starts from a clean login.

use std::sync::Arc;

use tracing::{debug, info, warn};

use twocold_types::{DeviceRecord, Direction, Floor, PageState, SessionCookie, SessionTokens};

use crate::error::{Error, NavigationStep, Result};
use crate::markup::{self, directional_event};
use crate::page::{PageClassifier, ParsedPage};
use crate::settings::PortalSettings;
use crate::transport::{Form, PortalResponse, Transport};

/// Remote session state owned by the navigator.
#[derive(Debug, Clone)]
pub struct SessionState {
    cookie: Option<SessionCookie>,
    tokens: Option<SessionTokens>,
    position: PageState,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            cookie: None,
            tokens: None,
            position: PageState::Unknown,
        }
    }
}

impl SessionState {
    /// Session cookie sent with every request.
    pub fn cookie(&self) -> Option<&SessionCookie> {
        self.cookie.as_ref()
    }

    /// Classification of the most recent page.
    pub fn position(&self) -> PageState {
        self.position
    }

    /// Whether tokens from the most recent page are still unused.
    pub fn has_tokens(&self) -> bool {
        self.tokens.is_some()
    }
}

/// Drives the portal's page-to-page navigation.
///
/// All operations take `&mut self`; callers that share a navigator wrap it in
/// a mutex so only one sequence talks to the portal at a time.
pub struct LegacySessionNavigator {
    transport: Arc<dyn Transport>,
    classifier: PageClassifier,
    settings: PortalSettings,
    session: SessionState,
}

impl std::fmt::Debug for LegacySessionNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySessionNavigator")
            .field("base_url", &self.settings.base_url)
            .field("session", &self.session)
            .finish()
    }
}

impl LegacySessionNavigator {
    /// Create a navigator that talks to the portal through `transport`.
    pub fn new(transport: Arc<dyn Transport>, settings: PortalSettings) -> Self {
        Self {
            transport,
            classifier: PageClassifier::new(settings.rooms.clone()),
            settings,
            session: SessionState::default(),
        }
    }

    /// Create a navigator backed by an [`crate::HttpTransport`].
    #[cfg(feature = "http")]
    pub fn connect(settings: PortalSettings) -> Result<Self> {
        let transport = crate::http::HttpTransport::new(&settings)?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    /// Classifier configured with this navigator's room identifiers.
    pub fn classifier(&self) -> &PageClassifier {
        &self.classifier
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Forget the cookie, login and tokens.
    pub fn reset_session(&mut self) {
        if self.session.cookie.is_some() {
            debug!("Discarding portal session");
        }
        self.session = SessionState::default();
    }

    /// Navigate to the device list of `target` and return its markup.
    ///
    /// The returned markup always classifies as the device list of `target`.
    pub async fn reach(&mut self, target: Floor) -> Result<String> {
        info!("Reaching device list of floor {}", target);
        let (state, markup) = self.fetch_main().await?;

        match state {
            PageState::DeviceList(Some(floor)) if floor == target => {
                debug!("Already on floor {}", target);
                Ok(markup)
            }
            PageState::DeviceList(_) | PageState::RoomSelection => self.select_room(target).await,
            PageState::Login => {
                self.login().await?;
                self.select_room(target).await
            }
            PageState::Unknown => Err(self.unexpected(
                NavigationStep::Fetch,
                "login, room selection or device list",
                state,
            )),
        }
    }

    /// Post a directional command for `record`'s control and return the
    /// resulting page.
    ///
    /// Fails without posting unless the last page seen was the device list of
    /// `record.floor`.
    pub async fn send_directional(
        &mut self,
        record: &DeviceRecord,
        direction: Direction,
    ) -> Result<String> {
        let position = self.session.position;
        if !position.is_device_list_of(record.floor) {
            return Err(Error::NotOnDeviceList {
                floor: record.floor,
                current: position,
            });
        }

        info!(
            "Sending {} to device {} on floor {} (control {})",
            direction, record.id, record.floor, record.command_index
        );
        let form = self.postback(vec![
            (
                markup::ROOM_FIELD,
                self.classifier.rooms().room_for(record.floor).to_string(),
            ),
            (
                markup::EVENT_TARGET_FIELD,
                directional_event(record.command_index, direction),
            ),
        ]);
        let url = self.settings.main_url();
        let (state, markup) = self.post(&url, form).await?;

        if state.is_device_list_of(record.floor) {
            Ok(markup)
        } else {
            Err(self.unexpected(
                NavigationStep::Command,
                format!("device list (floor {})", record.floor),
                state,
            ))
        }
    }

    async fn fetch_main(&mut self) -> Result<(PageState, String)> {
        let url = self.settings.main_url();
        let cookie = self.session.cookie.clone();
        let response = self.transport.get(&url, cookie.as_ref()).await;
        self.observe(response)
    }

    async fn post(&mut self, url: &str, form: Form) -> Result<(PageState, String)> {
        let cookie = self.session.cookie.clone();
        let response = self.transport.post_form(url, &form, cookie.as_ref()).await;
        self.observe(response)
    }

    async fn login(&mut self) -> Result<()> {
        info!("Logging in as {}", self.settings.username);
        let form = self.postback(vec![
            (markup::USERNAME_FIELD, self.settings.username.clone()),
            (markup::PASSWORD_FIELD, self.settings.password.clone()),
            (markup::USER_TYPE_FIELD, self.settings.user_type.clone()),
            (
                markup::LOGIN_BUTTON_FIELD,
                markup::LOGIN_BUTTON_VALUE.to_string(),
            ),
        ]);
        let url = self.settings.login_url();
        let (state, _) = self.post(&url, form).await?;

        if state != PageState::RoomSelection {
            if state == PageState::Login {
                warn!("Portal rejected the credentials for {}", self.settings.username);
            }
            return Err(self.unexpected(NavigationStep::Login, "room selection", state));
        }
        Ok(())
    }

    async fn select_room(&mut self, target: Floor) -> Result<String> {
        let room = self.classifier.rooms().room_for(target).to_string();
        info!("Selecting room '{}' for floor {}", room, target);
        let form = self.postback(vec![
            (markup::ROOM_FIELD, room),
            (markup::EVENT_TARGET_FIELD, markup::ROOM_LOOKUP_EVENT.to_string()),
        ]);
        let url = self.settings.main_url();
        let (state, markup) = self.post(&url, form).await?;

        if state.is_device_list_of(target) {
            Ok(markup)
        } else {
            Err(self.unexpected(
                NavigationStep::SelectRoom,
                format!("device list (floor {target})"),
                state,
            ))
        }
    }

    /// Build a postback form, consuming the tokens of the last page.
    fn postback(&mut self, fields: Vec<(&str, String)>) -> Form {
        let tokens = self.session.tokens.take().unwrap_or_else(|| {
            debug!("No tokens available for postback");
            SessionTokens::default()
        });
        let mut form: Form = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        form.push((markup::VIEW_STATE_FIELD.to_string(), tokens.view_state));
        form.push((
            markup::EVENT_VALIDATION_FIELD.to_string(),
            tokens.event_validation,
        ));
        form
    }

    /// Record what a response says about the session.
    fn observe(&mut self, response: Result<PortalResponse>) -> Result<(PageState, String)> {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Portal request failed: {}", e);
                self.session.position = PageState::Unknown;
                self.session.tokens = None;
                return Err(e);
            }
        };

        if let Some(cookie) = response.cookie(markup::SESSION_COOKIE_NAME) {
            if self
                .session
                .cookie
                .as_ref()
                .is_some_and(|current| current.value != cookie.value)
            {
                debug!("Portal issued a new session cookie");
            }
            self.session.cookie = Some(cookie.clone());
        }

        let page = ParsedPage::parse(&response.body);
        let state = self.classifier.state_of(&page);
        debug!("{} classified as {}", response.url, state);
        self.session.tokens = Some(self.classifier.tokens_of(&page));
        self.session.position = state;
        Ok((state, response.body))
    }

    fn unexpected(
        &mut self,
        step: NavigationStep,
        expected: impl Into<String>,
        actual: PageState,
    ) -> Error {
        let error = Error::unexpected_page(step, expected, actual);
        warn!("{}", error);
        self.reset_session();
        error
    }
}
