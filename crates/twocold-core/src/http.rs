//! HTTP transport for the real portal.
//!
//! # Example
//!
//! ```no_run
//! use twocold_core::{HttpTransport, PortalSettings, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = PortalSettings::default();
//! let transport = HttpTransport::new(&settings)?;
//! let page = transport.get(&settings.main_url(), None).await?;
//! println!("{} bytes from {}", page.body.len(), page.url);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Client, StatusCode, Url, redirect};
use tracing::{debug, info};

use twocold_types::SessionCookie;

use crate::error::{Error, Result};
use crate::markup::SESSION_COOKIE_NAME;
use crate::settings::PortalSettings;
use crate::transport::{PortalResponse, Transport};

/// Maximum number of redirects followed per request.
pub const MAX_REDIRECTS: usize = 5;

/// reqwest-backed [`Transport`].
///
/// Redirects are followed here rather than by reqwest so that a session
/// cookie set on an intermediate response is carried to the next hop and
/// reported back to the caller.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport using the timeout from `settings`.
    pub fn new(settings: &PortalSettings) -> Result<Self> {
        settings.check()?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .redirect(redirect::Policy::none())
            .user_agent(concat!("twocold/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, settings.timeout()))
    }

    /// Create a transport with a custom reqwest client.
    ///
    /// The client should not follow redirects itself.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn send(
        &self,
        url: &str,
        mut form: Option<&[(String, String)]>,
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse> {
        let mut current =
            Url::parse(url).map_err(|e| Error::transport(url, format!("invalid URL: {e}")))?;
        let mut cookie = cookie.cloned();
        let mut cookies = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let mut request = match form {
                Some(fields) => {
                    info!("POST {}", current);
                    self.client.post(current.clone()).form(&fields)
                }
                None => {
                    info!("GET {}", current);
                    self.client.get(current.clone())
                }
            };
            if let Some(cookie) = &cookie {
                request = request.header(COOKIE, cookie.header_value());
            }

            let response = request
                .send()
                .await
                .map_err(|e| self.map_error(current.as_str(), e))?;

            for value in response.headers().get_all(SET_COOKIE) {
                if let Ok(raw) = value.to_str()
                    && let Some(set) = SessionCookie::from_set_cookie(raw)
                {
                    if set.name == SESSION_COOKIE_NAME {
                        cookie = Some(set.clone());
                    }
                    cookies.push(set);
                }
            }

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        Error::transport(current.as_str(), "redirect without a Location header")
                    })?;
                let next = current.join(location).map_err(|e| {
                    Error::transport(
                        current.as_str(),
                        format!("invalid redirect target '{location}': {e}"),
                    )
                })?;
                debug!("{} redirected to {} ({})", current, next, status);
                current = next;
                // 307 and 308 repeat the request as is; the others turn it into a GET
                if !matches!(
                    status,
                    StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
                ) {
                    form = None;
                }
                continue;
            }

            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| self.map_error(current.as_str(), e))?;
            return Ok(PortalResponse {
                url: current.to_string(),
                body,
                cookies,
            });
        }

        Err(Error::transport(
            url,
            format!("more than {MAX_REDIRECTS} redirects"),
        ))
    }

    fn map_error(&self, url: &str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                duration: self.timeout,
            }
        } else {
            Error::transport(url, error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, cookie: Option<&SessionCookie>) -> Result<PortalResponse> {
        self.send(url, None, cookie).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse> {
        self.send(url, Some(form), cookie).await
    }
}
