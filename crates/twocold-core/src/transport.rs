//! Transport abstraction for talking to the portal.
//!
//! The navigator never touches HTTP directly. It goes through [`Transport`],
//! which is implemented by [`crate::HttpTransport`] for the real portal and by
//! [`crate::MockPortal`] for tests.
//!
//! The session cookie is always passed in explicitly; transports keep no
//! cookie jar of their own, so the navigator alone decides which session a
//! request belongs to.

use async_trait::async_trait;

use twocold_types::SessionCookie;

use crate::error::Result;

/// An ordered list of form fields.
pub type Form = Vec<(String, String)>;

/// A page returned by the portal.
#[derive(Debug, Clone, Default)]
pub struct PortalResponse {
    /// Address of the page after any redirects.
    pub url: String,
    /// Page markup.
    pub body: String,
    /// Cookies set while producing this page, in the order they were seen.
    pub cookies: Vec<SessionCookie>,
}

impl PortalResponse {
    /// The last cookie named `name` set by this response.
    pub fn cookie(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies.iter().rev().find(|c| c.name == name)
    }
}

/// Request/response access to the portal.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a page.
    async fn get(&self, url: &str, cookie: Option<&SessionCookie>) -> Result<PortalResponse>;

    /// Submit a url-encoded form.
    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str, cookie: Option<&SessionCookie>) -> Result<PortalResponse> {
        (**self).get(url, cookie).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cookie: Option<&SessionCookie>,
    ) -> Result<PortalResponse> {
        (**self).post_form(url, form, cookie).await
    }
}
