//! Session automation for the ScreenMate legacy control portal.
//!
//! The portal is a three-page ASP.NET application with no API: a login form,
//! a room picker, and a device list per room whose controls can only be
//! stepped forward or back. This crate emulates a browser session against it.
//!
//! # Features
//!
//! - **Page classification**: tell the login page, room picker and device
//!   lists apart, and read tokens and device states off them
//! - **Session navigation**: log in and switch rooms as needed to reach the
//!   device list of a floor, carrying the session cookie and tokens forward
//! - **Directional commands**: step a device control on or off
//! - **Pluggable transport**: reqwest over HTTP, or a simulated portal for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use twocold_core::{LegacySessionNavigator, PortalSettings};
//! use twocold_types::{DeviceRecord, Direction, Floor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut navigator = LegacySessionNavigator::connect(PortalSettings::default())?;
//!
//!     let markup = navigator.reach(Floor::Eighth).await?;
//!     let records = vec![DeviceRecord::new(Floor::Eighth, 4, "Svetlana", "Kitchen", 12)];
//!     for view in navigator.classifier().extract_device_views(&markup, Floor::Eighth, &records) {
//!         println!("{}: {}", view.record.name, if view.enabled { "on" } else { "off" });
//!     }
//!
//!     navigator.send_directional(&records[0], Direction::Advance).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod markup;
pub mod mock;
pub mod navigator;
pub mod page;
pub mod settings;
pub mod transport;

// Re-export the shared model
pub use twocold_types::types;

pub use error::{Error, NavigationStep, Result};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use mock::{MockPortal, MockPortalBuilder};
pub use navigator::{LegacySessionNavigator, SessionState};
pub use page::{PageClassifier, ParsedPage};
pub use settings::{PortalSettings, RoomIds};
pub use transport::{Form, PortalResponse, Transport};
