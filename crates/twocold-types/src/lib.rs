//! Shared types for the twocold control bridge.
//!
//! This crate provides the value types used by the portal automation core
//! (twocold-core), the durable device registry (twocold-store) and the HTTP
//! service (twocold-service).
//!
//! # Features
//!
//! - Floors, device records and live device views
//! - Page states and session tokens of the legacy portal
//! - Validation for boundary input (floors, device ids, edit payloads)
//!
//! # Example
//!
//! ```
//! use twocold_types::{DeviceRecord, Floor};
//!
//! let floor: Floor = "8".parse().unwrap();
//! let record = DeviceRecord::new(floor, 5, "Oksana", "HR", 18);
//! assert!(record.matches(Floor::Eighth, 5));
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    DeviceEdit, DeviceRecord, DeviceView, Direction, Floor, MAX_LABEL_LEN, PageState,
    SessionCookie, SessionTokens, parse_device_id,
};
