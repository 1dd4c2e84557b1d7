//! Durable device registry for the twocold control bridge.
//!
//! This crate keeps the metadata of every controllable device (floor, id,
//! name, place and the index of its control on the portal's device list) in a
//! JSON file, so names and places survive restarts and can be edited without
//! touching the portal.
//!
//! # Features
//!
//! - Seeds the installed device set on first run
//! - Lazy load, then served from memory
//! - Atomic whole-file rewrites on edit
//!
//! # Example
//!
//! ```no_run
//! use twocold_store::DeviceRegistry;
//! use twocold_types::{DeviceEdit, Floor};
//!
//! let mut registry = DeviceRegistry::open_default();
//!
//! for record in registry.list(Floor::Eighth)? {
//!     println!("{} {} ({})", record.id, record.name, record.place);
//! }
//!
//! registry.edit(Floor::Eighth, 4, &DeviceEdit::new("Svetlana", "Kitchen"))?;
//! # Ok::<(), twocold_store::Error>(())
//! ```

mod defaults;
mod error;
mod registry;

pub use defaults::default_records;
pub use error::{Error, Result};
pub use registry::DeviceRegistry;

/// Default registry path following platform conventions.
///
/// - Linux: `~/.local/share/twocold/devices.json`
/// - macOS: `~/Library/Application Support/twocold/devices.json`
/// - Windows: `C:\Users\<user>\AppData\Local\twocold\devices.json`
pub fn default_store_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("twocold")
        .join("devices.json")
}
