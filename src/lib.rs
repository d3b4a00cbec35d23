//! # gpbind - libgphoto2 bindings
//!
//! Safe wrappers over libgphoto2 for tethered camera control: capture and
//! preview, file download, configuration widget trees, and the driver and
//! port registries. The shared library is opened at runtime, so nothing is
//! linked at build time.
//!
//! ```no_run
//! use std::path::Path;
//! use gpbind::{Camera, Context};
//!
//! let ctx = Context::new()?;
//! let camera = Camera::open(&ctx)?;
//! camera.capture_image(Some(Path::new("shot.jpg")))?;
//! # Ok::<(), gpbind::GphotoError>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Hand-declared libgphoto2 ABI
pub mod sys;

/// The native entry points as a trait, and handle types
pub mod backend;
/// In-memory backend for tests
pub mod mock;

mod abilities;
mod camera;
mod config;
mod config_tree;
mod context;
mod error;
mod ffi;
mod file;
mod library;
mod list;
mod retry;
mod types;
mod widget;

pub use abilities::{AbilitiesList, CameraAbilities, PortInfo, PortInfoList};
pub use camera::Camera;
pub use config::{Config, DEFAULT_UNMOUNT_COMMAND};
pub use config_tree::{list_paths, walk, ConfigEntry, ConfigNode, ConfigTree};
pub use context::Context;
pub use error::{GphotoError, Result};
pub use file::CameraFile;
pub use library::Gphoto2Library;
pub use list::{select_usb_paths, CameraList};
pub use retry::{DeviceReleaser, UnmountCommand};
pub use types::*;
pub use widget::{Widget, WidgetValue};

/// Version text of the libgphoto2 found on this system, one line per
/// entry, each newline-terminated.
pub fn library_version(verbose: bool) -> Result<String> {
    Ok(Context::new()?.library_version(verbose))
}
