//! Bulk metadata editing for a photo library.
//!
//! A [`batch::BatchEditor`] applies one [`batch::PhotosForm`] to many photos
//! while respecting which source last wrote each value.

pub mod batch;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod source;

pub use error::{Error, Result};
