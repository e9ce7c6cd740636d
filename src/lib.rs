//! Background worker for the Venice AI API
//!
//! Polls the service on a fixed interval, either listing the available models
//! or generating an image, and writes generated images to local disk.

pub mod ai;
pub mod error;
pub mod image;
pub mod models;
pub mod poller;

pub use error::{Error, Result};
