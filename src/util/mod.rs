//! Utility functions for common operations.
//!
//! - **URL validation**: feed sources must be absolute http(s) URLs
//! - **Image links**: the string transform applied to image fields in the
//!   artifact

mod image_links;
mod url_validator;

pub use image_links::ImageLinks;
pub use url_validator::{validate_source_url, UrlValidationError};
