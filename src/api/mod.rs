//! Panel application API
//!
//! Only the users list endpoint is consumed. Responses are unwrapped from the
//! Fractal envelope before they leave this module.

mod client;
pub mod envelope;
mod error;
mod models;

pub use client::PanelClient;
pub use envelope::PaginatedResult;
pub use error::ApiError;
pub use models::User;
