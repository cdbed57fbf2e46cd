//! The HTTP management API.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::router;
