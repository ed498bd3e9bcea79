//! Core domain types for imgpack.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application:
//!
//! - **`event`**: invocation payload validation ([`BundleRequest`], [`EventError`])
//! - **`error`**: pipeline failure taxonomy ([`BundleError`], [`ErrorCode`])
//! - **`response`**: the status-code response returned to the host ([`InvocationResponse`])

mod error;
mod event;
mod response;

pub use error::{BundleError, ErrorCode, ErrorDetails};
pub use event::{BundleRequest, EventError};
pub use response::InvocationResponse;
