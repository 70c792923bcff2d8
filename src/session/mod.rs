//! Session management.
//!
//! Endpoint description, identity resolution, and the session and shell
//! lifecycle. A [`Shell`] borrows its [`Session`], so a shell can never
//! outlive the connection it was opened on.

mod endpoint;
mod identity;
mod manager;
mod state;

pub use endpoint::{EndpointBuilder, EndpointDescriptor, DEFAULT_PORT};
pub use identity::{resolve, Credentials, Identity};
pub use manager::{Session, SessionManager, Shell};
pub use state::Phase;
