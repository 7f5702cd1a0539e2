//! Domain logic for screenshot request dispatch.
//!
//! Everything here is independent of the database and the HTTP layer:
//! persistence is reached through the [`dispatch::DispatchStore`] port and
//! credential checks through [`dispatch::Authenticator`].

pub mod dispatch;
pub mod error;
pub mod registration;
pub mod types;
