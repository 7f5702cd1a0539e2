//! Matching and leasing of screenshot requests to polling factories.
//!
//! Components, leaves first:
//!
//! - [`matcher`]: version constraints and capability matching
//! - [`lease`]: time-bounded exclusive claims
//! - [`selector`]: FIFO scan that leases the first compatible request
//! - [`resolver`]: concrete browser choice for a leased request
//! - [`poll`]: the orchestrating poll operation
//!
//! Persistence and credential checks are reached through the ports in
//! [`store`]; [`memory`] provides an in-process store.

pub mod lease;
pub mod matcher;
pub mod memory;
pub mod model;
pub mod poll;
pub mod resolver;
pub mod selector;
pub mod store;

pub use lease::{LeaseManager, LeaseOutcome, LEASE_TTL_SECS, MAX_LEASE_TTL_SECS};
pub use matcher::VersionConstraint;
pub use memory::MemoryStore;
pub use poll::{NoBrowserPolicy, PollError, PollHandler, PollOutcome};
pub use selector::JobSelector;
pub use store::{AuthError, Authenticator, DispatchStore, StoreError};
