//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a connection inside a transaction) first.

pub mod browser_group_repo;
pub mod browser_repo;
pub mod factory_repo;
pub mod request_group_repo;
pub mod request_repo;

pub use browser_group_repo::BrowserGroupRepo;
pub use browser_repo::BrowserRepo;
pub use factory_repo::FactoryRepo;
pub use request_group_repo::RequestGroupRepo;
pub use request_repo::RequestRepo;
