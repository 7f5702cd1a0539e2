//! Row structs mapping database tables, with conversions into core types.

pub mod browser;
pub mod factory;
pub mod request;
