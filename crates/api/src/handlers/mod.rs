pub mod factories;
pub mod poll;
pub mod requests;
