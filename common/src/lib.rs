pub mod config;
pub mod error;
pub mod layout;
pub mod protocol;
pub mod types;
