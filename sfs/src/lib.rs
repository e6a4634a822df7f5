pub mod client;
pub mod mem;
pub mod remote;
pub mod service;
