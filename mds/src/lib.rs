pub mod journal;
pub mod server;
pub mod state;
