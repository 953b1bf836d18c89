pub mod config;
pub mod context;
pub mod core;
pub mod layout;
pub mod mem;
pub mod sim;
pub mod sync;
pub mod trace;
