// Declare all modules as public so they can be used by hosts and tests.
pub mod app;
pub mod config;
pub mod core;
pub mod sandbox;
pub mod source;
pub mod utils;
