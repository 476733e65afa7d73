pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod sources;
pub mod utils;
