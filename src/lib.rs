pub mod app;
pub mod claims;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod jobs;
pub mod logging;
pub mod process;
pub mod projection;
pub mod registry;
pub mod saga;
pub mod testing;
pub mod verification;
pub mod wallet;
