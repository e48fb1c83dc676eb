pub mod actor;
pub mod channel;
pub mod config;
pub mod constants;
pub mod error;
pub mod feed;
pub mod host;
pub mod input;
pub mod logging;
pub mod maze;
pub mod protocol;
pub mod render;
pub mod rng;
pub mod types;

mod ws_client;
