// Crack BATU download pipeline library

pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod resolver;
pub mod sink;
pub mod stamper;
