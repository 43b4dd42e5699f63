pub mod credentials;
pub mod operations;
pub mod porcelain;
pub mod runner;
pub mod status;

// Public API - curated exports
pub mod api;

pub use api::*;
