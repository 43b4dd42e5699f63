// Internal modules - not part of public API
pub(crate) mod config;
pub(crate) mod discovery;
pub(crate) mod lock;
pub(crate) mod marker;
pub(crate) mod probe;
pub(crate) mod progress;
pub(crate) mod settings;
pub(crate) mod shutdown;
pub(crate) mod stats;
pub(crate) mod toolchain;

// Public API - curated exports only
pub mod api;

// Re-export key items at module level for convenience
pub use api::*;
