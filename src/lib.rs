// Crate root library declaration and module exports.
pub mod app;
pub mod config;
pub mod context;
pub mod logging;
pub mod model;
pub mod quote;
pub mod storage;
pub mod store;
pub mod theme;
