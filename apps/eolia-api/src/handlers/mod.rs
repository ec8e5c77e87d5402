//! Handlers 模块

pub mod commands;
pub mod devices;
pub mod metrics;

pub use commands::*;
pub use devices::*;
pub use metrics::*;
