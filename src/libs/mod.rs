//! Shared building blocks: domain models, configuration, the error type,
//! the clock used by the timer, and console presentation helpers.

pub mod category;
pub mod clock;
pub mod config;
pub mod data_storage;
pub mod error;
pub mod formatter;
pub mod messages;
pub mod session;
pub mod task;
pub mod view;
