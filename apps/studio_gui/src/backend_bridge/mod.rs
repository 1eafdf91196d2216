//! Bridge between the UI thread and the async worker.

pub mod commands;
pub mod runtime;
