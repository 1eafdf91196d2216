//! UI layer: the application shell and panels.

pub mod app;

pub use app::StudioApp;
