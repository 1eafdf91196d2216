//! Controller layer: UI events, the generation phase machine, and command
//! orchestration.

pub mod events;
pub mod orchestration;
pub mod session;
