pub mod error;
pub mod protocol;

pub use error::ApiFailure;
pub use protocol::{ErrorBody, STYLE_PRESETS};
