use serde::{Deserialize, Serialize};

/// JSON body the generation endpoint returns on non-2xx responses.
///
/// Only `detail` is contractual; unknown fields are ignored so backend
/// additions do not break error reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Style tags offered by the UI, in the order they are rendered and
/// submitted. Each checked tag becomes one `styles` multipart entry.
pub const STYLE_PRESETS: &[&str] = &[
    "photorealistic",
    "cinematic",
    "watercolor",
    "line art",
    "oil painting",
    "cyberpunk",
];
