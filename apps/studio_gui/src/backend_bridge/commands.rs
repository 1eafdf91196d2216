//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use crate::controller::session::RequestId;

pub enum BackendCommand {
    Generate {
        request: RequestId,
        prompt: String,
        image_path: PathBuf,
        /// Checked style tags in picker order.
        styles: Vec<String>,
    },
}
