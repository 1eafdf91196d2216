//! UI/backend events and error modeling for the studio controller.

use gen_client::{GenerateError, GeneratedImage};

use crate::controller::session::RequestId;

pub enum UiEvent {
    Info(String),
    Error(UiError),
    GenerationFinished {
        request: RequestId,
        image: GeneratedImage,
    },
    GenerationFailed {
        request: RequestId,
        error: UiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    Api,
    Transport,
    Io,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    WorkerStartup,
    LoadImage,
    Generate,
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Api => "Server",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Io => "File",
        UiErrorCategory::Unknown => "Error",
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn new(
        category: UiErrorCategory,
        context: UiErrorContext,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            context,
            message: message.into(),
        }
    }

    /// Classifies an untyped failure message, for paths that only have text
    /// to go on (runtime startup, config problems).
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("invalid") || lower.contains("missing") {
            UiErrorCategory::Validation
        } else if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            UiErrorCategory::Transport
        } else if lower.contains("read") || lower.contains("permission") {
            UiErrorCategory::Io
        } else {
            UiErrorCategory::Unknown
        };
        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_generate(context: UiErrorContext, err: &GenerateError) -> Self {
        let category = match err {
            GenerateError::Api(_) => UiErrorCategory::Api,
            GenerateError::Transport(_) => UiErrorCategory::Transport,
            GenerateError::InvalidBaseUrl { .. } => UiErrorCategory::Validation,
        };
        Self::new(category, context, err.to_string())
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
