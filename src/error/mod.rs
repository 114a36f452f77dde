//! Error taxonomy and structured operation results.
//!
//! Every operation exposed over the CLI or API reports its outcome as an
//! [`OpReport`] instead of letting errors escape. Unexpected errors are
//! converted at the boundary, with the category inferred from the error text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Category of an error, used for reporting and notification titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Recording,
    Transcription,
    Screenshot,
    Network,
    Api,
    Permission,
    Dependency,
    Filesystem,
    Unknown,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration Error",
            Self::Recording => "Recording Error",
            Self::Transcription => "Transcription Error",
            Self::Screenshot => "Screenshot Error",
            Self::Network => "Network Error",
            Self::Api => "API Error",
            Self::Permission => "Permission Error",
            Self::Dependency => "Dependency Error",
            Self::Filesystem => "File System Error",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Substring rules for guessing a category from free-form error text.
/// Order matters: earlier rules win. The keywords are a heuristic carried
/// over from the previous incarnation of this tool and make no claim of
/// completeness.
const CATEGORY_KEYWORDS: &[(&str, ErrorCategory)] = &[
    ("permission", ErrorCategory::Permission),
    ("network", ErrorCategory::Network),
    ("connection", ErrorCategory::Network),
    ("file", ErrorCategory::Filesystem),
    ("directory", ErrorCategory::Filesystem),
    ("api", ErrorCategory::Api),
];

/// Infer an error category from an error message.
pub fn categorize_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if lower.contains(keyword) {
            return *category;
        }
    }
    ErrorCategory::Unknown
}

/// Domain error carrying an explicit category.
#[derive(Debug, Error)]
#[error("{}: {message}", category.label())]
pub struct MeetingRecError {
    pub category: ErrorCategory,
    pub message: String,
}

impl MeetingRecError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn recording(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Recording, message)
    }

    pub fn transcription(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transcription, message)
    }

    pub fn screenshot(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Screenshot, message)
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Dependency, message)
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Filesystem, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, message)
    }
}

/// Structured result of a core operation.
///
/// Nothing in the workflow is fatal to the process: failures degrade a single
/// meeting's artifacts and are reported through this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, Value>,
}

impl OpReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            category: None,
            details: serde_json::Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let category = categorize_message(&message);
        Self {
            success: false,
            message,
            category: Some(category),
            details: serde_json::Map::new(),
        }
    }

    pub fn failure_with_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            category: Some(category),
            details: serde_json::Map::new(),
        }
    }

    /// Convert an escaped error into a failure report at the boundary.
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(domain) = err.downcast_ref::<MeetingRecError>() {
            return Self::failure_with_category(domain.category, domain.message.clone());
        }
        Self::failure(format!("{err:#}"))
    }

    /// Attach an extra key/value to the report.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    pub fn detail_u64(&self, key: &str) -> Option<u64> {
        self.details.get(key).and_then(Value::as_u64)
    }
}
