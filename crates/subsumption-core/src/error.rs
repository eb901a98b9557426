//! Error types for schema subsumption checking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// These codes form a **stable API contract** — once published, variant names
/// and their serialized `snake_case` strings must never change across
/// versions, since the CLI's `--output-format json` embeds them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error (malformed input, invalid structure).
    JsonParseError,
    /// A `$ref` target could not be found in the schema registry.
    UnresolvedReference,
    /// The schema's `$ref` graph contains a cycle; only acyclic schemas are
    /// supported (see `ref_resolution: unfold` in the options).
    CyclicSchema,
    /// A keyword is outside the supported subset and cannot be compiled
    /// without either silent over-approximation (forbidden) or a sound
    /// documented fallback.
    UnsupportedKeyword,
    /// A `pattern` uses a regex feature outside the supported subset
    /// (back-references, lookaround, Unicode property classes).
    UnsupportedRegex,
    /// A literal or a computed universe size exceeded the configured bound
    /// (`max_array_length` or the sealed `Keys` universe).
    BoundExceeded,
    /// The solver returned `unknown` or exhausted its time budget.
    SolverTimeout,
    /// An invariant the implementation relies on did not hold (e.g. a model
    /// variant mismatch during witness readback). Always a bug.
    InternalInvariant,
}

/// Errors produced while resolving, compiling, or deciding a subsumption
/// check. Every fallible core operation returns `Result<_, SubsumptionError>`;
/// the CLI is the only place this gets wrapped in `anyhow::Error`.
#[derive(Debug, Error)]
pub enum SubsumptionError {
    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("unresolved $ref at {path}: {reference}")]
    UnresolvedReference { path: String, reference: String },

    #[error("cyclic schema: {} cycle(s) found, e.g. {}", cycles.len(), format_cycle(cycles.first()))]
    CyclicSchema { cycles: Vec<Vec<String>> },

    #[error("unsupported keyword at {path}: {keyword}")]
    UnsupportedKeyword { path: String, keyword: String },

    #[error("unsupported regex feature at {path}: {detail}")]
    UnsupportedRegex { path: String, detail: String },

    #[error("bound exceeded: {detail} (limit: {limit})")]
    BoundExceeded { detail: String, limit: usize },

    #[error("solver timed out after {elapsed_seconds:.3}s (budget: {budget_seconds}s)")]
    SolverTimeout {
        elapsed_seconds: f64,
        budget_seconds: u64,
    },

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

fn format_cycle(first: Option<&Vec<String>>) -> String {
    match first {
        Some(cycle) => cycle.join(" -> "),
        None => "<none>".to_string(),
    }
}

impl SubsumptionError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SubsumptionError::JsonError(_) => ErrorCode::JsonParseError,
            SubsumptionError::UnresolvedReference { .. } => ErrorCode::UnresolvedReference,
            SubsumptionError::CyclicSchema { .. } => ErrorCode::CyclicSchema,
            SubsumptionError::UnsupportedKeyword { .. } => ErrorCode::UnsupportedKeyword,
            SubsumptionError::UnsupportedRegex { .. } => ErrorCode::UnsupportedRegex,
            SubsumptionError::BoundExceeded { .. } => ErrorCode::BoundExceeded,
            SubsumptionError::SolverTimeout { .. } => ErrorCode::SolverTimeout,
            SubsumptionError::InternalInvariant(_) => ErrorCode::InternalInvariant,
        }
    }

    /// Returns the schema path context, if available.
    pub fn path(&self) -> Option<&str> {
        match self {
            SubsumptionError::UnresolvedReference { path, .. } => Some(path),
            SubsumptionError::UnsupportedKeyword { path, .. } => Some(path),
            SubsumptionError::UnsupportedRegex { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Produces a structured JSON error for the CLI's `--output-format json`.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_through_json() {
        let err = SubsumptionError::UnresolvedReference {
            path: "#/properties/x".to_string(),
            reference: "#/$defs/Missing".to_string(),
        };
        let json = err.to_json();
        assert_eq!(json["code"], "unresolved_reference");
        assert_eq!(json["path"], "#/properties/x");
    }

    #[test]
    fn cyclic_schema_message_names_first_cycle() {
        let err = SubsumptionError::CyclicSchema {
            cycles: vec![vec!["A".to_string(), "B".to_string(), "A".to_string()]],
        };
        assert!(err.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn json_error_has_no_path() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SubsumptionError::JsonError(serde_err);
        assert_eq!(err.error_code(), ErrorCode::JsonParseError);
        assert!(err.path().is_none());
    }
}
