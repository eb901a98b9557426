//! Configuration for subsumption checking.

use serde::{Deserialize, Serialize};

/// Strategy for resolving `$ref` before compilation.
///
/// `Unfold` (full inlining of acyclic schemas) is the only strategy this
/// architecture supports; cyclic schemas are rejected with a diagnostic
/// naming the cycles (see [`crate::error::SubsumptionError::CyclicSchema`]).
/// A coinductive simulation strategy for recursive schemas is named in the
/// design notes as future work and is intentionally absent here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefResolution {
    #[default]
    Unfold,
}

/// Output format for the CLI front-end. Has no effect on
/// [`crate::check_subsumption`] itself — the core always returns a
/// structured [`crate::SubsumptionResult`]; this only governs how the CLI
/// renders it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Minimal,
}

/// Options for a subsumption check.
///
/// ## Serialization format
///
/// Fields are serialized in `kebab-case` (e.g. `max-array-length`), matching
/// the CLI's long-flag spelling and the JSON config-file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SubsumptionOptions {
    /// Caps `MAX_ARRAY_LEN`, the bound above which array reasoning is
    /// truncated. Default: 10 (within the spec's documented 8–16 band).
    pub max_array_length: usize,
    /// Reserved for a future bounded-simulation mode over recursive
    /// schemas; has no effect while only acyclic schemas are supported.
    pub max_recursion_depth: usize,
    /// Wall-clock budget handed to the solver for one check.
    pub timeout_seconds: u64,
    /// `$ref` resolution strategy. Only `Unfold` is implemented.
    pub ref_resolution: RefResolution,
    /// When `true`, a `sat` verdict also runs the labeled evaluation and the
    /// soft-preference minimization pass to produce a smaller, explained
    /// witness. When `false`, only the raw witness is returned.
    pub explanations: bool,
    /// Governs the CLI's rendering of the result; does not affect the core.
    pub output_format: OutputFormat,
}

impl Default for SubsumptionOptions {
    fn default() -> Self {
        Self {
            max_array_length: 10,
            max_recursion_depth: 5,
            timeout_seconds: 10,
            ref_resolution: RefResolution::Unfold,
            explanations: true,
            output_format: OutputFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_serde_round_trip() {
        let opts = SubsumptionOptions {
            max_array_length: 16,
            max_recursion_depth: 3,
            timeout_seconds: 30,
            ref_resolution: RefResolution::Unfold,
            explanations: false,
            output_format: OutputFormat::Json,
        };

        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"max-array-length\":16"));
        assert!(json.contains("\"timeout-seconds\":30"));
        assert!(json.contains("\"output-format\":\"json\""));

        let deserialized: SubsumptionOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.max_array_length, 16);
        assert!(!deserialized.explanations);
    }

    #[test]
    fn explanations_defaults_to_true_when_omitted() {
        let json = r#"{"max-array-length": 8, "timeout-seconds": 5}"#;
        let opts: SubsumptionOptions = serde_json::from_str(json).unwrap();
        assert!(opts.explanations);
        assert_eq!(opts.ref_resolution, RefResolution::Unfold);
    }

    #[test]
    fn default_bounds_match_documented_band() {
        let opts = SubsumptionOptions::default();
        assert!((8..=16).contains(&opts.max_array_length));
    }
}
