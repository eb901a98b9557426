//! Decides schema subsumption between two JSON Schema documents: given a
//! producer schema `P` and a consumer schema `C`, whether every value `P`
//! accepts is also accepted by `C` (`P ⊆ C`).
//!
//! The pipeline (each stage owned by its own module): the [`resolver`]
//! inlines `$ref`s into two acyclic schemas, the [`compiler`] translates
//! each into a predicate over a shared [`json_encoder::JsonSort`] variable
//! with a label table, and the [`driver`] asserts `P(x) ∧ ¬C(x)`, decides
//! it, and — on `sat` — extracts a counterexample and diagnosis. The single
//! entry point, [`check_subsumption`], is reentrant: every call builds its
//! own solver context and universes, so concurrent checks never interact.

mod anchor_utils;
mod compiler;
pub mod config;
pub mod error;
mod driver;
mod json_encoder;
mod resolver;
mod schema_utils;

pub use config::{OutputFormat, RefResolution, SubsumptionOptions};
pub use error::{ErrorCode, SubsumptionError};
pub use schema_utils::{
    build_path, escape_pointer_segment, split_path, unescape_pointer_segment,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of one subsumption check (spec §6's programmatic surface).
///
/// `error` is populated, and every other field left at its default, when
/// any pipeline stage fails (an unresolvable `$ref`, a cyclic schema, an
/// unsupported keyword, a solver timeout, ...) — per spec §7, no verdict is
/// claimed in that case. This struct is returned directly rather than
/// wrapped in a `Result`, matching the literal shape spec §6 defines: the
/// error *is* one of the fields, not an alternative to the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsumptionResult {
    /// `true` under an `unsat` verdict: `P ⊆ C` holds within the configured
    /// bounds. `false` under `sat`. Meaningless (always `false`) when
    /// `error` is set.
    pub compatible: bool,
    /// A JSON value accepted by `P` but rejected by `C`, present exactly
    /// when `compatible` is `false` and no error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<Value>,
    /// Human-readable summary of why the witness is incompatible. Only
    /// computed when [`SubsumptionOptions::explanations`] is `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Names of the consumer-side labeled constraints the witness violates.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_constraints: Vec<String>,
    /// One fix suggestion per entry in `failed_constraints`, same order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recommendations: Vec<String>,
    /// Wall-clock seconds spent resolving, compiling, and solving.
    #[serde(rename = "solver_time")]
    pub solver_time_seconds: f64,
    /// Set instead of a verdict when the check could not be completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubsumptionResult {
    fn err(e: SubsumptionError) -> Self {
        tracing::warn!(code = ?e.error_code(), "subsumption check failed: {e}");
        Self {
            compatible: false,
            counterexample: None,
            explanation: None,
            failed_constraints: Vec::new(),
            recommendations: Vec::new(),
            solver_time_seconds: 0.0,
            error: Some(e.to_string()),
        }
    }

    /// The process exit code the CLI reports for this result (spec §6):
    /// `0` compatible, `1` incompatible, `2` error.
    pub fn exit_code(&self) -> i32 {
        if self.error.is_some() {
            2
        } else if self.compatible {
            0
        } else {
            1
        }
    }
}

/// Decide whether `producer ⊆ consumer`.
///
/// Infallible: every failure mode (malformed `$ref`, a cyclic schema, an
/// unsupported keyword or regex feature, exceeding a configured bound, or
/// the solver running out of its time budget) is caught and folded into
/// [`SubsumptionResult::error`] rather than propagated, since the spec's
/// external contract has no separate failure channel.
pub fn check_subsumption(
    producer: &Value,
    consumer: &Value,
    options: &SubsumptionOptions,
) -> SubsumptionResult {
    tracing::debug!(?options, "starting subsumption check");

    let producer_inlined = match resolver::resolve_schema(producer) {
        Ok(s) => s,
        Err(e) => return SubsumptionResult::err(e),
    };
    let consumer_inlined = match resolver::resolve_schema(consumer) {
        Ok(s) => s,
        Err(e) => return SubsumptionResult::err(e),
    };

    match driver::run(&producer_inlined, &consumer_inlined, options) {
        Ok(outcome) => SubsumptionResult {
            compatible: outcome.compatible,
            counterexample: outcome.counterexample,
            explanation: outcome.explanation,
            failed_constraints: outcome.failed_constraints,
            recommendations: outcome.recommendations,
            solver_time_seconds: outcome.solver_time_seconds,
            error: None,
        },
        Err(e) => SubsumptionResult::err(e),
    }
}
