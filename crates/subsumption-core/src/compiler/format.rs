//! `format` keyword expansion (spec §4.3: "expand to a built-in regex over
//! `str_val(x)` with an additional length bound appropriate to the format").
//!
//! Unknown formats are a documented no-op (lenient) per spec §4.3 and §7's
//! recommendation that this choice be recorded — it is recorded here and in
//! `DESIGN.md`.

use z3::ast::Regex;
use z3::Context;

use crate::compiler::pattern::compile_pattern;
use crate::error::SubsumptionError;

/// A known `format` value's regex body (ECMA-ish, translated through the
/// same supported subset as `pattern`) and a generous max-length bound used
/// purely to keep the encoding finite — not a protocol-accurate limit.
struct FormatSpec {
    pattern: &'static str,
    max_length: usize,
}

const KNOWN_FORMATS: &[(&str, FormatSpec)] = &[
    (
        "email",
        FormatSpec {
            pattern: r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$",
            max_length: 254,
        },
    ),
    (
        "uri",
        FormatSpec {
            pattern: r"^[A-Za-z][A-Za-z0-9+.-]*:.+$",
            max_length: 2048,
        },
    ),
    (
        "uuid",
        FormatSpec {
            pattern: r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            max_length: 36,
        },
    ),
    (
        "date",
        FormatSpec {
            pattern: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$",
            max_length: 10,
        },
    ),
    (
        "date-time",
        FormatSpec {
            pattern: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})$",
            max_length: 35,
        },
    ),
    (
        "time",
        FormatSpec {
            pattern: r"^[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:[0-9]{2})?$",
            max_length: 21,
        },
    ),
    (
        "ipv4",
        FormatSpec {
            pattern: r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$",
            max_length: 15,
        },
    ),
    (
        "ipv6",
        FormatSpec {
            pattern: r"^[0-9a-fA-F:]+$",
            max_length: 45,
        },
    ),
];

/// Look up and compile a known `format` value. Returns `Ok(None)` for an
/// unrecognized format (lenient no-op, per spec §4.3) rather than an error.
pub(crate) fn compile_format<'ctx>(
    ctx: &'ctx Context,
    format: &str,
    path: &str,
) -> Result<Option<(Regex<'ctx>, usize)>, SubsumptionError> {
    let Some((_, spec)) = KNOWN_FORMATS.iter().find(|(name, _)| *name == format) else {
        tracing::warn!(format, path, "unknown format value — treated as no-op");
        return Ok(None);
    };
    let regex = compile_pattern(ctx, spec.pattern, path)?;
    Ok(Some((regex, spec.max_length)))
}
