//! Translation of the supported `pattern`/`format` regex subset into Z3's
//! regular-language theory (spec §4.3 "String keywords").
//!
//! `regex-syntax` is used purely as a *parser and validator*: its own
//! feature set has no backreferences and no lookaround, so a pattern that
//! uses either simply fails to parse — which this module turns directly
//! into [`SubsumptionError::UnsupportedRegex`] rather than trying to detect
//! those features itself. What regex-syntax *does* parse (literals, classes,
//! alternation, concatenation, bounded repetition, Unicode character
//! ranges, and the `^`/`$` anchors) is walked recursively and translated
//! into the equivalent `z3::ast::Regex` combinator tree.
//!
//! Unicode property classes (`\p{L}`, `\P{N}`, ...) parse without error —
//! regex-syntax's Unicode support is on by default — but spec §4.3 requires
//! they be rejected rather than translated, so a pattern is first parsed to
//! the AST stage (where `\p{...}` is still distinguishable from a bracket
//! expression or a `\d`/`\w`/`\s` shorthand) purely to check for one before
//! the HIR parse that actually drives translation.
//!
//! JSON Schema's `pattern` has *search*, not *full-match*, semantics — the
//! string need only contain a substring matching the pattern, unless
//! anchored. Z3's `in_re` tests whole-string membership, so an unanchored
//! pattern is wrapped with `.*` on whichever side lacks an explicit anchor.

use regex_syntax::ast::{self, Ast};
use regex_syntax::hir::{Class, Hir, HirKind, Look};
use z3::ast::Regex;
use z3::Context;

use crate::error::SubsumptionError;

/// Repetitions with an unbounded or very large upper bound are represented
/// with `star`/`plus` directly; bounded repetitions below this are unrolled
/// by concatenation. Above it, the schema is rejected rather than building
/// an enormous regex term (the equivalent of `BoundExceeded` for patterns).
const MAX_REPEAT_UNROLL: u32 = 256;

/// Parse and translate a `pattern`/`format` regex string into a Z3 `Regex`
/// matching the same language as JSON Schema's (unanchored) `pattern`
/// semantics.
pub(crate) fn compile_pattern<'ctx>(
    ctx: &'ctx Context,
    pattern: &str,
    path: &str,
) -> Result<Regex<'ctx>, SubsumptionError> {
    let ast = ast::parse::Parser::new()
        .parse(pattern)
        .map_err(|e| SubsumptionError::UnsupportedRegex {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
    if contains_unicode_property_class(&ast) {
        return Err(unsupported(path, "Unicode property class (\\p{...})"));
    }

    let hir = regex_syntax::Parser::new()
        .parse(pattern)
        .map_err(|e| SubsumptionError::UnsupportedRegex {
            path: path.to_string(),
            detail: e.to_string(),
        })?;

    let (body, anchored_start, anchored_end) = strip_anchors(&hir);
    let translated = translate(ctx, body, path)?;

    let mut parts = Vec::new();
    let any = Regex::full(ctx);
    if !anchored_start {
        parts.push(any.clone());
    }
    parts.push(translated);
    if !anchored_end {
        parts.push(any);
    }

    if parts.len() == 1 {
        Ok(parts.into_iter().next().unwrap())
    } else {
        let refs: Vec<&Regex> = parts.iter().collect();
        Ok(Regex::concat(ctx, &refs))
    }
}

/// Detect a single leading `^` and/or trailing `$` at the top level of the
/// pattern (the common and fully-supported case) and return the remaining
/// body to translate. Anchors appearing anywhere else (mid-concatenation,
/// inside one branch of an alternation only) are conservatively treated as
/// unsupported by [`translate`], which rejects any [`Look`] it encounters
/// outside this top-level strip.
fn strip_anchors(hir: &Hir) -> (Hir, bool, bool) {
    match hir.kind() {
        HirKind::Concat(parts) => {
            let mut parts = parts.clone();
            let mut start = false;
            let mut end = false;
            if matches!(parts.first().map(|h| h.kind()), Some(HirKind::Look(Look::Start))) {
                parts.remove(0);
                start = true;
            }
            if matches!(parts.last().map(|h| h.kind()), Some(HirKind::Look(Look::End))) {
                parts.pop();
                end = true;
            }
            (Hir::concat(parts), start, end)
        }
        HirKind::Look(Look::Start) => (Hir::empty(), true, false),
        HirKind::Look(Look::End) => (Hir::empty(), false, true),
        _ => (hir.clone(), false, false),
    }
}

fn translate<'ctx>(
    ctx: &'ctx Context,
    hir: Hir,
    path: &str,
) -> Result<Regex<'ctx>, SubsumptionError> {
    match hir.kind() {
        HirKind::Empty => Ok(Regex::literal(ctx, "")),
        HirKind::Literal(lit) => {
            let s = std::str::from_utf8(&lit.0).map_err(|_| unsupported(path, "non-UTF-8 literal"))?;
            Ok(Regex::literal(ctx, s))
        }
        HirKind::Class(Class::Unicode(class)) => {
            let mut ranges = Vec::new();
            for r in class.ranges() {
                ranges.push(Regex::range(ctx, &r.start().to_string(), &r.end().to_string()));
            }
            if ranges.is_empty() {
                return Err(unsupported(path, "empty character class"));
            }
            let refs: Vec<&Regex> = ranges.iter().collect();
            Ok(Regex::union(ctx, &refs))
        }
        HirKind::Class(Class::Bytes(_)) => Err(unsupported(path, "byte-level character class")),
        HirKind::Repetition(rep) => {
            let sub = translate(ctx, (*rep.sub).clone(), path)?;
            match (rep.min, rep.max) {
                (0, None) => Ok(Regex::star(&sub)),
                (1, None) => Ok(Regex::plus(&sub)),
                (0, Some(1)) => {
                    let empty = Regex::literal(ctx, "");
                    Ok(Regex::union(ctx, &[&empty, &sub]))
                }
                (min, max) => unroll_repetition(ctx, &sub, min, max, path),
            }
        }
        HirKind::Capture(cap) => translate(ctx, (*cap.sub).clone(), path),
        HirKind::Concat(parts) => {
            if parts.is_empty() {
                return Ok(Regex::literal(ctx, ""));
            }
            let translated: Result<Vec<_>, _> =
                parts.into_iter().map(|p| translate(ctx, p, path)).collect();
            let translated = translated?;
            let refs: Vec<&Regex> = translated.iter().collect();
            Ok(Regex::concat(ctx, &refs))
        }
        HirKind::Alternation(parts) => {
            if parts.is_empty() {
                return Err(unsupported(path, "empty alternation"));
            }
            let translated: Result<Vec<_>, _> =
                parts.into_iter().map(|p| translate(ctx, p, path)).collect();
            let translated = translated?;
            let refs: Vec<&Regex> = translated.iter().collect();
            Ok(Regex::union(ctx, &refs))
        }
        HirKind::Look(_) => Err(unsupported(path, "anchor outside pattern start/end")),
    }
}

fn unroll_repetition<'ctx>(
    ctx: &'ctx Context,
    sub: &Regex<'ctx>,
    min: u32,
    max: Option<u32>,
    path: &str,
) -> Result<Regex<'ctx>, SubsumptionError> {
    let bound = max.unwrap_or(min.saturating_add(MAX_REPEAT_UNROLL));
    if bound > MAX_REPEAT_UNROLL {
        return Err(SubsumptionError::BoundExceeded {
            detail: format!("pattern repetition bound {bound} exceeds supported unrolling limit"),
            limit: MAX_REPEAT_UNROLL as usize,
        });
    }

    let mut required = Vec::new();
    for _ in 0..min {
        required.push(sub.clone());
    }

    let optional_count = bound - min;
    if max.is_none() {
        // min copies followed by star(sub) covers [min, inf).
        required.push(Regex::star(sub));
    } else {
        let empty = Regex::literal(ctx, "");
        for _ in 0..optional_count {
            required.push(Regex::union(ctx, &[&empty, sub]));
        }
    }

    if required.is_empty() {
        return Ok(Regex::literal(ctx, ""));
    }
    let refs: Vec<&Regex> = required.iter().collect();
    Ok(Regex::concat(ctx, &refs))
}

/// `regex-syntax` compiles Unicode property escapes (`\p{L}`, `\P{N}`, the
/// one-letter form `\pL`) down into the same `HirKind::Class(Class::Unicode)`
/// shape as an ordinary bracket expression or a Perl shorthand like `\d` —
/// the HIR has already erased which syntax produced the class by the time
/// [`translate`] sees it. Spec §4.3 requires property classes specifically
/// be rejected, so this walks the pre-translation AST instead, where
/// `Ast::ClassUnicode` still names them, including when nested inside a
/// bracketed class like `[\p{L}0-9]`.
fn contains_unicode_property_class(ast: &Ast) -> bool {
    match ast {
        Ast::ClassUnicode(_) => true,
        Ast::ClassBracketed(class) => class_set_contains_unicode(&class.kind),
        Ast::Repetition(rep) => contains_unicode_property_class(&rep.ast),
        Ast::Group(group) => contains_unicode_property_class(&group.ast),
        Ast::Concat(concat) => concat.asts.iter().any(contains_unicode_property_class),
        Ast::Alternation(alt) => alt.asts.iter().any(contains_unicode_property_class),
        _ => false,
    }
}

fn class_set_contains_unicode(set: &ast::ClassSet) -> bool {
    match set {
        ast::ClassSet::Item(item) => class_set_item_contains_unicode(item),
        ast::ClassSet::BinaryOp(op) => {
            class_set_contains_unicode(&op.lhs) || class_set_contains_unicode(&op.rhs)
        }
    }
}

fn class_set_item_contains_unicode(item: &ast::ClassSetItem) -> bool {
    match item {
        ast::ClassSetItem::Unicode(_) => true,
        ast::ClassSetItem::Bracketed(inner) => class_set_contains_unicode(&inner.kind),
        ast::ClassSetItem::Union(union) => {
            union.items.iter().any(class_set_item_contains_unicode)
        }
        _ => false,
    }
}

fn unsupported(path: &str, detail: &str) -> SubsumptionError {
    SubsumptionError::UnsupportedRegex {
        path: path.to_string(),
        detail: detail.to_string(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use z3::ast::{Ast, String as Z3String};

    fn ctx() -> Context {
        Context::new(&z3::Config::new())
    }

    #[test]
    fn literal_pattern_matches_substring_search() {
        let ctx = ctx();
        let re = compile_pattern(&ctx, "abc", "#/pattern").unwrap();
        let solver = z3::Solver::new(&ctx);
        let s = Z3String::from_str(&ctx, "xxabcyy").unwrap();
        solver.assert(&s.regex_match(&re));
        assert_eq!(solver.check(), z3::SatResult::Sat);
    }

    #[test]
    fn anchored_pattern_rejects_unanchored_match() {
        let ctx = ctx();
        let re = compile_pattern(&ctx, "^abc$", "#/pattern").unwrap();
        let solver = z3::Solver::new(&ctx);
        let s = Z3String::from_str(&ctx, "xabc").unwrap();
        solver.assert(&s.regex_match(&re));
        assert_eq!(solver.check(), z3::SatResult::Unsat);
    }

    #[test]
    fn backreference_pattern_is_rejected() {
        let ctx = ctx();
        let err = compile_pattern(&ctx, r"(a)\1", "#/pattern").unwrap_err();
        assert!(matches!(err, SubsumptionError::UnsupportedRegex { .. }));
    }

    #[test]
    fn lookahead_pattern_is_rejected() {
        let ctx = ctx();
        let err = compile_pattern(&ctx, "(?=abc)", "#/pattern").unwrap_err();
        assert!(matches!(err, SubsumptionError::UnsupportedRegex { .. }));
    }

    #[test]
    fn unicode_property_class_pattern_is_rejected() {
        let ctx = ctx();
        let err = compile_pattern(&ctx, r"\p{L}", "#/pattern").unwrap_err();
        assert!(matches!(err, SubsumptionError::UnsupportedRegex { .. }));
    }

    #[test]
    fn negated_unicode_property_class_pattern_is_rejected() {
        let ctx = ctx();
        let err = compile_pattern(&ctx, r"\P{N}", "#/pattern").unwrap_err();
        assert!(matches!(err, SubsumptionError::UnsupportedRegex { .. }));
    }

    #[test]
    fn unicode_property_class_nested_in_bracket_expression_is_rejected() {
        let ctx = ctx();
        let err = compile_pattern(&ctx, r"[\p{L}0-9]", "#/pattern").unwrap_err();
        assert!(matches!(err, SubsumptionError::UnsupportedRegex { .. }));
    }

    #[test]
    fn perl_shorthand_class_is_still_supported() {
        let ctx = ctx();
        let re = compile_pattern(&ctx, r"^\d+$", "#/pattern").unwrap();
        let solver = z3::Solver::new(&ctx);
        let s = Z3String::from_str(&ctx, "123").unwrap();
        solver.assert(&s.regex_match(&re));
        assert_eq!(solver.check(), z3::SatResult::Sat);
    }

    #[test]
    fn bounded_repetition_unrolls() {
        let ctx = ctx();
        let re = compile_pattern(&ctx, "^a{2,4}$", "#/pattern").unwrap();
        let solver = z3::Solver::new(&ctx);
        let s = Z3String::from_str(&ctx, "aaa").unwrap();
        solver.assert(&s.regex_match(&re));
        assert_eq!(solver.check(), z3::SatResult::Sat);
    }
}
