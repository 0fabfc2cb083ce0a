//! Best-effort PII redaction for model-facing text.
//!
//! This is pattern-based minimization, NOT a certified de-identification
//! step. It strips a few well-labelled identifiers (names after `Patient:`,
//! numbers after `ID:`, dates after `DOB:`, SSNs, e-mail addresses) and
//! nothing else. Callers must not rely on it for regulatory-grade
//! anonymization. It only ever touches the copy sent to the model; the
//! original bundle is kept verbatim for the audit snapshot.
//!
//! `redact` is pure, total and idempotent. No rule matches a replacement
//! token, and the rule table is re-applied until a pass changes nothing,
//! since one substitution can expose a new word boundary to an earlier rule
//! (`Patient: Bob123-45-6789`).

use std::sync::LazyLock;

use regex::Regex;

/// Replacement for labelled identifiers (the label itself is kept).
pub const REDACTED: &str = "[REDACTED]";

/// Upper bound on rule passes. Every pass that changes the text removes at
/// least one identifier, so real input settles in two or three.
const MAX_PASSES: usize = 8;

struct RedactionRule {
    name: &'static str,
    regex: Regex,
    replacement: String,
}

/// `<label><separator>[REDACTED]`
fn labelled() -> String {
    format!("${{label}}${{sep}}{REDACTED}")
}

/// Ordered: unlabelled shapes first, then labelled ones. The name rule runs
/// last so it cannot swallow an `ID:` label before its number is removed.
static RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        RedactionRule {
            name: "email",
            regex: Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap(),
            replacement: "[REDACTED-EMAIL]".to_string(),
        },
        RedactionRule {
            name: "ssn",
            regex: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
            replacement: "[REDACTED-SSN]".to_string(),
        },
        RedactionRule {
            name: "identifier",
            regex: Regex::new(r"\b(?P<label>ID|MRN|SSN)(?P<sep>[ \t]*[:#][ \t]*)\d[\d\-]*").unwrap(),
            replacement: labelled(),
        },
        RedactionRule {
            name: "birth_date",
            regex: Regex::new(
                r"\b(?P<label>DOB|Date of Birth)(?P<sep>[ \t]*:[ \t]*)\d{1,4}(?:[-/.]\d{1,2}(?:[-/.]\d{1,4})?)?",
            )
            .unwrap(),
            replacement: labelled(),
        },
        RedactionRule {
            name: "patient_label",
            regex: Regex::new(
                r"\b(?P<label>Patient|Name)(?P<sep>[ \t]*:[ \t]*)\p{L}[\p{L}'\-]*(?:[ \t]+\p{Lu}[\p{L}'\-]*)*",
            )
            .unwrap(),
            replacement: labelled(),
        },
    ]
});

/// Redact identifying tokens from `text`.
pub fn redact(text: &str) -> String {
    redact_counted(text).0
}

/// Redact and report how many substitutions were made (for logging only;
/// the matched values themselves are never reported).
pub fn redact_counted(text: &str) -> (String, usize) {
    let mut current = text.to_string();
    let mut total = 0usize;

    for _ in 0..MAX_PASSES {
        let hits = redact_pass(&mut current);
        if hits == 0 {
            break;
        }
        total += hits;
    }

    (current, total)
}

/// One ordered pass over the rule table. Returns the number of matches.
fn redact_pass(current: &mut String) -> usize {
    let mut pass_hits = 0usize;
    for rule in RULES.iter() {
        let hits = rule.regex.find_iter(current.as_str()).count();
        if hits == 0 {
            continue;
        }
        tracing::trace!(rule = rule.name, hits, "redaction rule applied");
        pass_hits += hits;
        *current = rule
            .regex
            .replace_all(current.as_str(), rule.replacement.as_str())
            .into_owned();
    }
    pass_hits
}
