// PHI audit: static scan of every source file for tracing calls that carry
// clinical content. Logs may hold case ids, digests, counts and outcomes,
// never the bundle, the policy, the model-facing text or the model's answer.

use std::fs;
use std::path::Path;

/// Fragments that MUST NOT appear inside a tracing macro call.
const PHI_PATTERNS: &[&str] = &[
    // Inbound request and its snapshot
    "fhir_bundle",
    "input_snapshot",
    "clinicalNote",
    "request.policy",
    "%policy",
    "?policy",
    // Serialized and redacted bundle text
    "%serialized",
    "?serialized",
    "= serialized,",
    "redacted_text",
    "%redacted",
    "?redacted",
    "= redacted",
    // Model answer
    "%raw",
    "?raw",
    "arguments",
    "content",
    "triple.reason",
    "reasoning",
    "%body",
    "?body",
    // Error displays: a provider error carries the response body, which can
    // echo model output. Log `kind()` instead.
    "error = %e",
    "error = ?e",
    "error = %self",
    "error = ?self",
];

/// Files that reference the patterns outside tracing calls.
const ALLOWLIST: &[&str] = &["phi_audit.rs"];

const TRACING_MACROS: &[&str] = &[
    "tracing::info!",
    "tracing::warn!",
    "tracing::error!",
    "tracing::debug!",
    "tracing::trace!",
    "info!(",
    "warn!(",
    "error!(",
    "debug!(",
    "trace!(",
];

#[test]
fn no_phi_in_tracing_calls() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

    let mut violations = Vec::new();
    scan_directory(&src_dir, &mut violations);

    if !violations.is_empty() {
        let report = violations
            .iter()
            .map(|(file, line_num, call, pattern)| {
                format!("  {file}:{line_num}: found '{pattern}' in: {call}")
            })
            .collect::<Vec<_>>()
            .join("\n");
        panic!(
            "PHI audit failed, {} violation(s) in tracing calls:\n{report}\n\n\
             Fix: log opaque ids, digests or counts instead.",
            violations.len()
        );
    }
}

#[test]
fn phi_patterns_list_is_not_empty() {
    assert!(PHI_PATTERNS.len() >= 10);
}

#[test]
fn scanner_detects_known_violation() {
    let source = "fn f() {\n    tracing::info!(\n        note = %request.policy,\n        \"case\"\n    );\n}\n";
    let calls = tracing_calls(source);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 2);
    assert!(PHI_PATTERNS.iter().any(|p| calls[0].1.contains(p)));
}

#[test]
fn scanner_detects_provider_error_display() {
    let source = "    .map_err(|e| {\n        tracing::error!(error = %e, \"Model call failed\");\n";
    let calls = tracing_calls(source);
    assert_eq!(calls.len(), 1);
    assert!(PHI_PATTERNS.iter().any(|p| calls[0].1.contains(p)));
}

#[test]
fn scanner_sees_imported_macros() {
    let source = "use tracing::warn;\nfn f() {\n    warn!(\n        answer = %raw,\n        \"odd\"\n    );\n}\n";
    let calls = tracing_calls(source);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 3);
    assert!(PHI_PATTERNS.iter().any(|p| calls[0].1.contains(p)));
}

#[test]
fn scanner_passes_clean_tracing() {
    let source = r#"tracing::info!(case_id = %case_id, substitutions, "Case received");"#;
    let calls = tracing_calls(source);
    assert_eq!(calls.len(), 1);
    assert!(!PHI_PATTERNS.iter().any(|p| calls[0].1.contains(p)));
}

fn scan_directory(dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_directory(&path, violations);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            scan_file(&path, violations);
        }
    }
}

fn scan_file(path: &Path, violations: &mut Vec<(String, usize, String, String)>) {
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    if ALLOWLIST.iter().any(|a| filename.contains(a)) {
        return;
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let relative_path = path
        .strip_prefix(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))
        .unwrap_or(path)
        .display()
        .to_string();

    for (line_num, call) in tracing_calls(&content) {
        for pattern in PHI_PATTERNS {
            if call.contains(pattern) {
                violations.push((
                    relative_path.clone(),
                    line_num,
                    call.clone(),
                    pattern.to_string(),
                ));
            }
        }
    }
}

/// Every tracing macro call in `source` as (1-based start line, call text
/// joined onto one line).
fn tracing_calls(source: &str) -> Vec<(usize, String)> {
    let lines: Vec<&str> = source.lines().collect();
    let mut calls = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if !TRACING_MACROS.iter().any(|m| trimmed.starts_with(m)) {
            i += 1;
            continue;
        }

        let mut call = String::from(trimmed);
        let mut depth = paren_balance(trimmed);
        let mut j = i + 1;
        while depth > 0 && j < lines.len() {
            let next = lines[j].trim();
            call.push(' ');
            call.push_str(next);
            depth += paren_balance(next);
            j += 1;
        }

        calls.push((i + 1, call));
        i = j;
    }

    calls
}

fn paren_balance(line: &str) -> i32 {
    line.chars().fold(0, |depth, ch| match ch {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}
