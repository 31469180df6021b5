//! Configuration validation engine.
//!
//! Detects syntax errors, unknown/misspelled fields, and settings that parse
//! but would misbehave at dispatch time.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    loader::{find_config_file, parse_config_value},
    schema::{CourierConfig, DEFAULT_TEXT_LIMIT},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "limit", "account"
    pub category: &'static str,
    /// Dotted path, e.g. "dispatch.text_limit"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Known field names, used to flag typos.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Dynamic keys (account ids) whose values have a known shape.
    Map(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    let telegram_account = Struct(HashMap::from([
        ("token", Leaf),
        ("api_url", Leaf),
        ("stream_mode", Leaf),
        ("reply_to_mode", Leaf),
        ("text_limit", Leaf),
        ("draft_throttle_ms", Leaf),
        ("edit_throttle_ms", Leaf),
        ("dm_topics", Leaf),
        ("agent_id", Leaf),
    ]));

    Struct(HashMap::from([
        (
            "dispatch",
            Struct(HashMap::from([
                ("streaming_mode", Leaf),
                ("reply_to_mode", Leaf),
                ("text_limit", Leaf),
            ])),
        ),
        ("telegram", Map(Box::new(telegram_account))),
        (
            "metrics",
            Struct(HashMap::from([("enabled", Leaf), ("labels", Map(Box::new(Leaf)))])),
        ),
    ]))
}

/// Levenshtein distance between two strings (for "did you mean" hints).
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_str(&crate::env_subst::substitute_env(&content), &actual_path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read {}: {e}", actual_path.display()),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate raw config text. The format is taken from `path`'s extension.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_config_value(raw, path) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<CourierConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: e.to_string(),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let serde_json::Value::Object(table) = value else {
        return;
    };
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match schema {
        KnownKeys::Struct(fields) => {
            let known: Vec<&str> = fields.keys().copied().collect();
            for (key, child) in table {
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child, child_schema, &join(key), diagnostics);
                    continue;
                }
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path: join(key),
                    message,
                });
            }
        },
        KnownKeys::Map(value_schema) => {
            for (key, child) in table {
                check_unknown_fields(child, value_schema, &join(key), diagnostics);
            }
        },
        KnownKeys::Leaf => {},
    }
}

fn check_semantics(config: &CourierConfig, diagnostics: &mut Vec<Diagnostic>) {
    check_text_limit(config.dispatch.text_limit, "dispatch.text_limit", diagnostics);

    for (account_id, raw) in &config.telegram {
        let path = format!("telegram.{account_id}");
        let token = raw.get("token").and_then(|v| v.as_str()).unwrap_or("");
        if token.is_empty() || token.starts_with("${") {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "account",
                path: format!("{path}.token"),
                message: "bot token is empty or references an unset variable".into(),
            });
        }
        if let Some(limit) = raw.get("text_limit").and_then(serde_json::Value::as_u64) {
            check_text_limit(
                usize::try_from(limit).unwrap_or(usize::MAX),
                &format!("{path}.text_limit"),
                diagnostics,
            );
        }
    }
}

fn check_text_limit(limit: usize, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if limit == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "limit",
            path: path.into(),
            message: "text_limit must be greater than zero".into(),
        });
    } else if limit > DEFAULT_TEXT_LIMIT {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "limit",
            path: path.into(),
            message: format!(
                "text_limit {limit} exceeds the transport maximum of {DEFAULT_TEXT_LIMIT} and will be clamped"
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toml(raw: &str) -> ValidationResult {
        validate_str(raw, Path::new("courier.toml"))
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("text_limt", "text_limit"), 1);
    }

    #[test]
    fn clean_config_has_no_diagnostics() {
        let result = toml(
            r#"
            [dispatch]
            streaming_mode = "edit"

            [telegram.main]
            token = "123:abc"
            edit_throttle_ms = 500
            "#,
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn misspelled_field_gets_suggestion() {
        let result = toml("[dispatch]\ntext_limt = 10\n");
        assert!(result.has_errors());
        let diag = &result.diagnostics[0];
        assert_eq!(diag.path, "dispatch.text_limt");
        assert!(diag.message.contains("text_limit"), "{}", diag.message);
    }

    #[test]
    fn unknown_account_field_is_reported() {
        let result = toml("[telegram.main]\ntoken = \"t\"\nstream_mod = \"edit\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "telegram.main.stream_mod" && d.message.contains("stream_mode"))
        );
    }

    #[test]
    fn zero_text_limit_is_an_error() {
        let result = toml("[dispatch]\ntext_limit = 0\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "limit");
    }

    #[test]
    fn oversized_account_limit_warns() {
        let result = toml("[telegram.main]\ntoken = \"t\"\ntext_limit = 9000\n");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn bad_mode_is_a_type_error() {
        let result = toml("[dispatch]\nstreaming_mode = \"sometimes\"\n");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn missing_token_warns() {
        let result = toml("[telegram.main]\ndm_topics = true\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "account" && d.severity == Severity::Warning)
        );
    }

    #[test]
    fn syntax_error_stops_validation() {
        let result = toml("[dispatch\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }
}
