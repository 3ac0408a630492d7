//! Semantic checks that TOML parsing cannot express: zero durations,
//! unknown anchor or strategy names, duplicate platform ids.

use std::collections::HashSet;

use crate::schema::Config;

const ANCHOR_NAMES: [&str; 4] = ["top_left", "top_right", "bottom_left", "bottom_right"];
const STRATEGY_NAMES: [&str; 4] = [
    "value_assignment",
    "content_replacement",
    "paste_equivalent",
    "select_all_insert",
];

/// One problem found in the config, keyed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: String,
    pub message: String,
}

/// Errors make the config unusable; warnings are printed and ignored.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Finding {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Finding {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_engine(config, &mut result);
        Self::validate_pending(config, &mut result);
        Self::validate_remote(config, &mut result);
        Self::validate_platforms(config, &mut result);
        result
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;
        let required = [
            ("engine.remote_timeout_ms", engine.remote_timeout_ms),
            ("engine.stream_deadline_ms", engine.stream_deadline_ms),
            ("engine.refresh_debounce_ms", engine.refresh_debounce_ms),
            ("engine.refresh_min_interval_ms", engine.refresh_min_interval_ms),
            ("engine.resolution_give_up_ms", engine.resolution_give_up_ms),
            ("engine.notice_display_ms", engine.notice_display_ms),
        ];
        for (path, value) in required {
            if value == 0 {
                result.error(path, "must be greater than 0");
            }
        }

        if engine.refresh_debounce_ms >= engine.refresh_min_interval_ms {
            result.error(
                "engine.refresh_debounce_ms",
                "debounce window must be shorter than refresh_min_interval_ms",
            );
        }

        if engine.stream_deadline_ms < engine.remote_timeout_ms {
            result.error(
                "engine.stream_deadline_ms",
                "stream deadline must not be shorter than remote_timeout_ms",
            );
        }

        if engine.remote_timeout_ms > 60_000 {
            result.warn(
                "engine.remote_timeout_ms",
                "remote timeout is above one minute, the control will look stuck",
            );
        }

        if engine.overlay_padding < 0.0 || engine.control_size <= 0.0 {
            result.error(
                "engine.control_size",
                "overlay_padding must be non-negative and control_size positive",
            );
        }
    }

    fn validate_pending(config: &Config, result: &mut ValidationResult) {
        if config.pending.ttl_seconds == 0 {
            result.error(
                "pending.ttl_seconds",
                "ttl_seconds must be greater than 0",
            );
        }
        if config.pending.ttl_seconds > 3600 {
            result.warn(
                "pending.ttl_seconds",
                "ttl above one hour may replay text long after the user moved on",
            );
        }
    }

    fn validate_remote(config: &Config, result: &mut ValidationResult) {
        match url::Url::parse(&config.remote.endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => result.error(
                "remote.endpoint",
                "endpoint must be an http:// or https:// URL",
            ),
        }
        if config.remote.default_style.is_empty() {
            result.warn(
                "remote.default_style",
                "no default style set, the service default will apply",
            );
        }
    }

    fn validate_platforms(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for (i, entry) in config.platforms.iter().enumerate() {
            let path = format!("platforms[{}]", i);
            if entry.id.is_empty() {
                result.error(&path, "platform id cannot be empty");
            } else if !seen.insert(entry.id.as_str()) {
                result.error(
                    &path,
                    format!("duplicate platform id '{}'", entry.id),
                );
            }

            if entry.hosts.is_empty() {
                result.error(
                    format!("{}.hosts", path),
                    "at least one host is required",
                );
            }

            if entry.rules.is_empty() {
                result.warn(
                    format!("{}.rules", path),
                    "no rules given, generic fallback resolution will be used",
                );
            }

            if let Some(ref anchor) = entry.anchor {
                if !ANCHOR_NAMES.contains(&anchor.as_str()) {
                    result.error(
                        format!("{}.anchor", path),
                        format!("unknown anchor '{}', valid values: {:?}", anchor, ANCHOR_NAMES),
                    );
                }
            }

            for strategy in &entry.commit_order {
                if !STRATEGY_NAMES.contains(&strategy.as_str()) {
                    result.error(
                        format!("{}.commit_order", path),
                        format!("unknown strategy '{}'", strategy),
                    );
                }
            }

            if entry.auto_send && entry.send_rules.is_empty() {
                result.warn(
                    format!("{}.send_rules", path),
                    "auto_send is set but no send_rules are given",
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
