//! Configuration validation that produces warnings rather than errors.
use super::Config;
use crate::backup::layout;
use crate::filter;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration table (e.g., "settings", "components").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// Check a loaded configuration for likely mistakes.
#[must_use]
pub fn validate(config: &Config) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    validate_settings(config, &mut warnings);
    validate_components(config, &mut warnings);
    validate_detection(config, &mut warnings);
    validate_rules(config, &mut warnings);
    validate_package_managers(config, &mut warnings);
    warnings
}

fn validate_settings(config: &Config, warnings: &mut Vec<ValidationWarning>) {
    let s = &config.settings;
    if s.lookup_timeout_secs == 0 {
        warnings.push(ValidationWarning::new(
            "settings",
            "lookup_timeout_secs",
            "timeout is 0; every executable lookup will be inconclusive",
        ));
    }
    if s.package_timeout_secs == 0 {
        warnings.push(ValidationWarning::new(
            "settings",
            "package_timeout_secs",
            "timeout is 0; every package query will be inconclusive",
        ));
    }
    if s.max_depth == 0 {
        warnings.push(ValidationWarning::new(
            "settings",
            "max_depth",
            "depth is 0; `**` globs will only match at their starting directory",
        ));
    }
}

fn validate_components(config: &Config, warnings: &mut Vec<ValidationWarning>) {
    for spec in config.catalog.components() {
        if spec.paths.is_empty() && !spec.has_captures() {
            warnings.push(ValidationWarning::new(
                "components",
                &spec.id,
                "no paths or captures configured; component can never be backed up",
            ));
        }
        if spec.paths.iter().any(|p| p.trim().is_empty()) {
            warnings.push(ValidationWarning::new(
                "components",
                &spec.id,
                "empty path pattern",
            ));
        }
        for capture in &spec.captures {
            if !layout::is_plain_file_name(&capture.file) {
                warnings.push(ValidationWarning::new(
                    "components",
                    &spec.id,
                    format!(
                        "capture file '{}' is not a plain file name; it will be refused",
                        capture.file
                    ),
                ));
            }
            if capture.program.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    "components",
                    &spec.id,
                    format!("capture '{}' has an empty program", capture.file),
                ));
            }
        }
    }
}

fn validate_detection(config: &Config, warnings: &mut Vec<ValidationWarning>) {
    let detection = &config.detection;
    for (list, ids) in [("include", &detection.include), ("exclude", &detection.exclude)] {
        for id in ids {
            if config.catalog.get(id).is_none() {
                warnings.push(ValidationWarning::new(
                    "detection",
                    id,
                    format!("{list} names an unknown component"),
                ));
            }
        }
    }
    for id in &detection.include {
        if detection.is_excluded(id) {
            warnings.push(ValidationWarning::new(
                "detection",
                id,
                "component is both included and excluded; exclude wins",
            ));
        }
    }
}

fn validate_rules(config: &Config, warnings: &mut Vec<ValidationWarning>) {
    for rule in &config.rules {
        if let Err(e) = filter::compile_rule(rule) {
            warnings.push(ValidationWarning::new(
                "filter",
                &rule.pattern,
                format!("{e}; every path will be treated as sensitive"),
            ));
        }
    }
}

fn validate_package_managers(config: &Config, warnings: &mut Vec<ValidationWarning>) {
    for pm in &config.package_managers {
        if pm.program.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                "package_managers",
                &pm.name,
                "empty program",
            ));
        }
    }
}
