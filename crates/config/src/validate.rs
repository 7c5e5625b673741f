//! Configuration validation.
//!
//! Reports syntax errors, misspelled fields and values the engines would
//! reject at startup (zero threads, unknown zones, bad property values).

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    customizer::{INSTANCE_NAME_KEY, THREAD_COUNT_KEY, parse_timezone},
    schema::CronConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The engines refuse to start with this config.
    Error,
    /// Accepted, but probably not what was meant.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Syntax,
    UnknownField,
    Type,
    Value,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    /// Dotted path, e.g. `trigger.thread_count`. Empty for whole-file problems.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(category: Category, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(category: Category, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, path, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    /// File that was checked, `None` when no config file exists.
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    fn of(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            config_path: None,
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// Every field a config file may set, as dotted paths.
const KNOWN_FIELDS: &[&str] = &[
    "client",
    "trigger",
    "trigger.scheduler_name",
    "trigger.thread_count",
    "trigger.timezone",
    "trigger.properties",
    "runner",
    "runner.timezone",
    "logging",
    "logging.level",
    "logging.json",
];

/// Tables whose keys are not checked.
const FREE_FORM: &[&str] = &["trigger.properties"];

const KNOWN_PROPERTY_KEYS: &[&str] = &[INSTANCE_NAME_KEY, THREAD_COUNT_KEY];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Validate the config file at `path`, or the discovered one when `path` is
/// `None`. Having no config file at all is valid: defaults apply.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(path) = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file)
    else {
        return ValidationResult::default();
    };

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");
    let mut result = match std::fs::read_to_string(&path) {
        Ok(content) if is_toml => validate_toml_str(&content),
        Ok(_) => match crate::loader::load_config(&path) {
            Ok(config) => validate_config(&config),
            Err(e) => ValidationResult::of(vec![Diagnostic::error(
                Category::Syntax,
                "",
                e.to_string(),
            )]),
        },
        Err(e) => ValidationResult::of(vec![Diagnostic::error(
            Category::Syntax,
            "",
            format!("failed to read config file: {e}"),
        )]),
    };
    result.config_path = Some(path);
    result
}

/// Validate TOML text without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let table = match toml_str.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => {
            return ValidationResult::of(vec![Diagnostic::error(
                Category::Syntax,
                "",
                format!("TOML syntax error: {e}"),
            )]);
        },
    };

    let mut diagnostics = Vec::new();
    check_fields(&table, "", &mut diagnostics);
    match toml::from_str::<CronConfig>(toml_str) {
        Ok(config) => check_values(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::error(Category::Type, "", format!("type error: {e}"))),
    }
    ValidationResult::of(diagnostics)
}

/// Value checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &CronConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_values(config, &mut diagnostics);
    ValidationResult::of(diagnostics)
}

fn check_fields(table: &toml::Table, parent: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (key, value) in table {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}.{key}")
        };
        if !KNOWN_FIELDS.contains(&path.as_str()) {
            let message = match closest(key, children(parent)) {
                Some(near) => format!("unknown field (did you mean \"{near}\"?)"),
                None => "unknown field".to_string(),
            };
            diagnostics.push(Diagnostic::error(Category::UnknownField, path, message));
            continue;
        }
        if let toml::Value::Table(nested) = value
            && !FREE_FORM.contains(&path.as_str())
        {
            check_fields(nested, &path, diagnostics);
        }
    }
}

/// Field names directly under `parent`.
fn children(parent: &str) -> impl Iterator<Item = &'static str> {
    KNOWN_FIELDS.iter().copied().filter_map(move |field| {
        let name = if parent.is_empty() {
            field
        } else {
            field.strip_prefix(parent)?.strip_prefix('.')?
        };
        (!name.contains('.')).then_some(name)
    })
}

/// Nearest candidate that differs from `name` by a small typo.
fn closest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| (1..=MAX_SUGGESTION_DISTANCE).contains(distance))
        .min()
        .map(|(_, candidate)| candidate)
}

/// Levenshtein distance over chars, one row at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

fn check_values(config: &CronConfig, diagnostics: &mut Vec<Diagnostic>) {
    let trigger = &config.trigger;

    if trigger.thread_count == 0 {
        diagnostics.push(Diagnostic::error(
            Category::Value,
            "trigger.thread_count",
            "thread count must be at least 1",
        ));
    }
    if trigger.scheduler_name.trim().is_empty() && !trigger.properties.contains_key(INSTANCE_NAME_KEY) {
        diagnostics.push(Diagnostic::warning(
            Category::Value,
            "trigger.scheduler_name",
            "scheduler name is blank",
        ));
    }

    for (path, zone) in [
        ("trigger.timezone", trigger.timezone.as_deref()),
        ("runner.timezone", config.runner.timezone.as_deref()),
    ] {
        if let Err(e) = parse_timezone(path, zone) {
            diagnostics.push(Diagnostic::error(Category::Value, path, e.to_string()));
        }
    }

    for (key, value) in &trigger.properties {
        let path = format!("trigger.properties.{key}");
        if key == THREAD_COUNT_KEY {
            match value.trim().parse::<usize>() {
                Ok(0) => diagnostics.push(Diagnostic::error(
                    Category::Value,
                    path,
                    "thread count must be at least 1",
                )),
                Ok(_) => {},
                Err(e) => diagnostics.push(Diagnostic::error(
                    Category::Value,
                    path,
                    format!("not a thread count: {e}"),
                )),
            }
        } else if let Some(near) = closest(key, KNOWN_PROPERTY_KEYS.iter().copied()) {
            diagnostics.push(Diagnostic::warning(
                Category::UnknownField,
                path,
                format!("unrecognised property (did you mean \"{near}\"?)"),
            ));
        }
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) && !level.contains('=') {
        diagnostics.push(Diagnostic::warning(
            Category::Value,
            "logging.level",
            format!("\"{}\" is not a known log level", config.logging.level),
        ));
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn at<'a>(result: &'a ValidationResult, path: &str) -> &'a Diagnostic {
        result
            .diagnostics
            .iter()
            .find(|d| d.path == path)
            .unwrap_or_else(|| panic!("no diagnostic at {path}: {:?}", result.diagnostics))
    }

    #[rstest]
    #[case("trigger", "trigger", 0)]
    #[case("trigger", "triger", 1)]
    #[case("runner", "runer", 1)]
    #[case("", "abc", 3)]
    #[case("thread_count", "thread_cuont", 2)]
    fn edit_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(edit_distance(a, b), expected);
    }

    #[test]
    fn children_lists_direct_fields_only() {
        let mut top: Vec<_> = children("").collect();
        top.sort_unstable();
        assert_eq!(top, ["client", "logging", "runner", "trigger"]);
        assert_eq!(children("runner").collect::<Vec<_>>(), ["timezone"]);
    }

    #[test]
    fn empty_config_is_clean() {
        let result = validate_toml_str("");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn unreadable_file_is_a_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(Some(&dir.path().join("cronrepo.toml")));
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, Category::Syntax);
    }

    #[rstest]
    #[case("clinet = \"runner\"\n", "clinet", Some("client"))]
    #[case("[trigger]\nthread_cont = 3\n", "trigger.thread_cont", Some("thread_count"))]
    #[case("[logging]\njsn = true\n", "logging.jsn", Some("json"))]
    #[case("[runner]\nworkers = 3\n", "runner.workers", None)]
    fn unknown_fields(#[case] toml: &str, #[case] path: &str, #[case] suggestion: Option<&str>) {
        let result = validate_toml_str(toml);
        let d = at(&result, path);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.category, Category::UnknownField);
        match suggestion {
            Some(near) => assert!(d.message.contains(&format!("did you mean \"{near}\"")), "{d}"),
            None => assert_eq!(d.message, "unknown field"),
        }
    }

    #[test]
    fn free_form_properties_are_not_unknown_fields() {
        let result = validate_toml_str("[trigger.properties]\n\"jobStore.class\" = \"memory\"\n");
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn misspelled_property_is_warned() {
        let result = validate_toml_str("[trigger.properties]\n\"threadPool.threadCont\" = \"2\"\n");
        let d = at(&result, "trigger.properties.threadPool.threadCont");
        assert_eq!(d.severity, Severity::Warning);
        assert!(d.message.contains(THREAD_COUNT_KEY));
    }

    #[rstest]
    #[case("[trigger]\nthread_count = 0\n", "trigger.thread_count")]
    #[case("[trigger]\ntimezone = \"Nowhere/Special\"\n", "trigger.timezone")]
    #[case("[runner]\ntimezone = \"Nowhere/Special\"\n", "runner.timezone")]
    #[case(
        "[trigger.properties]\n\"threadPool.threadCount\" = \"ten\"\n",
        "trigger.properties.threadPool.threadCount"
    )]
    fn value_errors(#[case] toml: &str, #[case] path: &str) {
        let result = validate_toml_str(toml);
        let d = at(&result, path);
        assert_eq!((d.severity, d.category), (Severity::Error, Category::Value));
    }

    #[test]
    fn blank_scheduler_name_is_warning() {
        let result = validate_toml_str("[trigger]\nscheduler_name = \" \"\n");
        assert!(!result.has_errors());
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(
            at(&result, "trigger.scheduler_name").to_string(),
            "warning: trigger.scheduler_name: scheduler name is blank"
        );
    }

    #[test]
    fn type_errors_are_reported() {
        let result = validate_toml_str("[trigger]\nthread_count = \"many\"\n");
        assert!(result.errors().any(|d| d.category == Category::Type));
    }

    #[test]
    fn syntax_error() {
        let result = validate_toml_str("[trigger\n");
        assert_eq!(result.diagnostics[0].category, Category::Syntax);
        assert!(result.diagnostics[0].to_string().starts_with("error: TOML syntax error"));
    }

    #[test]
    fn log_level_directives_are_accepted() {
        let cfg = CronConfig {
            logging: crate::schema::LoggingConfig {
                level: "cronrepo_trigger=debug".into(),
                json: false,
            },
            ..CronConfig::default()
        };
        assert!(validate_config(&cfg).diagnostics.is_empty());
    }

    #[test]
    fn validates_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cronrepo.yaml");
        std::fs::write(&path, "trigger:\n  thread_count: 0\n").unwrap();
        let result = validate(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
