// Configuration loading and parsing (settings.toml, classroom.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::quiz::{FeedbackPhrases, QuizItem, QuizTiming};
use crate::store::MAX_QUESTIONS;
use crate::wheel::SpinDuration;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub classroom: Classroom,
    /// Directory the files were loaded from. The credential file lives here.
    pub config_dir: PathBuf,
}

impl Config {
    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE)
    }
}

pub const CREDENTIALS_FILE: &str = "credentials.toml";

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub wheel: WheelConfig,
    pub quiz: QuizConfig,
    pub voice: VoiceConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    pub spin_duration: SpinDuration,
    /// Period of the animation/timer loop.
    pub frame_interval_ms: u64,
}

impl WheelConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    /// Pause between the wheel stopping and the question appearing.
    pub intro_delay_ms: u64,
    pub reveal_delay_ms: u64,
    pub resolve_delay_ms: u64,
    pub celebration_ms: u64,
    pub confetti_count: usize,
}

impl QuizConfig {
    pub fn intro_delay(&self) -> Duration {
        Duration::from_millis(self.intro_delay_ms)
    }

    pub fn celebration(&self) -> Duration {
        Duration::from_millis(self.celebration_ms)
    }

    pub fn timing(&self) -> QuizTiming {
        QuizTiming {
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
            resolve_delay: Duration::from_millis(self.resolve_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// Initial sound state. Toggled at runtime.
    pub enabled: bool,
    /// Speech program and its arguments; the phrase is appended as the last
    /// argument. Empty means speech is skipped.
    #[serde(default)]
    pub command: Vec<String>,
    /// Spoken when the wheel stops. `{name}` is replaced by the entrant.
    pub invite: String,
    pub correct: String,
    pub wrong: String,
}

impl VoiceConfig {
    pub fn invitation(&self, name: &str) -> String {
        self.invite.replace("{name}", name)
    }

    pub fn feedback(&self) -> FeedbackPhrases {
        FeedbackPhrases {
            correct: self.correct.clone(),
            wrong: self.wrong.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub topic_temperature: f32,
    pub document_temperature: f32,
    pub topic_question_count: usize,
    /// Language the generated questions are written in.
    pub language: String,
    pub max_upload_bytes: u64,
}

// ---------------------------------------------------------------------------
// classroom.toml structs
// ---------------------------------------------------------------------------

/// Initial roster and question bank.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Classroom {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub questions: Vec<QuizItem>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/settings.toml` and `config/classroom.toml`
/// relative to `base_dir`. Does not copy defaults; see `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let settings_path = config_dir.join("settings.toml");
    let settings_text = read_file(&settings_path)?;
    let settings: Settings =
        toml::from_str(&settings_text).map_err(|e| ConfigError::ParseError {
            path: settings_path.clone(),
            source: e,
        })?;

    let classroom_path = config_dir.join("classroom.toml");
    let classroom_text = read_file(&classroom_path)?;
    let mut classroom: Classroom =
        toml::from_str(&classroom_text).map_err(|e| ConfigError::ParseError {
            path: classroom_path.clone(),
            source: e,
        })?;
    classroom.names = classroom
        .names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let config = Config {
        settings,
        classroom,
        config_dir,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let s = &config.settings;

    let millis: &[(&str, u64)] = &[
        ("wheel.frame_interval_ms", s.wheel.frame_interval_ms),
        ("quiz.intro_delay_ms", s.quiz.intro_delay_ms),
        ("quiz.reveal_delay_ms", s.quiz.reveal_delay_ms),
        ("quiz.resolve_delay_ms", s.quiz.resolve_delay_ms),
        ("quiz.celebration_ms", s.quiz.celebration_ms),
    ];
    for (name, val) in millis {
        if *val == 0 {
            return Err(invalid(*name, "must be > 0"));
        }
    }

    let temperatures: &[(&str, f32)] = &[
        ("llm.topic_temperature", s.llm.topic_temperature),
        ("llm.document_temperature", s.llm.document_temperature),
    ];
    for (name, val) in temperatures {
        if !(0.0..=2.0).contains(val) {
            return Err(invalid(
                *name,
                format!("must be between 0.0 and 2.0 inclusive, got {val}"),
            ));
        }
    }

    if s.llm.model.trim().is_empty() {
        return Err(invalid("llm.model", "must not be empty"));
    }
    if s.llm.base_url.trim().is_empty() {
        return Err(invalid("llm.base_url", "must not be empty"));
    }
    let count = s.llm.topic_question_count;
    if !(1..=MAX_QUESTIONS).contains(&count) {
        return Err(invalid(
            "llm.topic_question_count",
            format!("must be between 1 and {MAX_QUESTIONS}, got {count}"),
        ));
    }
    if s.llm.max_upload_bytes == 0 {
        return Err(invalid("llm.max_upload_bytes", "must be > 0"));
    }

    if config.classroom.questions.len() > MAX_QUESTIONS {
        return Err(invalid(
            "classroom.questions",
            format!("at most {MAX_QUESTIONS} questions allowed"),
        ));
    }
    for (i, item) in config.classroom.questions.iter().enumerate() {
        if item.question().trim().is_empty() {
            return Err(invalid(
                format!("classroom.questions[{i}].q"),
                "must not be empty",
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root holding `defaults/`.
    fn project_root() -> PathBuf {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        if root.join("defaults").exists() {
            root
        } else {
            panic!("Cannot locate defaults/ directory from {:?}", manifest);
        }
    }

    /// Fresh temp dir with both default files copied into `config/`.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("classwheel_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let root = project_root();
        for file in ["settings.toml", "classroom.toml"] {
            fs::copy(root.join("defaults").join(file), config_dir.join(file)).unwrap();
        }
        tmp
    }

    fn edit_settings(base: &Path, from: &str, to: &str) {
        let path = base.join("config/settings.toml");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "settings.toml has no `{from}`");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn expect_invalid_field(base: &Path, expected: &str) {
        match load_config_from(base).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_defaults() {
        let tmp = scratch("load_defaults");
        let config = load_config_from(&tmp).expect("should load default config");

        assert_eq!(config.settings.wheel.spin_duration, SpinDuration::Medium);
        assert_eq!(config.settings.wheel.frame_interval(), Duration::from_millis(16));
        assert_eq!(config.settings.quiz.intro_delay(), Duration::from_millis(1000));
        assert_eq!(config.settings.quiz.timing(), QuizTiming::default());
        assert_eq!(config.settings.quiz.celebration(), Duration::from_millis(3000));
        assert_eq!(config.settings.quiz.confetti_count, 50);
        assert_eq!(config.settings.llm.topic_question_count, 15);
        assert_eq!(config.settings.llm.max_upload_bytes, 15 * 1024 * 1024);
        assert!((config.settings.llm.document_temperature - 0.05).abs() < f32::EPSILON);
        assert!((config.settings.llm.topic_temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.settings.voice.feedback(), FeedbackPhrases::default());

        assert_eq!(config.classroom.names.len(), 26);
        assert_eq!(config.classroom.questions.len(), 10);
        assert!(config.classroom.questions[2].question().contains("\\ce{"));
        assert_eq!(config.credentials_path(), tmp.join("config/credentials.toml"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn invitation_substitutes_name() {
        let tmp = scratch("invitation");
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.settings.voice.invitation("Hà Linh"), "Xin mời bạn Hà Linh");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn names_are_trimmed_and_blank_names_dropped() {
        let tmp = scratch("trim_names");
        fs::write(
            tmp.join("config/classroom.toml"),
            "names = [\"  An \", \"\", \"   \", \"Bình\"]\n",
        )
        .unwrap();
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.classroom.names, vec!["An", "Bình"]);
        assert!(config.classroom.questions.is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_frame_interval() {
        let tmp = scratch("zero_frame");
        edit_settings(&tmp, "frame_interval_ms = 16", "frame_interval_ms = 0");
        expect_invalid_field(&tmp, "wheel.frame_interval_ms");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_reveal_delay() {
        let tmp = scratch("zero_reveal");
        edit_settings(&tmp, "reveal_delay_ms = 800", "reveal_delay_ms = 0");
        expect_invalid_field(&tmp, "quiz.reveal_delay_ms");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let tmp = scratch("bad_temperature");
        edit_settings(&tmp, "topic_temperature = 0.4", "topic_temperature = 2.5");
        expect_invalid_field(&tmp, "llm.topic_temperature");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_question_count_above_bank_cap() {
        let tmp = scratch("bad_count");
        edit_settings(&tmp, "topic_question_count = 15", "topic_question_count = 101");
        expect_invalid_field(&tmp, "llm.topic_question_count");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_model() {
        let tmp = scratch("empty_model");
        let path = tmp.join("config/settings.toml");
        let text = fs::read_to_string(&path).unwrap();
        let patched: String = text
            .lines()
            .map(|l| if l.starts_with("model") { "model = \"\"" } else { l })
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&path, patched).unwrap();
        expect_invalid_field(&tmp, "llm.model");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_seeded_question() {
        let tmp = scratch("blank_question");
        fs::write(
            tmp.join("config/classroom.toml"),
            "names = [\"An\"]\n\n[[questions]]\nq = \"  \"\noptions = [\"a\", \"b\", \"c\", \"d\"]\ncorrect = 0\n",
        )
        .unwrap();
        expect_invalid_field(&tmp, "classroom.questions[0].q");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeded_question_with_three_options_is_a_parse_error() {
        let tmp = scratch("three_options");
        fs::write(
            tmp.join("config/classroom.toml"),
            "[[questions]]\nq = \"x\"\noptions = [\"a\", \"b\", \"c\"]\ncorrect = 0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_settings() {
        let tmp = scratch("missing_settings");
        fs::remove_file(tmp.join("config/settings.toml")).unwrap();
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("settings.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch("invalid_toml");
        fs::write(tmp.join("config/settings.toml"), "[wheel\nbroken").unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("classwheel_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        let root = project_root();
        for file in ["settings.toml", "classroom.toml", "credentials.toml.example"] {
            fs::copy(root.join("defaults").join(file), defaults.join(file)).unwrap();
        }

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied.len(), 2);
        assert!(tmp.join("config/settings.toml").exists());
        assert!(tmp.join("config/classroom.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());
        assert!(load_config_from(&tmp).is_ok());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = scratch("ensure_skips");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/settings.toml"), "overwritten = true").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        let kept = fs::read_to_string(tmp.join("config/settings.toml")).unwrap();
        assert!(!kept.contains("overwritten"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("classwheel_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
