//! Configuration Vault – reads/writes `~/.kiosk/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiosk_kernel::WatchdogPolicy;
use kiosk_knowledge::RankPolicy;
use kiosk_perception::DebounceConfig;
use kiosk_runtime::{KioskLoopConfig, SessionConfig};
use kiosk_types::{KioskError, Language};

/// Longest accepted idle timeout (one day).
const MAX_IDLE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Persisted kiosk configuration stored in `~/.kiosk/config.toml`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote sheet endpoint.  Also receives the query analytics log.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub knowledge_url: String,

    /// Local JSON file used instead of `knowledge_url` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_file: Option<PathBuf>,

    /// Seconds between failed knowledge fetches.
    #[serde(default = "default_retry_secs")]
    pub knowledge_retry_secs: u64,

    /// Language active at startup (`"th"` or `"en"`).
    #[serde(default)]
    pub language: Language,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Minimum score for answering directly.
    #[serde(default = "default_answer_threshold")]
    pub answer_threshold: f32,

    /// Lower edge of the "did you mean" band.  Unset disables the band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarify_threshold: Option<f32>,

    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    #[serde(default = "default_clear_ms")]
    pub clear_ms: u64,

    #[serde(default = "default_watchdog_per_char_ms")]
    pub watchdog_per_char_ms: u64,

    #[serde(default = "default_watchdog_floor_ms")]
    pub watchdog_floor_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_presence_poll_ms")]
    pub presence_poll_ms: u64,

    /// Speech volume, `0.0` – `1.0`.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Deployment URLs embed the script id; only the host is printed.
fn redact_url(url: &str) -> String {
    if url.is_empty() {
        return "<not set>".to_string();
    }
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or_default();
            format!("{scheme}://{host}/<redacted>")
        }
        None => "<redacted>".to_string(),
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("knowledge_url", &redact_url(&self.knowledge_url))
            .field("knowledge_file", &self.knowledge_file)
            .field("knowledge_retry_secs", &self.knowledge_retry_secs)
            .field("language", &self.language)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("answer_threshold", &self.answer_threshold)
            .field("clarify_threshold", &self.clarify_threshold)
            .field("dwell_ms", &self.dwell_ms)
            .field("clear_ms", &self.clear_ms)
            .field("watchdog_per_char_ms", &self.watchdog_per_char_ms)
            .field("watchdog_floor_ms", &self.watchdog_floor_ms)
            .field("tick_interval_ms", &self.tick_interval_ms)
            .field("presence_poll_ms", &self.presence_poll_ms)
            .field("volume", &self.volume)
            .finish()
    }
}

fn default_retry_secs() -> u64 {
    5
}
fn default_idle_timeout_secs() -> u64 {
    30
}
fn default_answer_threshold() -> f32 {
    0.45
}
fn default_dwell_ms() -> u64 {
    1500
}
fn default_clear_ms() -> u64 {
    15_000
}
fn default_watchdog_per_char_ms() -> u64 {
    200
}
fn default_watchdog_floor_ms() -> u64 {
    5000
}
fn default_tick_interval_ms() -> u64 {
    250
}
fn default_presence_poll_ms() -> u64 {
    500
}
fn default_volume() -> f32 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            knowledge_url: String::new(),
            knowledge_file: None,
            knowledge_retry_secs: default_retry_secs(),
            language: Language::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
            answer_threshold: default_answer_threshold(),
            clarify_threshold: None,
            dwell_ms: default_dwell_ms(),
            clear_ms: default_clear_ms(),
            watchdog_per_char_ms: default_watchdog_per_char_ms(),
            watchdog_floor_ms: default_watchdog_floor_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            presence_poll_ms: default_presence_poll_ms(),
            volume: default_volume(),
        }
    }
}

impl Config {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), KioskError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.answer_threshold) {
            return Err(KioskError::Config(format!(
                "answer_threshold must be within [0, 1], got {}",
                self.answer_threshold
            )));
        }
        if let Some(floor) = self.clarify_threshold
            && (!unit.contains(&floor) || floor >= self.answer_threshold)
        {
            return Err(KioskError::Config(format!(
                "clarify_threshold must be within [0, answer_threshold), got {floor}"
            )));
        }
        if !unit.contains(&self.volume) {
            return Err(KioskError::Config(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }
        if self.idle_timeout_secs == 0 || self.tick_interval_ms == 0 || self.presence_poll_ms == 0 {
            return Err(KioskError::Config(
                "idle_timeout_secs, tick_interval_ms and presence_poll_ms must be non-zero".into(),
            ));
        }
        if self.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(KioskError::Config(format!(
                "idle_timeout_secs must be at most {MAX_IDLE_TIMEOUT_SECS}, got {}",
                self.idle_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            default_language: self.language,
            rank: RankPolicy {
                answer_threshold: self.answer_threshold,
                clarify_threshold: self.clarify_threshold,
            },
            watchdog: WatchdogPolicy {
                per_char: Duration::from_millis(self.watchdog_per_char_ms),
                floor: Duration::from_millis(self.watchdog_floor_ms),
            },
            volume: self.volume,
        }
    }

    pub fn loop_config(&self) -> KioskLoopConfig {
        KioskLoopConfig {
            debounce: DebounceConfig {
                dwell: Duration::from_millis(self.dwell_ms),
                clear: Duration::from_millis(self.clear_ms),
            },
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            presence_poll_interval: Duration::from_millis(self.presence_poll_ms),
            knowledge_retry_delay: Duration::from_secs(self.knowledge_retry_secs),
        }
    }
}

/// Return the path to `~/.kiosk/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".kiosk").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, KioskError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, KioskError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        KioskError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| KioskError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `KIOSK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `KIOSK_KNOWLEDGE_URL` | `knowledge_url` |
/// | `KIOSK_KNOWLEDGE_FILE` | `knowledge_file` |
/// | `KIOSK_LANGUAGE` | `language` (`th` / `en`) |
/// | `KIOSK_IDLE_TIMEOUT_SECS` | `idle_timeout_secs` |
/// | `KIOSK_ANSWER_THRESHOLD` | `answer_threshold` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("KIOSK_KNOWLEDGE_URL") {
        cfg.knowledge_url = v;
    }
    if let Ok(v) = std::env::var("KIOSK_KNOWLEDGE_FILE") {
        cfg.knowledge_file = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("KIOSK_LANGUAGE")
        && let Ok(language) = v.parse::<Language>()
    {
        cfg.language = language;
    }
    if let Ok(v) = std::env::var("KIOSK_IDLE_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.idle_timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("KIOSK_ANSWER_THRESHOLD")
        && let Ok(threshold) = v.parse::<f32>()
    {
        cfg.answer_threshold = threshold;
    }
}

/// Save the config to disk, creating `~/.kiosk/` if necessary.
pub fn save(cfg: &Config) -> Result<(), KioskError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), KioskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| KioskError::Config(format!("failed to create config directory: {e}")))?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                KioskError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| KioskError::Serialization(format!("failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| KioskError::Config(format!("failed to write {}: {e}", path.display()));
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
