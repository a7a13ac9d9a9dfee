use super::defaults;

/// High-level app configuration, flattened from the TOML tables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub words_per_minute: u32,
    pub speech_enabled: bool,
    pub images_enabled: bool,
    pub search_endpoint: String,
    pub api_key_env: String,
    pub search_timeout_secs: u64,
    pub dictionary_path: String,
    pub log_level: LogLevel,
    pub keys: KeyBindings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            voice: None,
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            words_per_minute: defaults::default_words_per_minute(),
            speech_enabled: defaults::default_speech_enabled(),
            images_enabled: defaults::default_images_enabled(),
            search_endpoint: defaults::default_search_endpoint(),
            api_key_env: defaults::default_api_key_env(),
            search_timeout_secs: defaults::default_search_timeout_secs(),
            dictionary_path: defaults::default_dictionary_path(),
            log_level: defaults::default_log_level(),
            keys: KeyBindings::default(),
        }
    }
}

/// Single-line commands accepted on stdin during playback.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub pause: String,
    pub resume: String,
    pub stop: String,
    pub faster: String,
    pub slower: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            pause: defaults::default_key_pause(),
            resume: defaults::default_key_resume(),
            stop: defaults::default_key_stop(),
            faster: defaults::default_key_faster(),
            slower: defaults::default_key_slower(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
