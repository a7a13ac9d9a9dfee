use super::defaults;
use super::models::{AppConfig, KeyBindings, LogLevel};
use serde::Deserialize;

/// On-disk layout: the TOML file groups settings into tables, while the rest
/// of the code works with the flat [`AppConfig`].
#[derive(Debug, Clone, Deserialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    speech: SpeechConfig,
    #[serde(default)]
    images: ImagesConfig,
    #[serde(default)]
    dictionary: DictionaryConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    keys: KeysConfig,
}

impl Default for ConfigTables {
    fn default() -> Self {
        ConfigTables {
            speech: SpeechConfig::default(),
            images: ImagesConfig::default(),
            dictionary: DictionaryConfig::default(),
            logging: LoggingConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            voice: tables.speech.voice,
            rate: tables.speech.rate,
            pitch: tables.speech.pitch,
            words_per_minute: tables.speech.words_per_minute,
            speech_enabled: tables.speech.enabled,
            images_enabled: tables.images.enabled,
            search_endpoint: tables.images.search_endpoint,
            api_key_env: tables.images.api_key_env,
            search_timeout_secs: tables.images.timeout_secs,
            dictionary_path: tables.dictionary.path,
            log_level: tables.logging.log_level,
            keys: KeyBindings {
                pause: tables.keys.pause,
                resume: tables.keys.resume,
                stop: tables.keys.stop,
                faster: tables.keys.faster,
                slower: tables.keys.slower,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SpeechConfig {
    #[serde(default)]
    voice: Option<String>,
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default = "defaults::default_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_words_per_minute")]
    words_per_minute: u32,
    #[serde(default = "defaults::default_speech_enabled")]
    enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            voice: None,
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            words_per_minute: defaults::default_words_per_minute(),
            enabled: defaults::default_speech_enabled(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ImagesConfig {
    #[serde(default = "defaults::default_images_enabled")]
    enabled: bool,
    #[serde(default = "defaults::default_search_endpoint")]
    search_endpoint: String,
    #[serde(default = "defaults::default_api_key_env")]
    api_key_env: String,
    #[serde(default = "defaults::default_search_timeout_secs")]
    timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        ImagesConfig {
            enabled: defaults::default_images_enabled(),
            search_endpoint: defaults::default_search_endpoint(),
            api_key_env: defaults::default_api_key_env(),
            timeout_secs: defaults::default_search_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DictionaryConfig {
    #[serde(default = "defaults::default_dictionary_path")]
    path: String,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        DictionaryConfig {
            path: defaults::default_dictionary_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KeysConfig {
    #[serde(default = "defaults::default_key_pause")]
    pause: String,
    #[serde(default = "defaults::default_key_resume")]
    resume: String,
    #[serde(default = "defaults::default_key_stop")]
    stop: String,
    #[serde(default = "defaults::default_key_faster")]
    faster: String,
    #[serde(default = "defaults::default_key_slower")]
    slower: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        KeysConfig {
            pause: defaults::default_key_pause(),
            resume: defaults::default_key_resume(),
            stop: defaults::default_key_stop(),
            faster: defaults::default_key_faster(),
            slower: defaults::default_key_slower(),
        }
    }
}
