pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_pitch() -> f32 {
    1.0
}

pub(crate) fn default_words_per_minute() -> u32 {
    160
}

pub(crate) fn default_speech_enabled() -> bool {
    true
}

pub(crate) fn default_images_enabled() -> bool {
    true
}

pub(crate) fn default_search_endpoint() -> String {
    "https://api.unsplash.com/search/photos".to_string()
}

pub(crate) fn default_api_key_env() -> String {
    "WORDBEAM_IMAGE_API_KEY".to_string()
}

pub(crate) fn default_search_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_dictionary_path() -> String {
    ".wordbeam/dictionary.json".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_key_pause() -> String {
    "p".to_string()
}

pub(crate) fn default_key_resume() -> String {
    "r".to_string()
}

pub(crate) fn default_key_stop() -> String {
    "s".to_string()
}

pub(crate) fn default_key_faster() -> String {
    "+".to_string()
}

pub(crate) fn default_key_slower() -> String {
    "-".to_string()
}
