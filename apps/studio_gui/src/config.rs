//! Startup configuration: built-in defaults, then `studio.toml`, then
//! environment variables. CLI flags are applied on top in `main`.

use std::fs;

use serde::Deserialize;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
const CONFIG_FILE: &str = "studio.toml";

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
    pub with_timer: bool,
    pub with_style_picker: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            with_timer: true,
            with_style_picker: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    timer: Option<bool>,
    styles: Option<bool>,
}

pub fn load_settings() -> StartupConfig {
    let mut settings = StartupConfig::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        match toml::from_str::<FileConfig>(&raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, file_cfg),
            Err(err) => tracing::warn!("ignoring malformed {CONFIG_FILE}: {err}"),
        }
    }

    if let Ok(v) = std::env::var("KONTEXT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("KONTEXT_TIMER") {
        if let Some(flag) = parse_bool_flag(&v) {
            settings.with_timer = flag;
        }
    }
    if let Ok(v) = std::env::var("KONTEXT_STYLES") {
        if let Some(flag) = parse_bool_flag(&v) {
            settings.with_style_picker = flag;
        }
    }

    settings
}

fn apply_file_config(settings: &mut StartupConfig, file_cfg: FileConfig) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.timer {
        settings.with_timer = v;
    }
    if let Some(v) = file_cfg.styles {
        settings.with_style_picker = v;
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_both_capabilities() {
        let settings = StartupConfig::default();
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert!(settings.with_timer);
        assert!(settings.with_style_picker);
    }

    #[test]
    fn file_config_overrides_only_present_keys() {
        let mut settings = StartupConfig::default();
        let file_cfg: FileConfig =
            toml::from_str("server_url = \"http://gen.local:9000\"\ntimer = false\n")
                .expect("parse");
        apply_file_config(&mut settings, file_cfg);

        assert_eq!(settings.server_url, "http://gen.local:9000");
        assert!(!settings.with_timer);
        assert!(settings.with_style_picker);
    }

    #[test]
    fn bool_flags_parse_common_spellings() {
        assert_eq!(parse_bool_flag("1"), Some(true));
        assert_eq!(parse_bool_flag(" ON "), Some(true));
        assert_eq!(parse_bool_flag("false"), Some(false));
        assert_eq!(parse_bool_flag("off"), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }
}
