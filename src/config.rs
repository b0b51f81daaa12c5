use std::path::PathBuf;

use crate::backend::api::DEFAULT_BASE_URL;
use crate::reader::reveal::RevealOptions;

const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub per_page: u32,
    pub reveal: RevealOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            reveal: RevealOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);

        Self {
            api_base_url,
            per_page: number(&lookup, "KOMIK_PER_PAGE", defaults.per_page).max(1),
            reveal: RevealOptions {
                margin: number(&lookup, "KOMIK_REVEAL_MARGIN", defaults.reveal.margin),
                priority: number(&lookup, "KOMIK_PRIORITY_PAGES", defaults.reveal.priority),
            },
        }
    }
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {}={:?}", key, raw);
            default
        }),
    }
}

/// Where the log file lives; the terminal itself is owned by the UI.
pub fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("komik-tui")
        .join("komik-tui.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.per_page, 20);
        assert_eq!(config.reveal.margin, 24);
        assert_eq!(config.reveal.priority, 3);
    }

    #[test]
    fn environment_overrides_and_bad_numbers_fall_back() {
        let config = config(&[
            ("API_BASE_URL", "http://localhost:8080/comic"),
            ("KOMIK_PER_PAGE", "50"),
            ("KOMIK_REVEAL_MARGIN", "lots"),
            ("KOMIK_PRIORITY_PAGES", "0"),
        ]);
        assert_eq!(config.api_base_url, "http://localhost:8080/comic");
        assert_eq!(config.per_page, 50);
        assert_eq!(config.reveal.margin, 24);
        assert_eq!(config.reveal.priority, 0);
    }
}
