use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemePreference::Light),
            "dark" => Some(ThemePreference::Dark),
            "system" => Some(ThemePreference::System),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::System,
            ThemePreference::System => ThemePreference::Light,
        }
    }
}

pub trait PreferenceStore: Send {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str);
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Settings {
    #[serde(default)]
    theme: Option<String>,
}

/// Preferences kept in `settings.json` under the user config directory.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("komik-tui");

        if let Err(e) = fs::create_dir_all(&config_dir) {
            log::warn!("failed to create config directory: {}", e);
        }
        Self::at(config_dir.join("settings.json"))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Settings {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        match key {
            THEME_KEY => self.read().theme,
            _ => None,
        }
    }

    fn save(&mut self, key: &str, value: &str) {
        let mut settings = self.read();
        match key {
            THEME_KEY => settings.theme = Some(value.to_string()),
            _ => return,
        }

        match serde_json::to_string_pretty(&settings) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    log::warn!("failed to write {}: {}", self.path.display(), e);
                }
            }
            Err(e) => log::warn!("failed to serialize settings: {}", e),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Latest OS colour-scheme signal (`true` = dark).
#[derive(Clone)]
pub struct SystemScheme {
    tx: Arc<watch::Sender<bool>>,
}

impl SystemScheme {
    pub fn new(prefers_dark: bool) -> Self {
        let (tx, _rx) = watch::channel(prefers_dark);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, prefers_dark: bool) {
        self.tx.send_if_modified(|current| {
            if *current == prefers_dark {
                return false;
            }
            *current = prefers_dark;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight: Color,
    pub error: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        text: Color::White,
        muted: Color::DarkGray,
        accent: Color::Cyan,
        highlight: Color::Yellow,
        error: Color::LightRed,
    };

    pub const LIGHT: Palette = Palette {
        text: Color::Black,
        muted: Color::Gray,
        accent: Color::Blue,
        highlight: Color::Magenta,
        error: Color::Red,
    };
}

/// Effective light/dark mode from a persisted tri-state preference.
///
/// While the preference is `System` the service holds a subscription to the
/// OS signal and reads through it, so a scheme change shows up on the next
/// frame. Explicit preferences drop the subscription.
pub struct ThemeService {
    preference: ThemePreference,
    store: Box<dyn PreferenceStore>,
    system: SystemScheme,
    subscription: Option<watch::Receiver<bool>>,
}

impl ThemeService {
    pub fn new(store: Box<dyn PreferenceStore>, system: SystemScheme) -> Self {
        let preference = store
            .load(THEME_KEY)
            .and_then(|v| ThemePreference::parse(&v))
            .unwrap_or_default();

        let mut service = Self {
            preference,
            store,
            system,
            subscription: None,
        };
        service.sync_subscription();
        service
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn is_dark_mode(&self) -> bool {
        match self.preference {
            ThemePreference::Light => false,
            ThemePreference::Dark => true,
            ThemePreference::System => self
                .subscription
                .as_ref()
                .map(|rx| *rx.borrow())
                .unwrap_or(false),
        }
    }

    pub fn toggle_theme(&mut self) -> ThemePreference {
        self.preference = self.preference.next();
        self.store.save(THEME_KEY, self.preference.as_str());
        self.sync_subscription();
        log::info!(
            "theme preference is now {} (dark: {})",
            self.preference.as_str(),
            self.is_dark_mode()
        );
        self.preference
    }

    pub fn palette(&self) -> Palette {
        if self.is_dark_mode() {
            Palette::DARK
        } else {
            Palette::LIGHT
        }
    }

    fn sync_subscription(&mut self) {
        match self.preference {
            ThemePreference::System => {
                if self.subscription.is_none() {
                    self.subscription = Some(self.system.subscribe());
                }
            }
            _ => self.subscription = None,
        }
    }
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`); low ANSI backgrounds
/// other than 7 (light gray) are dark.
pub fn parse_colorfgbg(value: &str) -> Option<bool> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(matches!(bg, 0..=6 | 8))
}

pub async fn detect_system_dark() -> Option<bool> {
    if cfg!(target_os = "macos") {
        let output = Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .await
            .ok()?;
        // The key is absent in light mode, which makes `defaults` fail.
        return Some(
            output.status.success() && String::from_utf8_lossy(&output.stdout).contains("Dark"),
        );
    }

    if let Ok(output) = Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", "color-scheme"])
        .output()
        .await
    {
        if output.status.success() {
            return Some(String::from_utf8_lossy(&output.stdout).contains("dark"));
        }
    }

    std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| parse_colorfgbg(&v))
}

pub fn spawn_scheme_watcher(system: SystemScheme, interval: Duration) {
    tokio::spawn(async move {
        loop {
            if let Some(dark) = detect_system_dark().await {
                system.set(dark);
            }
            tokio::time::sleep(interval).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(saved: Option<&str>, os_dark: bool) -> (ThemeService, SystemScheme) {
        let mut store = MemoryStore::default();
        if let Some(saved) = saved {
            store.save(THEME_KEY, saved);
        }
        let system = SystemScheme::new(os_dark);
        (ThemeService::new(Box::new(store), system.clone()), system)
    }

    #[test]
    fn missing_or_unknown_preference_means_system() {
        let (service, _) = service_with(None, true);
        assert_eq!(service.preference(), ThemePreference::System);
        assert!(service.is_dark_mode());

        let (service, _) = service_with(Some("sepia"), false);
        assert_eq!(service.preference(), ThemePreference::System);
    }

    #[test]
    fn toggle_cycles_from_any_start() {
        for start in ["light", "dark", "system"] {
            let (mut service, _) = service_with(Some(start), false);
            let first = service.preference();
            let cycle: Vec<_> = (0..3).map(|_| service.toggle_theme()).collect();
            assert_eq!(cycle[2], first);
            assert_eq!(cycle[0], first.next());
            assert_eq!(cycle[1], first.next().next());
        }

        let (mut service, _) = service_with(Some("light"), false);
        assert_eq!(service.toggle_theme(), ThemePreference::Dark);
        assert_eq!(service.toggle_theme(), ThemePreference::System);
        assert_eq!(service.toggle_theme(), ThemePreference::Light);
    }

    #[test]
    fn toggle_persists_preference() {
        let (mut service, _) = service_with(Some("light"), false);
        service.toggle_theme();
        assert_eq!(service.store.load(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn system_mode_follows_os_changes() {
        let (service, system) = service_with(Some("system"), false);
        assert!(!service.is_dark_mode());

        system.set(true);
        assert!(service.is_dark_mode());
        system.set(false);
        assert!(!service.is_dark_mode());
    }

    #[test]
    fn explicit_mode_unsubscribes_from_os() {
        let (mut service, system) = service_with(Some("system"), true);
        assert_eq!(system.subscriber_count(), 1);

        service.toggle_theme(); // light
        assert_eq!(system.subscriber_count(), 0);
        system.set(true);
        assert!(!service.is_dark_mode());

        service.toggle_theme(); // dark
        assert_eq!(system.subscriber_count(), 0);
        service.toggle_theme(); // system
        assert_eq!(system.subscriber_count(), 1);
        assert!(service.is_dark_mode());
    }

    #[test]
    fn independent_services_do_not_share_state() {
        let (mut a, _) = service_with(Some("light"), false);
        let (b, _) = service_with(Some("light"), false);
        a.toggle_theme();
        assert!(a.is_dark_mode());
        assert!(!b.is_dark_mode());
    }

    #[test]
    fn file_store_round_trips_theme() {
        let path = std::env::temp_dir().join(format!(
            "komik-tui-settings-{}.json",
            std::process::id()
        ));
        let mut store = FileStore::at(path.clone());
        assert_eq!(store.load(THEME_KEY), None);
        store.save(THEME_KEY, "dark");
        assert_eq!(FileStore::at(path.clone()).load(THEME_KEY).as_deref(), Some("dark"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn colorfgbg_background_decides_darkness() {
        assert_eq!(parse_colorfgbg("15;0"), Some(true));
        assert_eq!(parse_colorfgbg("0;15"), Some(false));
        assert_eq!(parse_colorfgbg("15;default;0"), Some(true));
        assert_eq!(parse_colorfgbg("garbage"), None);
    }
}
