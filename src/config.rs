use crate::core::input::parse_binding_list;
use crate::game::bindings::{ManiaAction, KeyBinding};
use crate::game::ruleset::MANIA_RULESET_ID;
use crate::game::scroll::ScrollDirection;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

pub const CONFIG_PATH: &str = "lanesync.ini";

const OPTIONS_SECTION: &str = "Options";
const VARIANT_SECTION_PREFIX: &str = "Variant";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content);
        Ok(())
    }

    pub fn parse_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &HashMap<String, String>)> {
        self.sections.iter().map(|(name, kv)| (name.as_str(), kv))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub log_level: LogLevel,
    pub scroll_direction: ScrollDirection,
}

impl Config {
    /// Reads `[Options]`, keeping defaults for missing or malformed keys.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();

        let log_level = match conf.get(OPTIONS_SECTION, "LogLevel") {
            Some(v) => v.parse::<LogLevel>().unwrap_or_else(|()| {
                warn!("Invalid LogLevel '{v}' in '{CONFIG_PATH}', using {}.", default.log_level.as_str());
                default.log_level
            }),
            None => default.log_level,
        };

        let scroll_direction = match conf.get(OPTIONS_SECTION, "ScrollDirection") {
            Some(v) => v.parse::<ScrollDirection>().unwrap_or_else(|e| {
                warn!("{e} in '{CONFIG_PATH}', using {}.", default.scroll_direction);
                default.scroll_direction
            }),
            None => default.scroll_direction,
        };

        Self { log_level, scroll_direction }
    }
}

static CONFIG: LazyLock<Mutex<Config>> = LazyLock::new(|| Mutex::new(Config::default()));
static KEY_BINDING_OVERRIDES: LazyLock<Mutex<Vec<KeyBinding>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

// --- Key binding overrides ---

/// `Variant7` -> 7
fn parse_variant_section(name: &str) -> Option<i32> {
    name.strip_prefix(VARIANT_SECTION_PREFIX)?.trim().parse().ok()
}

/// Collects `[Variant<N>]` sections into mania key bindings.
pub fn key_bindings_from_ini(conf: &SimpleIni) -> Vec<KeyBinding> {
    // Sorted so the resulting binding order is stable across runs.
    let mut variants: BTreeMap<i32, BTreeMap<ManiaAction, &str>> = BTreeMap::new();
    for (name, entries) in conf.sections() {
        let Some(variant) = parse_variant_section(name) else {
            continue;
        };
        let slot = variants.entry(variant).or_default();
        for (k, v) in entries {
            match k.parse::<ManiaAction>() {
                Ok(action) => {
                    slot.insert(action, v.as_str());
                }
                Err(e) => warn!("[{name}] {e}; skipping."),
            }
        }
    }

    let mut out = Vec::new();
    for (variant, actions) in variants {
        for (action, value) in actions {
            for keys in parse_binding_list(value) {
                out.push(KeyBinding {
                    ruleset_id: Some(MANIA_RULESET_ID),
                    variant: Some(variant),
                    keys,
                    action,
                });
            }
        }
    }
    out
}

// --- Global config ---

pub fn load() {
    load_from(CONFIG_PATH);
}

pub fn load_from<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    if !path.exists() {
        info!("'{}' not found, using default values.", path.display());
        return;
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            *CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = Config::from_ini(&conf);
            let overrides = key_bindings_from_ini(&conf);
            info!(
                "Configuration loaded from '{}' ({} key binding overrides).",
                path.display(),
                overrides.len()
            );
            *KEY_BINDING_OVERRIDES.lock().unwrap_or_else(|e| e.into_inner()) = overrides;
        }
        Err(e) => warn!("Failed to load '{}': {e}. Using default values.", path.display()),
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn key_binding_overrides() -> Vec<KeyBinding> {
    KEY_BINDING_OVERRIDES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}
