use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::theme::ThemeName;

/// User settings, persisted as `key=value` lines. Read once at startup and
/// rewritten only on explicit changes (theme cycling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub theme: ThemeName,
    /// 0 means the category pane width is computed from the longest name.
    pub category_width_override: u16,
    pub confirmation_enabled: bool,
    pub auto_save_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            category_width_override: 0,
            confirmation_enabled: true,
            auto_save_logs: false,
        }
    }
}

impl Config {
    /// Loads the config, falling back to defaults (and rewriting the file)
    /// when it is absent or corrupt.
    ///
    /// # Errors
    /// Returns error only if the defaults cannot be written back.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => match Self::parse(&raw) {
                Some(cfg) => Ok(cfg),
                None => {
                    warn!(file = %path.display(), "corrupt config, rewriting defaults");
                    let cfg = Self::default();
                    cfg.save(path)?;
                    Ok(cfg)
                }
            },
            Err(_) => {
                let cfg = Self::default();
                cfg.save(path)?;
                Ok(cfg)
            }
        }
    }

    /// `None` when no line of the file is usable.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut cfg = Self::default();
        let mut recognized = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "current_theme" => cfg.theme = ThemeName::parse(value),
                "category_width_override" => {
                    cfg.category_width_override = value.trim().parse().unwrap_or(0);
                }
                "confirmation_enabled" => {
                    cfg.confirmation_enabled = value.trim() != "false";
                }
                "auto_save_logs" => {
                    cfg.auto_save_logs = value.trim() == "true";
                }
                _ => continue,
            }
            recognized += 1;
        }
        if recognized == 0 {
            return None;
        }
        Some(cfg)
    }

    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = format!(
            "current_theme={}\ncategory_width_override={}\nconfirmation_enabled={}\nauto_save_logs={}\n",
            self.theme.as_str(),
            self.category_width_override,
            self.confirmation_enabled,
            self.auto_save_logs,
        );
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}
