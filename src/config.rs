use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Currency, ExchangeRates};

fn default_timeout_secs() -> u64 {
    10
}

fn default_base_label() -> String {
    "FCFA".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub device_id: Uuid,

    /// Snapshot endpoint, also used as the write sink. Unset disables all
    /// remote traffic.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Upper bound on any single remote call.
    #[serde(default = "default_timeout_secs")]
    pub sync_timeout_secs: u64,

    #[serde(default)]
    pub rates: ExchangeRates,

    /// Display label for the base unit.
    #[serde(default = "default_base_label")]
    pub base_label: String,

    #[serde(default)]
    pub default_currency: Currency,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_id: Uuid::new_v4(),
            remote_url: None,
            sync_timeout_secs: default_timeout_secs(),
            rates: ExchangeRates::default(),
            base_label: default_base_label(),
            default_currency: Currency::Base,
        }
    }
}

impl AppConfig {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs.max(1))
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn validate(&self) -> Result<()> {
        if self.rates.eur <= Decimal::ZERO || self.rates.usd <= Decimal::ZERO {
            return Err(anyhow!("Exchange rates must be > 0 (EUR={}, USD={})", self.rates.eur, self.rates.usd));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            config_dir: home.join("config"),
            data_dir: home.join("data"),
        });
    }

    let proj = ProjectDirs::from("com", "moneyflow", "moneyflow")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        config_dir: proj.config_dir().to_path_buf(),
        data_dir: proj.data_dir().to_path_buf(),
    })
}

pub fn load_or_init_config(paths: &AppPaths) -> Result<(AppConfig, PathBuf)> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("Failed to create config dir {}", paths.config_dir.display()))?;

    let cfg_path = paths.config_dir.join("config.json");
    if !cfg_path.exists() {
        let cfg = AppConfig::default();
        write_config(&cfg_path, &cfg)?;
        return Ok((cfg, cfg_path));
    }

    let raw = fs::read_to_string(&cfg_path)
        .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
    let cfg: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cfg_path.display()))?;
    cfg.validate()
        .with_context(|| format!("Invalid config {}", cfg_path.display()))?;

    // Rewrite so that fields added since the file was created become visible.
    let current = serde_json::to_string_pretty(&cfg)?;
    if current != raw {
        write_config(&cfg_path, &cfg)?;
    }

    Ok((cfg, cfg_path))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}
