// src/config.rs
//
// Runtime configuration, read from a YAML file. Credentials and endpoints
// live here instead of process-wide constants so each stage gets passed
// exactly what it needs.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Indicative currency-rates page.
    #[serde(default = "default_rates_url")]
    pub rates_url: String,

    /// Year the EUR/RUB request is pinned to when the default date range
    /// comes back empty.
    #[serde(default = "default_fallback_year")]
    pub fallback_year: i32,

    /// Bypass any system proxy when talking to the exchange.
    #[serde(default = "default_true")]
    pub bypass_proxy: bool,

    /// Workbook destination, overwritten on every run.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,

    /// SMTPS (implicit TLS) port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    pub username: String,
    pub password: String,

    pub from: String,
    pub to: Vec<String>,

    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }
}

fn default_rates_url() -> String {
    "https://www.moex.com/ru/derivatives/currency-rate.aspx".to_string()
}

fn default_fallback_year() -> i32 {
    Utc::now().year()
}

fn default_true() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from("moex.xlsx")
}

fn default_smtp_server() -> String {
    "smtp.yandex.ru".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_subject() -> String {
    "Moex data".to_string()
}
