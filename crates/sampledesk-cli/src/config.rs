// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use sampledesk_crm::Credentials;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "sampledesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "30s";
const DEFAULT_PAGE_SIZE: i64 = 200;
const DEFAULT_DEMO_SEED: i64 = 1;
const DEFAULT_DEMO_SAMPLE_COUNT: i64 = 25;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub samples: Samples,
    #[serde(default)]
    pub crm: Crm,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            samples: Samples::default(),
            crm: Crm::default(),
            ui: Ui::default(),
        }
    }
}

/// Endpoint for the sample service (the editable collection).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Samples {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<String>,
}

/// Endpoint for the CRM lookup collections and deep links.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Crm {
    pub base_url: Option<String>,
    pub ui_base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub page_size: Option<i64>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub show_dashboard: Option<bool>,
    pub demo_seed: Option<i64>,
    pub demo_sample_count: Option<i64>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("SAMPLEDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set SAMPLEDESK_CONFIG_PATH to the config file"
            )
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [samples], [crm], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.samples.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "samples.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }
        if let Some(timeout) = &self.crm.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "crm.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.crm.page_size
            && page_size <= 0
        {
            bail!(
                "crm.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if self.samples.password.is_some() && self.samples.username.is_none() {
            bail!(
                "samples.password in {} is set without samples.username",
                path.display()
            );
        }
        if self.crm.password.is_some() && self.crm.username.is_none() {
            bail!(
                "crm.password in {} is set without crm.username",
                path.display()
            );
        }

        if let Some(count) = self.ui.demo_sample_count
            && count <= 0
        {
            bail!(
                "ui.demo_sample_count in {} must be positive, got {}",
                path.display(),
                count
            );
        }

        Ok(())
    }

    pub fn samples_base_url(&self) -> Result<&str> {
        match self.samples.base_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!("samples.base_url is not set -- set [samples].base_url or run with --demo"),
        }
    }

    pub fn samples_credentials(&self) -> Option<Credentials> {
        credentials(&self.samples.username, &self.samples.password)
    }

    pub fn samples_timeout(&self) -> Result<Duration> {
        parse_duration(self.samples.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn crm_base_url(&self) -> Result<&str> {
        match self.crm.base_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!("crm.base_url is not set -- set [crm].base_url or run with --demo"),
        }
    }

    /// Base for deep links into the CRM shell; the API base doubles as
    /// the link base unless overridden.
    pub fn crm_ui_base_url(&self) -> Result<&str> {
        match self.crm.ui_base_url.as_deref() {
            Some(url) => Ok(url),
            None => self.crm_base_url(),
        }
    }

    pub fn crm_credentials(&self) -> Option<Credentials> {
        credentials(&self.crm.username, &self.crm.password)
    }

    pub fn crm_page_size(&self) -> usize {
        self.crm
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .max(1) as usize
    }

    pub fn crm_timeout(&self) -> Result<Duration> {
        parse_duration(self.crm.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn show_dashboard(&self) -> bool {
        self.ui.show_dashboard.unwrap_or(false)
    }

    pub fn demo_seed(&self) -> u64 {
        self.ui.demo_seed.unwrap_or(DEFAULT_DEMO_SEED).max(0) as u64
    }

    pub fn demo_sample_count(&self) -> usize {
        self.ui
            .demo_sample_count
            .unwrap_or(DEFAULT_DEMO_SAMPLE_COUNT)
            .max(1) as usize
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sampledesk config\n# Place this file at: {}\n\nversion = 1\n\n[samples]\n# base_url = \"https://tenant.example.com\"\n# username = \"user\"\n# password = \"secret\"\ntimeout = \"{}\"\n\n[crm]\n# base_url = \"https://tenant.example.com\"\n# ui_base_url = \"https://tenant.example.com/shell\"\n# username = \"user\"\n# password = \"secret\"\npage_size = {}\ntimeout = \"{}\"\n\n[ui]\nshow_dashboard = false\ndemo_seed = {}\ndemo_sample_count = {}\n",
            path.display(),
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_TIMEOUT,
            DEFAULT_DEMO_SEED,
            DEFAULT_DEMO_SAMPLE_COUNT,
        )
    }
}

fn credentials(username: &Option<String>, password: &Option<String>) -> Option<Credentials> {
    username.as_ref().map(|username| Credentials {
        username: username.clone(),
        password: password.clone().unwrap_or_default(),
    })
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
