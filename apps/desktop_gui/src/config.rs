use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use client_core::{services, SessionContext};
use serde::Deserialize;
use shared::domain::UserId;

pub const CONFIG_FILE_NAME: &str = "annotator.toml";
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/api";
const FALLBACK_DATABASE_URL: &str = "sqlite://./data/history.db";

#[derive(Parser, Debug, Default)]
#[command(name = "annotator", about = "Highlight, score and refine text")]
pub struct Args {
    /// Settings file; defaults to ./annotator.toml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub service_url: Option<String>,
    #[arg(long)]
    pub user_id: Option<String>,
    #[arg(long)]
    pub database_url: Option<String>,
    #[arg(long)]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_url: String,
    pub annotate_path: String,
    pub refine_path: String,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub database_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            annotate_path: services::DEFAULT_ANNOTATE_PATH.into(),
            refine_path: services::DEFAULT_REFINE_PATH.into(),
            user_id: None,
            access_token: None,
            database_url: default_database_url(),
            request_timeout_seconds: services::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn session(&self) -> SessionContext {
        SessionContext::new(
            self.user_id.as_deref().and_then(UserId::new),
            self.access_token.clone(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

/// Defaults, then the settings file, then environment, then flags.
pub fn load_settings(args: &Args) -> Settings {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut settings = match read_settings_file(&path) {
        Ok(Some(settings)) => settings,
        Ok(None) => Settings::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring settings file: {err:#}");
            Settings::default()
        }
    };

    apply_env(&mut settings, |name| std::env::var(name).ok());
    apply_args(&mut settings, args);
    settings
}

fn read_settings_file(path: &Path) -> anyhow::Result<Option<Settings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    let settings = toml::from_str::<Settings>(&raw)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    Ok(Some(settings))
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());

    if let Some(v) = var("ANNOTATOR_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = var("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = var("ANNOTATOR_USER_ID") {
        settings.user_id = Some(v);
    }
    if let Some(v) = var("APP__USER_ID") {
        settings.user_id = Some(v);
    }

    if let Some(v) = var("ANNOTATOR_ACCESS_TOKEN") {
        settings.access_token = Some(v);
    }

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECONDS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => settings.request_timeout_seconds = parsed,
            Err(err) => tracing::warn!(value = %v, "ignoring APP__REQUEST_TIMEOUT_SECONDS: {err}"),
        }
    }
}

fn apply_args(settings: &mut Settings, args: &Args) {
    if let Some(v) = &args.service_url {
        settings.service_url = v.clone();
    }
    if let Some(v) = &args.user_id {
        settings.user_id = Some(v.clone());
    }
    if let Some(v) = &args.database_url {
        settings.database_url = v.clone();
    }
    if let Some(v) = args.request_timeout_seconds {
        settings.request_timeout_seconds = v;
    }
}

fn default_database_url() -> String {
    match dirs::data_local_dir() {
        Some(base) => format!(
            "sqlite://{}",
            base.join("annotator")
                .join("history.db")
                .to_string_lossy()
                .replace('\\', "/")
        ),
        None => FALLBACK_DATABASE_URL.into(),
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = storage::sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}
