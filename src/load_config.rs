use crate::config::{default_content_types, ContentTypeSpec, RemoteSite, SiteOptions};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const SITE_ENV: &str = "WORDPRESS_SITE";
pub const NAME_ENV: &str = "WORDPRESS_NAME";
pub const TOKEN_ENV: &str = "WORDPRESS_API_TOKEN";

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    site: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    json: Option<String>,
    #[serde(default)]
    project_root: Option<PathBuf>,
    #[serde(default = "default_content_types")]
    content_types: Vec<ContentTypeSpec>,
}

/// Site options plus the secrets that only ever come from the environment.
#[derive(Debug)]
pub struct LoadedConfig {
    pub options: SiteOptions,
    pub api_token: Option<String>,
}

/// Loads a static YAML config file (no secrets) and injects env vars for the
/// remote identity fallback and the API token.
///
/// `project_root` defaults to the directory containing the config file;
/// a relative value is resolved against that directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LoadedConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "[CONFIG] Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let static_conf: StaticConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    let site = resolve_site(static_conf.site, static_conf.name)?;
    info!(site = %site, "[CONFIG] Resolved remote site");

    let config_dir = path_ref
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let project_root = match static_conf.project_root {
        Some(root) if root.is_absolute() => root,
        Some(root) => config_dir.join(root),
        None => config_dir.to_path_buf(),
    };

    let mut options = SiteOptions::new(site)
        .with_content_types(static_conf.content_types)
        .with_project_root(project_root);
    options.json = static_conf.json;

    let api_token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
    if api_token.is_some() {
        info!("[CONFIG] {TOKEN_ENV} found in env");
    }

    options.trace_loaded();
    Ok(LoadedConfig { options, api_token })
}

/// File values win over the environment; `site` wins over `name`.
fn resolve_site(site: Option<String>, name: Option<String>) -> Result<RemoteSite> {
    let from_env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    let remote = match (site, name) {
        (Some(site), _) => RemoteSite::self_hosted(site),
        (None, Some(name)) => RemoteSite::hosted(name),
        (None, None) => match (from_env(SITE_ENV), from_env(NAME_ENV)) {
            (Some(site), _) => RemoteSite::self_hosted(site),
            (None, Some(name)) => RemoteSite::hosted(name),
            (None, None) => {
                error!("[CONFIG] No remote site in config file or environment");
                return Err(crate::error::ConfigurationError::MissingSite.into());
            }
        },
    };
    remote
        .base_url()
        .with_context(|| format!("Invalid remote site {remote}"))?;
    Ok(remote)
}
