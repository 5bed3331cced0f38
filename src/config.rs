//! Configuration is read once at startup. A TOML file supplies the base values and
//! environment variables (optionally from a `.env` file) override them.
//!
//! ```toml
//! [server]
//! port = 8000
//!
//! [providers.ollama]
//! host = "http://localhost:11434"
//! cache_ttl_secs = 30
//!
//! [providers.hosted]
//! endpoint = "https://example.openai.azure.com/openai/v1"
//! model = "gpt-4o"
//! ```

use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to read config \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: \"{value}\"")]
    InvalidVar { var: &'static str, value: String },
    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Server {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin, otherwise a comma-separated list of origins.
    pub cors_origin: String,
    /// The built frontend. Nothing is served when the directory does not exist.
    pub static_dir: PathBuf,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: "*".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Ollama {
    /// The daemon root. Models are listed from `{host}/api/tags` and chat requests
    /// go to `{host}/v1`.
    pub host: String,
    pub cache_ttl_secs: u64,
}

impl Default for Ollama {
    fn default() -> Self {
        Ollama {
            host: "http://localhost:11434".to_string(),
            cache_ttl_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct LmStudio {
    pub base_url: String,
    pub cache_ttl_secs: u64,
}

impl Default for LmStudio {
    fn default() -> Self {
        LmStudio {
            base_url: "http://localhost:1234/v1".to_string(),
            cache_ttl_secs: 30,
        }
    }
}

/// The hosted API. These are also the defaults for requests which do not carry
/// their own connection parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Hosted {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub cache_ttl_secs: u64,
}

impl Default for Hosted {
    fn default() -> Self {
        Hosted {
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            cache_ttl_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Providers {
    /// Applies to model listing only.
    pub probe_timeout_secs: u64,
    pub inference_timeout_secs: u64,
    pub ollama: Ollama,
    pub lmstudio: LmStudio,
    pub hosted: Hosted,
}

impl Default for Providers {
    fn default() -> Self {
        Providers {
            probe_timeout_secs: 2,
            inference_timeout_secs: 600,
            ollama: Ollama::default(),
            lmstudio: LmStudio::default(),
            hosted: Hosted::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Csv {
    /// Sent as `X-App-Token` when fetching remote CSV files.
    pub app_token: String,
    pub timeout_secs: u64,
}

impl Default for Csv {
    fn default() -> Self {
        Csv {
            app_token: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
#[serde(default)]
pub(crate) struct Config {
    pub server: Server,
    pub providers: Providers,
    pub csv: Csv,
}

impl Config {
    pub(crate) fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.probe_timeout_secs)
    }

    pub(crate) fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.inference_timeout_secs)
    }

    /// Overrides file values with environment variables. `lookup` has the
    /// signature of [`std::env::var`].
    pub(crate) fn apply_env<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let var = |name: &'static str| -> Result<Option<String>, Error> {
            match lookup(name) {
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(VarError::NotUnicode(_)) => Err(Error::NotUnicode(name)),
            }
        };

        let number = |name: &'static str| -> Result<Option<u64>, Error> {
            match var(name)? {
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| Error::InvalidVar { var: name, value }),
                None => Ok(None),
            }
        };

        let providers = &mut self.providers;

        if let Some(host) = var("OLLAMA_HOST")? {
            providers.ollama.host = host;
        }
        if let Some(ttl) = number("OLLAMA_CACHE_TTL")? {
            providers.ollama.cache_ttl_secs = ttl;
        }
        if let Some(url) = var("LM_STUDIO_URL")? {
            providers.lmstudio.base_url = url;
        }
        if let Some(ttl) = number("LM_STUDIO_CACHE_TTL")? {
            providers.lmstudio.cache_ttl_secs = ttl;
        }
        if let Some(endpoint) = var("AZURE_ENDPOINT")? {
            providers.hosted.endpoint = endpoint;
        }
        if let Some(key) = var("AZURE_KEY")? {
            providers.hosted.api_key = key;
        }
        if let Some(model) = var("AZURE_MODEL")? {
            providers.hosted.model = model;
        }
        if let Some(ttl) = number("HOSTED_CACHE_TTL")? {
            providers.hosted.cache_ttl_secs = ttl;
        }
        if let Some(token) = var("SOCRATA_APP_TOKEN")? {
            self.csv.app_token = token;
        }
        if let Some(port) = var("PORT")? {
            self.server.port = port.trim().parse().map_err(|_| Error::InvalidVar {
                var: "PORT",
                value: port,
            })?;
        }
        if let Some(origin) = var("CORS_ORIGIN")? {
            self.server.cors_origin = origin;
        }

        Ok(())
    }
}

fn get_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/modelrelay/config.toml", ".modelrelay.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/modelrelay.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a str>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        match config.get(user_key) {
            Some(config_value) => {
                if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                    (user_value, config_value)
                {
                    extra_fields_helper(path, user_value, config_value, extra)
                }
            }
            None => extra.push(path.join(".")),
        }

        path.pop();
    }
}

/// Returns the dotted paths of keys in `raw_config` which `Config` does not know.
fn extra_fields(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = match toml::from_str(raw_config) {
        Ok(table) => table,
        Err(_) => return Vec::new(),
    };

    let config: toml::Table = match toml::to_string(config).map(|s| toml::from_str(&s)) {
        Ok(Ok(table)) => table,
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    extra
}

pub(crate) fn parse_config(raw_config: &str) -> Result<Config, Error> {
    let config: Config = toml::from_str(raw_config)?;

    for key in extra_fields(&config, raw_config) {
        tracing::warn!("config contains extraneous key \"{}\", ignoring", key);
    }

    Ok(config)
}

/// Reads the config file, either the one given or the first one found in the
/// default locations, then applies the process environment on top.
pub(crate) fn read_config(config: Option<PathBuf>) -> Result<Config, Error> {
    let config_path = config.or_else(get_config_path);

    let mut config = match config_path {
        Some(path) => {
            let raw_config = std::fs::read_to_string(&path)
                .map_err(|source| Error::Read { path, source })?;

            parse_config(&raw_config)?
        }
        None => Config::default(),
    };

    config.apply_env(|name| std::env::var(name))?;

    Ok(config)
}
