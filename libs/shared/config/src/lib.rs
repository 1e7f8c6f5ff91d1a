// [libs/shared/config/src/lib.rs]
//! A single immutable configuration value loaded once and handed
//! explicitly to the scheduler, worker, api and fetch binaries — no
//! process-global mutable config (spec.md §9 design note).
//!
//! Fields are grouped exactly as spec.md §6 groups them
//! (`mtracker.*`, `log.*`, `mwdb.*`, `database.*`, `proxy.*`,
//! `redis.*`). Resolution order per field, grounded in the teacher
//! source's `typedconfig` source chain: environment variable first
//! (`SECTION_KEY`, upper-cased), then an INI file (`mtracker.ini` by
//! default, overridable via `MTRACKER_INI`) as fallback, then the
//! built-in default. Environment always wins over the INI file.

pub mod errors;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

pub use errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMethod {
    Url,
    File,
}

#[derive(Debug, Clone)]
pub struct MtrackerSection {
    pub max_failing_spree: i32,
    pub task_timeout_secs: u64,
    pub task_period_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LogSection {
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MwdbSection {
    pub url: String,
    pub api_url_override: Option<String>,
    pub token: String,
}

impl MwdbSection {
    /// The effective REST API base: `api_url_override` when set,
    /// otherwise `url` + `/api` (teacher source's `api_url` property).
    pub fn api_url(&self) -> String {
        self.api_url_override
            .clone()
            .unwrap_or_else(|| format!("{}/api", self.url.trim_end_matches('/')))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ProxySection {
    pub default_country: String,
    pub method: ProxyMethod,
    pub url: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedisSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub mtracker: MtrackerSection,
    pub log: LogSection,
    pub mwdb: MwdbSection,
    pub database: DatabaseSection,
    pub proxy: ProxySection,
    pub redis: RedisSection,
}

/// Resolves a single field: environment variable first, INI fallback,
/// then `None` if neither source has it.
struct Sources {
    env: HashMap<String, String>,
    ini: Option<ini::Ini>,
}

impl Sources {
    fn load(ini_path: &Path) -> Self {
        let env = env::vars().collect();
        let ini = ini::Ini::load_from_file(ini_path).ok();
        Sources { env, ini }
    }

    fn get(&self, section: &str, key: &str) -> Option<String> {
        let env_key = format!("{}_{}", section.to_uppercase(), key.to_uppercase());
        if let Some(value) = self.env.get(&env_key) {
            return Some(value.clone());
        }
        self.ini.as_ref().and_then(|ini| ini.get_from(Some(section), key)).map(str::to_string)
    }

    fn require(&self, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
        self.get(section, key).ok_or(ConfigError::MissingRequired(key))
    }

    fn parse<T: std::str::FromStr>(&self, section: &str, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(section, key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                field: key,
                value: raw,
                reason: e.to_string(),
            }),
        }
    }
}

impl TrackerConfig {
    /// Loads configuration from the environment, falling back to the
    /// INI file named by `MTRACKER_INI` (default `./mtracker.ini`) for
    /// any field the environment doesn't set. `.env` hydration (via
    /// `dotenvy`) is the caller's responsibility, matching the
    /// teacher's binaries calling `dotenv().ok()` before this.
    pub fn load() -> Result<Self, ConfigError> {
        let ini_path = env::var("MTRACKER_INI").unwrap_or_else(|_| "mtracker.ini".to_string());
        Self::load_from(Path::new(&ini_path))
    }

    pub fn load_from(ini_path: &Path) -> Result<Self, ConfigError> {
        let sources = Sources::load(ini_path);

        let mtracker = MtrackerSection {
            max_failing_spree: sources.parse("mtracker", "max_failing_spree", 5)?,
            task_timeout_secs: sources.parse("mtracker", "task_timeout", 900)?,
            task_period_secs: sources.parse("mtracker", "task_period", 43_200)?,
        };

        let log = LogSection { dir: PathBuf::from(sources.parse("log", "dir", "/tmp/logs".to_string())?) };

        let mwdb = MwdbSection {
            url: sources.parse("mwdb", "url", "https://mwdb.cert.pl".to_string())?,
            api_url_override: sources.get("mwdb", "api_url_override"),
            token: sources.require("mwdb", "token")?,
        };

        let database = DatabaseSection { url: sources.require("database", "url")? };

        let method_raw = sources.require("proxy", "method")?;
        let method = match method_raw.as_str() {
            "url" => ProxyMethod::Url,
            "file" => ProxyMethod::File,
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "method",
                    value: other.to_string(),
                    reason: "expected 'url' or 'file'".to_string(),
                })
            }
        };
        let proxy = ProxySection {
            default_country: sources.require("proxy", "default")?,
            method,
            url: sources.get("proxy", "url"),
            path: sources.get("proxy", "path"),
        };

        let redis = RedisSection {
            host: sources.parse("redis", "host", "localhost".to_string())?,
            port: sources.parse("redis", "port", 6379)?,
        };

        Ok(TrackerConfig { mtracker, log, mwdb, database, proxy, redis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_ini(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn ini_values_fill_in_defaults_not_overridden_by_env() {
        let file = write_ini(
            "[mwdb]\ntoken = ini-token\n\n[database]\nurl = postgres://ini\n\n[proxy]\ndefault = us\nmethod = url\nurl = http://proxies.example\n",
        );
        let config = TrackerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.mwdb.token, "ini-token");
        assert_eq!(config.database.url, "postgres://ini");
        assert_eq!(config.proxy.default_country, "us");
        assert_eq!(config.proxy.method, ProxyMethod::Url);
        assert_eq!(config.mtracker.max_failing_spree, 5);
    }

    #[test]
    fn missing_required_field_errors() {
        let file = write_ini("[mwdb]\ntoken = t\n");
        let err = TrackerConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired("url")));
    }

    #[test]
    fn mwdb_api_url_falls_back_to_url_plus_api_suffix() {
        let section = MwdbSection {
            url: "https://mwdb.cert.pl".to_string(),
            api_url_override: None,
            token: "t".to_string(),
        };
        assert_eq!(section.api_url(), "https://mwdb.cert.pl/api");
    }

    #[test]
    fn mwdb_api_url_override_takes_precedence() {
        let section = MwdbSection {
            url: "https://mwdb.cert.pl".to_string(),
            api_url_override: Some("https://internal.mwdb/api/v2".to_string()),
            token: "t".to_string(),
        };
        assert_eq!(section.api_url(), "https://internal.mwdb/api/v2");
    }

    #[test]
    fn invalid_proxy_method_is_rejected() {
        let file = write_ini(
            "[mwdb]\ntoken = t\n\n[database]\nurl = u\n\n[proxy]\ndefault = us\nmethod = carrier-pigeon\n",
        );
        let err = TrackerConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "method", .. }));
    }
}
