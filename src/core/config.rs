use crate::core::clock::{Clock, FixedClock, SystemClock};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid UTC offset: {0} hours")]
    InvalidOffset(i32),
    #[error("Invalid fixed_now timestamp: {0}")]
    InvalidFixedNow(String),
}

/// Returns the configured value or a [`ConfigError::Missing`] naming it.
pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TripConfig {
    /// Offset of the trip's local time from UTC, in hours.
    pub utc_offset_hours: i32,
    /// Pins "now" to a local wall time (`2026-01-29T14:30:00`) or an RFC 3339
    /// instant. Unset means the system clock.
    pub fixed_now: Option<String>,
}

impl Default for TripConfig {
    fn default() -> Self {
        TripConfig {
            utc_offset_hours: 8,
            fixed_now: None,
        }
    }
}

impl TripConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_hours))
    }

    pub fn clock(&self) -> Result<Arc<dyn Clock>, ConfigError> {
        let offset = self.offset()?;
        let Some(raw) = self.fixed_now.as_deref() else {
            return Ok(Arc::new(SystemClock::new(offset)));
        };
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Arc::new(FixedClock::new(instant.with_timezone(&offset))));
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .and_then(|local| FixedClock::at_local(local, offset))
            .map(|clock| Arc::new(clock) as Arc<dyn Clock>)
            .ok_or_else(|| ConfigError::InvalidFixedNow(raw.to_string()))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct NotionDatabases {
    pub itinerary: Option<String>,
    pub activities: Option<String>,
    pub flights: Option<String>,
    pub attractions: Option<String>,
    pub travel_info: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotionConfig {
    pub base_url: String,
    pub version: String,
    pub token: Option<String>,
    pub databases: NotionDatabases,
}

impl Default for NotionConfig {
    fn default() -> Self {
        NotionConfig {
            base_url: "https://api.notion.com".to_string(),
            version: "2022-06-28".to_string(),
            token: None,
            databases: NotionDatabases::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BankOfTaiwanConfig {
    pub base_url: String,
    pub cache_ttl_secs: u64,
}

impl Default for BankOfTaiwanConfig {
    fn default() -> Self {
        BankOfTaiwanConfig {
            base_url: "https://rate.bot.com.tw".to_string(),
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QWeatherConfig {
    pub base_url: String,
    pub key: Option<String>,
}

impl Default for QWeatherConfig {
    fn default() -> Self {
        QWeatherConfig {
            base_url: "https://devapi.qweather.com".to_string(),
            key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AmapConfig {
    pub base_url: String,
    pub key: Option<String>,
}

impl Default for AmapConfig {
    fn default() -> Self {
        AmapConfig {
            base_url: "https://restapi.amap.com".to_string(),
            key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub notion: NotionConfig,
    pub bank_of_taiwan: BankOfTaiwanConfig,
    pub qweather: QWeatherConfig,
    pub amap: AmapConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub trip: TripConfig,
    pub providers: ProvidersConfig,
    /// Upper bound for every outbound request.
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            trip: TripConfig::default(),
            providers: ProvidersConfig::default(),
            http_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Loads the default config file if it exists, then applies environment
    /// overrides (a `.env` file is honoured).
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };
        dotenvy::dotenv().ok();
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "tripboard", "tripboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Secrets and database ids may come from the environment instead of the
    /// file. Set variables win over file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let providers = &mut self.providers;
        let db = &mut providers.notion.databases;
        let overrides: [(&str, &mut Option<String>); 8] = [
            ("NOTION_TOKEN", &mut providers.notion.token),
            ("NOTION_ITINERARY_DB", &mut db.itinerary),
            ("NOTION_ACTIVITIES_DB", &mut db.activities),
            ("NOTION_FLIGHTS_DB", &mut db.flights),
            ("NOTION_ATTRACTIONS_DB", &mut db.attractions),
            ("NOTION_TRAVELINFO_DB", &mut db.travel_info),
            ("QWEATHER_KEY", &mut providers.qweather.key),
            ("AMAP_WEB_KEY", &mut providers.amap.key),
        ];
        for (name, slot) in overrides {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                debug!("Using {} from environment", name);
                *slot = Some(value);
            }
        }
        if let Some(host) = lookup("QWEATHER_HOST").filter(|v| !v.is_empty()) {
            providers.qweather.base_url = format!("https://{host}");
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
