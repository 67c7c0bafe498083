//! Application-level configuration loading: scoring rule, league table, fixtures provider
//! and snapshot location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    league::{LeagueInfo, LeagueTable},
    standings::ScoringPolicy,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "POLLAMANIA_BACK_CONFIG_PATH";
const DEFAULT_PROVIDER_URL: &str = "https://api.football-data.org/v4";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
const DEFAULT_SNAPSHOT_PATH: &str = "data/snapshot.json";

/// Fixtures provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturesSettings {
    pub base_url: String,
    pub timeout: Duration,
    /// Period of the background refresher. Zero disables it.
    pub refresh_interval: Duration,
}

impl Default for FixturesSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.into(),
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    scoring: ScoringPolicy,
    leagues: LeagueTable,
    fixtures: FixturesSettings,
    snapshot_path: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        leagues = app_config.leagues.iter().count(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Missing sections keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    pub fn scoring(&self) -> ScoringPolicy {
        self.scoring
    }

    pub fn leagues(&self) -> &LeagueTable {
        &self.leagues
    }

    pub fn fixtures(&self) -> &FixturesSettings {
        &self.fixtures
    }

    pub fn snapshot_path(&self) -> &PathBuf {
        &self.snapshot_path
    }

    /// Same configuration with another snapshot location.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringPolicy::default(),
            leagues: LeagueTable::default(),
            fixtures: FixturesSettings::default(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    scoring: Option<ScoringPolicy>,
    leagues: Option<Vec<LeagueInfo>>,
    fixtures: Option<RawFixtures>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFixtures {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    refresh_interval_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let fixtures = value.fixtures.unwrap_or_default();
        Self {
            scoring: value.scoring.unwrap_or(defaults.scoring),
            leagues: value
                .leagues
                .map(LeagueTable::new)
                .unwrap_or(defaults.leagues),
            fixtures: FixturesSettings {
                base_url: fixtures.base_url.unwrap_or(defaults.fixtures.base_url),
                timeout: fixtures
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.fixtures.timeout),
                refresh_interval: fixtures
                    .refresh_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.fixtures.refresh_interval),
            },
            snapshot_path: value.snapshot_path.unwrap_or(defaults.snapshot_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::league::League;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.scoring(), ScoringPolicy::default());
        assert_eq!(config.fixtures(), &FixturesSettings::default());
        assert!(config.leagues().contains(League::LaLiga));
    }

    #[test]
    fn sections_override_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "scoring": {"exact": 5, "outcome": 2, "miss": 0},
                "leagues": [{"league": "serie_a", "provider_id": 2019, "display_name": "Serie A"}],
                "fixtures": {"timeout_secs": 3},
                "snapshot_path": "/tmp/pollamania.json"
            }"#,
        )
        .unwrap();

        assert_eq!(config.scoring().exact, 5);
        assert!(config.leagues().contains(League::SerieA));
        assert!(!config.leagues().contains(League::PremierLeague));
        assert_eq!(config.fixtures().timeout, Duration::from_secs(3));
        assert_eq!(config.fixtures().base_url, DEFAULT_PROVIDER_URL);
        assert_eq!(config.snapshot_path(), &PathBuf::from("/tmp/pollamania.json"));
    }

    #[test]
    fn unknown_league_is_a_parse_error() {
        let err = AppConfig::from_json(
            r#"{"leagues": [{"league": "bundesliga", "provider_id": 2002, "display_name": "Bundesliga"}]}"#,
        );
        assert!(err.is_err());
    }
}
