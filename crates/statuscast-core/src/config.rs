use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::StatuscastError;
use crate::wire::WireFormat;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub broadcast: BroadcastConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// IPv4 multicast group the status is sent to.
    pub group: Ipv4Addr,
    pub port: u16,
    pub ttl: u32,
    /// Deliver our own datagrams to local listeners.
    pub loopback: bool,
    /// Outgoing interface address; `0.0.0.0` lets the OS choose.
    pub interface: Ipv4Addr,
    pub interval_ms: u64,
    pub server_id: String,
    pub format: WireFormat,
}

/// Which media engine to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// VLC web interface (`--extraintf http`).
    VlcHttp,
    /// VLC remote-control text interface over TCP (`--extraintf rc`).
    VlcRc,
    /// Any MPRIS player on the D-Bus session bus (Linux).
    Mpris,
    /// Windows System Media Transport Controls.
    Smtc,
    /// In-process player model, no external dependency.
    Simulated,
}

impl EngineKind {
    pub const ALL: &[EngineKind] = &[
        Self::VlcHttp,
        Self::VlcRc,
        Self::Mpris,
        Self::Smtc,
        Self::Simulated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VlcHttp => "vlc-http",
            Self::VlcRc => "vlc-rc",
            Self::Mpris => "mpris",
            Self::Smtc => "smtc",
            Self::Simulated => "simulated",
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown engine: {s} (expected one of {})", names.join(", "))
            })
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Upper bound on one query or command round-trip.
    pub timeout_ms: u64,
    /// How long a file-open may stay "loading" without progress.
    pub loading_timeout_ms: u64,
    pub http: HttpEngineConfig,
    pub rc: RcEngineConfig,
    pub mpris: MprisEngineConfig,
    pub simulated: SimulatedEngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEngineConfig {
    pub url: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcEngineConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MprisEngineConfig {
    /// Only follow players whose identity contains this; empty follows the active one.
    pub identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedEngineConfig {
    /// Time from open to first progress.
    pub load_delay_ms: u64,
    /// Length reported for any opened file.
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Suppress the per-broadcast status line; changes are still logged.
    pub quiet_status: bool,
    /// Also write a daily rolling log file under the data directory.
    pub file: bool,
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    ///
    /// `explicit` replaces the platform config path and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, StatuscastError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)
            .map_err(|e| StatuscastError::Config(e.to_string()))?;

        let user_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(Self::config_path()).filter(|p| p.exists()),
        };

        if let Some(path) = user_path {
            let user_str = std::fs::read_to_string(&path).map_err(|e| {
                StatuscastError::Config(format!("failed to read {}: {e}", path.display()))
            })?;
            let user: toml::Table = toml::from_str(&user_str).map_err(|e| {
                StatuscastError::Config(format!("failed to parse {}: {e}", path.display()))
            })?;
            merge_tables(&mut merged, user);
        }

        let config: AppConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| StatuscastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the broadcast loop cannot run with.
    pub fn validate(&self) -> Result<(), StatuscastError> {
        let b = &self.broadcast;
        if b.interval_ms == 0 {
            return Err(StatuscastError::Config(
                "broadcast.interval_ms must be greater than zero".into(),
            ));
        }
        if b.port == 0 {
            return Err(StatuscastError::Config("broadcast.port must not be zero".into()));
        }
        if !b.group.is_multicast() {
            return Err(StatuscastError::Config(format!(
                "broadcast.group {} is not an IPv4 multicast address",
                b.group
            )));
        }
        if self.engine.timeout_ms == 0 {
            return Err(StatuscastError::Config(
                "engine.timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Save current config to `path`, or the user config file.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, StatuscastError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| StatuscastError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "statuscast")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `overlay` onto `base`; tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.broadcast.group, Ipv4Addr::new(239, 255, 0, 100));
        assert_eq!(config.broadcast.port, 8888);
        assert_eq!(config.broadcast.interval_ms, 200);
        assert_eq!(config.broadcast.server_id, "vlc-status-server");
        assert_eq!(config.broadcast.format, WireFormat::Rich);
        assert_eq!(config.engine.kind, EngineKind::VlcHttp);
        assert_eq!(config.engine.loading_timeout_ms, 45_000);
        assert_eq!(config.engine.timeout_ms, 1000);
        assert!(config.engine.mpris.identity.is_empty());
        assert!(!config.logging.quiet_status);
        config.validate().unwrap();
    }

    #[test]
    fn test_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.broadcast.port, config.broadcast.port);
        assert_eq!(deserialized.engine.kind, config.engine.kind);
    }

    #[test]
    fn test_partial_user_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [broadcast]
                port = 12345
                group = "239.255.255.250"

                [engine]
                kind = "vlc-rc"

                [engine.rc]
                port = 9999
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.broadcast.port, 12345);
        assert_eq!(config.broadcast.group, Ipv4Addr::new(239, 255, 255, 250));
        assert_eq!(config.broadcast.interval_ms, 200);
        assert_eq!(config.engine.kind, EngineKind::VlcRc);
        assert_eq!(config.engine.rc.port, 9999);
        assert_eq!(config.engine.rc.host, "127.0.0.1");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, StatuscastError::Config(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AppConfig::default();
        config.broadcast.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unicast_group_rejected() {
        let mut config = AppConfig::default();
        config.broadcast.group = Ipv4Addr::new(192, 168, 1, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.engine.kind = EngineKind::Simulated;
        config.engine.simulated.load_delay_ms = 2_000;
        config.save(Some(&path)).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.engine.kind, EngineKind::Simulated);
        assert_eq!(loaded.engine.simulated.load_delay_ms, 2_000);
        assert_eq!(loaded.broadcast.port, 8888);
    }

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("VLC-HTTP".parse::<EngineKind>().unwrap(), EngineKind::VlcHttp);
        assert_eq!("simulated".parse::<EngineKind>().unwrap(), EngineKind::Simulated);
        assert!("winamp".parse::<EngineKind>().is_err());
    }
}
