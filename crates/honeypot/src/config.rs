use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::tui::draw::ThemeKind;

/// Resolve the default config file location in a platform-appropriate place.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ssh-honeypot").join("config.toml"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub port: u16,
    pub bind: IpAddr,
    pub geoip_db: PathBuf,
    pub host_key: PathBuf,
    pub log_dir: PathBuf,
    pub delay_secs: u64,
    /// SSH identification string sent before key exchange.
    pub banner: String,
    /// Public address looked up in place of loopback peers.
    pub loopback_substitute: IpAddr,
    pub inactivity_timeout_secs: u64,
    pub headless: bool,
    pub theme: ThemeKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 2222,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            geoip_db: PathBuf::from("GeoLite2-City.mmdb"),
            host_key: PathBuf::from("id_rsa"),
            log_dir: PathBuf::from("."),
            delay_secs: 2,
            banner: "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.6".to_string(),
            loopback_substitute: IpAddr::V4(Ipv4Addr::new(85, 209, 0, 100)),
            inactivity_timeout_secs: 30,
            headless: false,
            theme: ThemeKind::Dark,
        }
    }
}

/// Values given on the command line; these win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub geoip_db: Option<PathBuf>,
    pub host_key: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub delay_secs: Option<u64>,
    pub headless: bool,
}

impl Config {
    /// Load `path` if given, otherwise the default location when it exists,
    /// then apply command-line overrides.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        cfg.apply(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply(&mut self, o: &Overrides) {
        if let Some(port) = o.port {
            self.port = port;
        }
        if let Some(bind) = o.bind {
            self.bind = bind;
        }
        if let Some(p) = &o.geoip_db {
            self.geoip_db = p.clone();
        }
        if let Some(p) = &o.host_key {
            self.host_key = p.clone();
        }
        if let Some(p) = &o.log_dir {
            self.log_dir = p.clone();
        }
        if let Some(d) = o.delay_secs {
            self.delay_secs = d;
        }
        self.headless |= o.headless;
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.banner.starts_with("SSH-2.0-") {
            return Err(ConfigError::Invalid(format!(
                "banner must start with SSH-2.0-, got {:?}",
                self.banner
            )));
        }
        if self.banner.contains(['\r', '\n']) {
            return Err(ConfigError::Invalid("banner must be a single line".into()));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.port, 2222);
        assert_eq!(cfg.delay(), Duration::from_secs(2));
    }

    #[test]
    fn file_values_are_read() {
        let cfg = Config::from_toml(
            r#"
            port = 22
            bind = "::"
            geoip_db = "/var/lib/geoip/city.mmdb"
            log_dir = "/var/log/honeypot"
            theme = "light"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.bind, "::".parse::<IpAddr>().unwrap());
        assert_eq!(cfg.geoip_db, PathBuf::from("/var/lib/geoip/city.mmdb"));
        assert_eq!(cfg.theme, ThemeKind::Light);
        assert_eq!(cfg.host_key, PathBuf::from("id_rsa"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("prot = 22").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 22\ndelay_secs = 5\n").unwrap();
        let overrides = Overrides {
            port: Some(2200),
            headless: true,
            ..Default::default()
        };
        let cfg = Config::load(Some(&path), &overrides).unwrap();
        assert_eq!(cfg.port, 2200);
        assert_eq!(cfg.delay_secs, 5);
        assert!(cfg.headless);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")), &Overrides::default());
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn banner_must_be_ssh2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "banner = \"HTTP/1.1 200 OK\"\n").unwrap();
        let err = Config::load(Some(&path), &Overrides::default());
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }
}
