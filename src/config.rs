use std::{env, net::SocketAddr, path::PathBuf};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub prefs_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
                warn!(value = %value, default = DEFAULT_PORT, "invalid PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            port,
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/attendance.json")),
            prefs_path: lookup("APP_PREFS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/preferences.json")),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_path, PathBuf::from("data/attendance.json"));
        assert_eq!(cfg.prefs_path, PathBuf::from("data/preferences.json"));
    }

    #[test]
    fn reads_overrides_and_ignores_bad_port() {
        let cfg = config(&[("PORT", "9000"), ("APP_DATA_PATH", "/tmp/db.json")]);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.data_path, PathBuf::from("/tmp/db.json"));

        assert_eq!(config(&[("PORT", "nope")]).port, 8080);
    }
}
