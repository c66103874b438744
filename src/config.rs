use anyhow::{Context, Result};
use std::{net::SocketAddr, path::PathBuf};

use crate::predictor::ScoreConvention;

pub const DEFAULT_MODEL_PATH: &str = "random_forest_model.json";
pub const DEFAULT_PORT: u16 = 8501;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub convention: ScoreConvention,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            convention: ScoreConvention::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by `MODEL_PATH`, `BIND_ADDR` and
    /// `SCORE_CONVENTION` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(p) = get("MODEL_PATH").filter(|s| !s.is_empty()) {
            cfg.model_path = PathBuf::from(p);
        }
        if let Some(a) = get("BIND_ADDR").filter(|s| !s.is_empty()) {
            cfg.bind_addr = a
                .parse()
                .with_context(|| format!("invalid BIND_ADDR '{}'", a))?;
        }
        if let Some(c) = get("SCORE_CONVENTION").filter(|s| !s.is_empty()) {
            cfg.convention = c.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_use_fixed_artifact_name() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.model_path, PathBuf::from("random_forest_model.json"));
        assert_eq!(cfg.convention, ScoreConvention::NonNegative);
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "models/rf.json"),
            ("BIND_ADDR", "0.0.0.0:9000"),
            ("SCORE_CONVENTION", "signed"),
        ]))
        .unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("models/rf.json"));
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.convention, ScoreConvention::Signed);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(AppConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("SCORE_CONVENTION", "maybe")])).is_err());
    }
}
