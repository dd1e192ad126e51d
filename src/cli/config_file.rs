//! Optional TOML configuration file.
//!
//! File values override CLI arguments and defaults, mirroring the
//! precedence of the original tool suite. The path comes from `--config`
//! or from a per-tool environment variable.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    pub timeout: Option<f64>,
    pub portype: Option<String>,
    pub timemode: Option<u8>,
    pub acclimit: Option<f64>,
    pub duration: Option<u32>,
    pub postype: Option<u8>,
    pub fixedpos: Option<String>,
    pub waittime: Option<f64>,
}

impl FileConfig {
    /// Load the config file named on the CLI, falling back to the given
    /// environment variable. Returns an empty config when neither is set;
    /// a named-but-unreadable file is a fatal parameter error.
    pub fn load_for(cli_path: Option<&String>, env_var: &str) -> Result<Self> {
        let path = match cli_path.cloned().or_else(|| std::env::var(env_var).ok()) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(Self::default()),
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("configuration file not found: {path}"))?;
        toml::from_str(&content).with_context(|| format!("configuration file invalid: {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let cfg: FileConfig = toml::from_str(
            r#"
            port = "/dev/ttyACM0"
            baudrate = 115200
            timemode = 2
            fixedpos = "45.0,7.0,20000.0"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cfg.baudrate, Some(115200));
        assert_eq!(cfg.timemode, Some(2));
        assert!(cfg.acclimit.is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(toml::from_str::<FileConfig>("bogus = 1").is_err());
    }

    #[test]
    fn test_absent_file_sources_yield_default() {
        let cfg = FileConfig::load_for(None, "UBXBASE_TEST_UNSET_CONF").unwrap();
        assert!(cfg.port.is_none());
    }
}
