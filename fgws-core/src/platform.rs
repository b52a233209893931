//! Where the CLI keeps its config file and logs.
//!
//! Both live under the OS per-user directories in a `ForegroundWebSocket`
//! folder. Setting `FGWS_HOME` puts everything under one directory instead,
//! which is handy for scripts and throwaway runs.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::constants::APP_NAME;
use crate::error::{FwsError, FwsResult};

/// Environment variable that overrides both directories.
pub const HOME_ENV: &str = "FGWS_HOME";

/// Directory holding `config.toml`.
pub fn config_dir() -> FwsResult<PathBuf> {
    resolve(std::env::var_os(HOME_ENV), dirs::config_dir(), "config")
}

/// Directory holding runtime data such as logs.
pub fn data_dir() -> FwsResult<PathBuf> {
    resolve(std::env::var_os(HOME_ENV), dirs::data_dir(), "data")
}

fn resolve(home: Option<OsString>, base: Option<PathBuf>, what: &str) -> FwsResult<PathBuf> {
    if let Some(home) = home.filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    base.map(|b| b.join(APP_NAME))
        .ok_or_else(|| FwsError::Config(format!("could not determine {what} directory")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_override_wins() {
        let dir = resolve(
            Some(OsString::from("/tmp/fgws")),
            Some(PathBuf::from("/home/u/.config")),
            "config",
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/fgws"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let dir = resolve(Some(OsString::new()), Some(PathBuf::from("/base")), "data").unwrap();
        assert_eq!(dir, PathBuf::from("/base").join("ForegroundWebSocket"));
    }

    #[test]
    fn test_missing_base_is_config_error() {
        let err = resolve(None, None, "config").unwrap_err();
        assert!(matches!(err, FwsError::Config(_)));
    }
}
