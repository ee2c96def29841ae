use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base hubrun config directory (~/.config/hubrun/, %APPDATA%\hubrun on Windows)
pub fn hubrun() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("hubrun"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("hubrun"))
    }
}

/// Run configuration file path
pub fn hubrun_json() -> Result<PathBuf> {
    Ok(hubrun()?.join("hubrun.json"))
}
