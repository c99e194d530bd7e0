use std::{
    fs::read_to_string,
    io::ErrorKind,
    net::IpAddr,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_FILE: &str = "judging.db";
const DEFAULT_WEB_PORT: u16 = 28020;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Json struct for deployment settings.
/// Every field is optional, missing values fall back to the defaults above.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    pub database_file: Option<PathBuf>,
    pub bind_address: Option<IpAddr>,
    pub web_port: Option<u16>,
    pub max_upload_bytes: Option<u64>,
}

impl Settings {
    /// Load settings from a json file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match read_to_string(path) {
            Ok(file) => serde_json::from_str::<Settings>(&file)
                .with_context(|| format!("Failed to parse settings file {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "Settings file {} does not exist, using defaults",
                    path.display()
                );
                Ok(Settings::default())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read settings file {}", path.display())),
        }
    }

    pub fn database_file(&self) -> PathBuf {
        self.database_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
    }

    pub fn bind_address(&self) -> IpAddr {
        self.bind_address.unwrap_or(IpAddr::from([0, 0, 0, 0]))
    }

    pub fn web_port(&self) -> u16 {
        self.web_port.unwrap_or(DEFAULT_WEB_PORT)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }
}
