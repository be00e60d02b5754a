//! Process-level configuration: listen address and data directory, read
//! from the environment the way `moire-web` reads `MOIRE_LISTEN`/`MOIRE_DB`.

use std::path::PathBuf;

const LISTEN_ENV: &str = "DRIFTBOARD_LISTEN";
const DATA_DIR_ENV: &str = "DRIFTBOARD_DATA_DIR";

const DEFAULT_LISTEN: &str = "127.0.0.1:9420";
const DEFAULT_DATA_DIR: &str = "driftboard-data";

pub struct ServerConfig {
    pub listen_addr: String,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var(LISTEN_ENV).unwrap_or_else(|_| DEFAULT_LISTEN.into()),
            data_dir: PathBuf::from(std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.into())),
        }
    }
}
