use std::path::PathBuf;
use std::time::Duration;

use crate::models::{DEFAULT_ENDPOINT_URL, DEFAULT_USER_ID};

pub const APP_DIR_NAME: &str = "quota-carousel";
pub const STORE_FILE_NAME: &str = "settings.json";
pub const DATA_DIR_ENV: &str = "QUOTA_CAROUSEL_DATA_DIR";

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub refresh_interval: Duration,
    pub rotation_interval: Duration,
    pub request_timeout: Duration,
    pub default_endpoint_url: String,
    pub default_user_id: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            refresh_interval: REFRESH_INTERVAL,
            rotation_interval: ROTATION_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
            default_endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            default_user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

impl DashboardConfig {
    /// `--data-dir`, then `$QUOTA_CAROUSEL_DATA_DIR`, then the platform data dir.
    pub fn resolve(data_dir_override: Option<PathBuf>) -> Self {
        let env_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let data_dir = data_dir_override
            .or(env_dir)
            .unwrap_or_else(default_data_dir);
        Self {
            data_dir,
            ..Self::default()
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    pub fn with_intervals(mut self, refresh: Option<Duration>, rotation: Option<Duration>) -> Self {
        if let Some(refresh) = refresh.filter(|value| !value.is_zero()) {
            self.refresh_interval = refresh;
        }
        if let Some(rotation) = rotation.filter(|value| !value.is_zero()) {
            self.rotation_interval = rotation;
        }
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        .join(APP_DIR_NAME)
}
