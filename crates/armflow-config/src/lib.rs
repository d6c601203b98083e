pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_PATH_VAR: &str = "ARMFLOW_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["armflow.local.yaml", "armflow.yaml"];

/// グローバル設定ファイルのパス (~/.config/armflow/config.yaml)
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("armflow").join("config.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ARMFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: armflow.local.yaml, armflow.yaml
/// 3. ~/.config/armflow/config.yaml (グローバル設定)
pub fn find_settings_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_VAR) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. グローバル設定
    if let Some(global_config) = global_settings_path()
        && global_config.exists()
    {
        return Ok(global_config);
    }

    Err(ConfigError::SettingsFileNotFound)
}

/// 設定を読み込む。ファイルが無ければデフォルト値
pub fn load_settings() -> Result<Settings> {
    match find_settings_file() {
        Ok(path) => load_settings_from(&path),
        Err(ConfigError::SettingsFileNotFound) => Ok(Settings::default()),
        Err(e) => Err(e),
    }
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// armflow.yaml の内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 環境変数 AZURE_SUBSCRIPTION_ID が優先される
    pub subscription_id: Option<String>,
    pub resource_group: String,
    /// 未指定ならリソースグループのロケーション
    pub location: Option<String>,
    pub api_version: String,
    pub polling: PollingSettings,
    pub default_login: LoginSettings,
    pub node: NodeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subscription_id: None,
            resource_group: "armflow-rg".to_string(),
            location: None,
            api_version: "2016-02-01".to_string(),
            polling: PollingSettings::default(),
            default_login: LoginSettings::default(),
            node: NodeSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub deadline_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            deadline_secs: 800,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// 資格情報ストアに無いノードで使うログイン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub user: String,
    pub password: Option<String>,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            user: "azureuser".to_string(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub vm_size: String,
    pub image_publisher: String,
    pub image_offer: String,
    pub image_sku: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            vm_size: "Standard_A0".to_string(),
            image_publisher: "Canonical".to_string(),
            image_offer: "UbuntuServer".to_string(),
            image_sku: "12.04.5-LTS".to_string(),
        }
    }
}
