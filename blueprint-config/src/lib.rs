use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "BLUEPRINT_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.editor.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `BLUEPRINT_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 编辑器参数。长度单位为世界坐标，`text_box_handle_px` 为屏幕像素。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 网格步长，0 表示关闭吸附。
    pub grid_step: f64,
    pub text_box_min_size: f64,
    pub text_box_handle_px: f64,
    pub text_box_default_text: String,
    pub max_action_chain: usize,
}

impl EditorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));
        if !(self.grid_step >= 0.0) {
            return invalid("editor.grid_step 不能为负数");
        }
        if !(self.text_box_min_size > 0.0) {
            return invalid("editor.text_box_min_size 必须大于 0");
        }
        if !(self.text_box_handle_px > 0.0) {
            return invalid("editor.text_box_handle_px 必须大于 0");
        }
        if self.max_action_chain == 0 {
            return invalid("editor.max_action_chain 必须大于 0");
        }
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_step: 1.0,
            text_box_min_size: 1.0,
            text_box_handle_px: 20.0,
            text_box_default_text: "Text".to_string(),
            max_action_chain: 64,
        }
    }
}

/// 定义表文件的位置。相对文件名会在各个根目录下依次查找。
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub catalog_roots: Vec<PathBuf>,
    #[serde(default = "ResourceConfig::default_building_defs")]
    pub building_defs: PathBuf,
    #[serde(default = "ResourceConfig::default_path_defs")]
    pub path_defs: PathBuf,
}

impl ResourceConfig {
    fn default_building_defs() -> PathBuf {
        PathBuf::from("building_defs.json")
    }

    fn default_path_defs() -> PathBuf {
        PathBuf::from("path_defs.json")
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            catalog_roots: Vec::new(),
            building_defs: Self::default_building_defs(),
            path_defs: Self::default_path_defs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项无效: {0}")]
    Invalid(String),
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
