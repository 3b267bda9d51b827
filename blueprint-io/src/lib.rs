use std::fs;
use std::path::{Path, PathBuf};

use blueprint_core::catalog::Catalog;
use blueprint_core::objects::ObjectCollection;
use thiserror::Error;
use tracing::info;

pub mod catalog;
pub mod format;

pub use catalog::CatalogLoader;
pub use format::{DecodeError, DecodeErrorKind, NumberError, SUPPORTED_VERSION};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to parse catalog {path:?}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

pub trait ProjectLoader {
    fn load(&self, path: &Path) -> Result<ObjectCollection, IoError>;
}

pub trait ProjectSaver {
    fn save(&self, objects: &ObjectCollection, path: &Path) -> Result<(), IoError>;
}

/// 行式文本项目格式的读写入口。类名依赖定义表解析，因此持有一份定义表引用。
pub struct TextFormat<'a> {
    catalog: &'a Catalog,
}

impl<'a> TextFormat<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// 解析内存中的文本。
    pub fn decode(&self, text: &str) -> Result<ObjectCollection, DecodeError> {
        format::decode(text, self.catalog)
    }

    pub fn encode(&self, objects: &ObjectCollection) -> String {
        format::encode(objects, self.catalog)
    }
}

impl ProjectLoader for TextFormat<'_> {
    fn load(&self, path: &Path) -> Result<ObjectCollection, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let objects = self.decode(&data)?;
        info!(
            path = %path.display(),
            buildings = objects.buildings.len(),
            paths = objects.paths.len(),
            text_boxes = objects.text_boxes.len(),
            "项目已加载"
        );
        Ok(objects)
    }
}

impl ProjectSaver for TextFormat<'_> {
    fn save(&self, objects: &ObjectCollection, path: &Path) -> Result<(), IoError> {
        fs::write(path, self.encode(objects)).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), objects = objects.len(), "项目已保存");
        Ok(())
    }
}
