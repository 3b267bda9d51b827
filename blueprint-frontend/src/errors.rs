use std::path::PathBuf;

use blueprint_engine::EngineError;
use blueprint_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("读取脚本 {path:?} 失败: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("脚本第 {line} 行无效: {message}")]
    Script { line: usize, message: String },
}

impl FrontendError {
    pub(crate) fn script(line: usize, message: impl Into<String>) -> Self {
        Self::Script {
            line,
            message: message.into(),
        }
    }
}
