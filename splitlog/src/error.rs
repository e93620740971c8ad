//! Ошибки splitlog

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Не удалось создать каталог под лог-файл
    #[error("failed to create log directory at {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// Не удалось открыть (создать) лог-файл
    #[error("failed to open log file at {path}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },

    /// Поток закрыт, не смог открыться или слот уровня пуст
    #[error("no log available")]
    Unavailable,

    #[error("failed to rotate log: {0}")]
    Rotation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),

    #[error("failed to serialize log record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
