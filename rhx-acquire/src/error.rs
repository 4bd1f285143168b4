use rhx_types::{RhxError, StreamKind};
use thiserror::Error;

pub type AcquireResult<T> = std::result::Result<T, AcquireError>;

#[derive(Debug, Error)]
pub enum AcquireError {
    /// Ошибка сокета или файла
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка декодера вне конкретного потока (конфигурация сессии)
    #[error("RHX error: {0}")]
    Rhx(#[from] RhxError),

    /// Ошибка сериализации записи
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Контроллер ответил `Error: ...`
    #[error("Controller rejected '{command}': {message}")]
    Command { command: String, message: String },

    /// Ответ не соответствует запросу
    #[error("Unexpected response to '{command}': '{response}'")]
    UnexpectedResponse { command: String, response: String },

    /// Контроллер занят и не примет настройку (например, идёт загрузка)
    #[error("Controller busy: {0}")]
    ControllerBusy(String),

    /// Ошибка пайплайна (inter-thread)
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Ошибка кадрирования в бинарном потоке
    #[error("Decode error on {stream} stream: {source}")]
    Decode { stream: StreamKind, source: RhxError },
}

impl AcquireError {
    /// Оборачивает ошибку декодера с указанием потока.
    pub fn decode(
        stream: StreamKind,
        source: RhxError,
    ) -> Self {
        AcquireError::Decode { stream, source }
    }
}
