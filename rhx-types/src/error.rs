use thiserror::Error;

use crate::StreamKind;

/// Результат для операций разбора RHX потоков
pub type RhxResult<T> = std::result::Result<T, RhxError>;

/// Типы ошибок декодера RHX.
///
/// Нехватка данных в потоке ошибкой не является: реассемблер просто
/// возвращает пустой набор блоков и ждёт следующий chunk.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RhxError {
    /// Некорректная конфигурация сессии (нет ни одной включённой полосы,
    /// неположительная частота дискретизации и т.п.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Магическое число блока/чанка не совпало с ожидаемым
    #[error(
        "Bad magic number on {stream} stream at byte {offset}: \
         expected {expected:#010x}, found {found:#010x}"
    )]
    BadMagicNumber {
        stream: StreamKind,
        expected: u32,
        found: u32,
        offset: u64,
    },

    /// Попытка чтения за границей юнита (рассогласование размера юнита и
    /// раскладки декодера)
    #[error("Out of bounds read at byte {offset}: needed {needed} bytes, {available} available")]
    OutOfBounds {
        offset: u64,
        needed: usize,
        available: usize,
    },
}

impl RhxError {
    /// Удобный конструктор
    pub fn configuration<S: Into<String>>(s: S) -> Self {
        Self::Configuration(s.into())
    }

    /// `true` для ошибок кадрирования (`BadMagicNumber`, `OutOfBounds`).
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            RhxError::BadMagicNumber { .. } | RhxError::OutOfBounds { .. }
        )
    }

    /// Смещение в потоке, на котором обнаружена ошибка (если применимо).
    pub fn offset(&self) -> Option<u64> {
        match self {
            RhxError::BadMagicNumber { offset, .. } | RhxError::OutOfBounds { offset, .. } => {
                Some(*offset)
            }
            RhxError::Configuration(_) => None,
        }
    }
}
