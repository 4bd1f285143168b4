/// TCP поток контроллера RHX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamKind {
    /// Текстовый канал команд (`get` / `set` / `execute`)
    Command = 0,
    /// Бинарный поток блоков формы сигнала
    Waveform = 1,
    /// Бинарный поток спайк-чанков
    Spike = 2,
}

/// Остаток неполного юнита на момент закрытия сессии.
///
/// Не ошибка: остановка контроллера естественным образом обрезает последнюю
/// передачу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedStreamWarning {
    /// Поток, в котором остались байты
    pub stream: StreamKind,
    /// Смещение первого байта остатка от начала потока
    pub stream_offset: u64,
    /// Сами байты остатка (меньше одного юнита)
    pub bytes: Vec<u8>,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Command => "command",
            StreamKind::Waveform => "waveform",
            StreamKind::Spike => "spike",
        }
    }

    /// Порт по умолчанию в RHX (Network -> Remote TCP Control).
    pub fn default_port(&self) -> u16 {
        match self {
            StreamKind::Command => 5000,
            StreamKind::Waveform => 5001,
            StreamKind::Spike => 5002,
        }
    }
}

impl TruncatedStreamWarning {
    /// Количество оставшихся байт.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for TruncatedStreamWarning {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{} stream truncated: {} trailing bytes at offset {} discarded",
            self.stream,
            self.bytes.len(),
            self.stream_offset
        )
    }
}
