use std::{path::PathBuf, time::Duration};

use rhx_types::{Band, ChannelOutputConfig, StreamKind};

/// Полная конфигурация сессии приёма.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Адрес машины с запущенным RHX
    pub host: String,
    /// Порт командного канала
    pub command_port: u16,
    /// Порт потока формы сигнала
    pub waveform_port: u16,
    /// Порт спайк-потока
    pub spike_port: u16,
    /// Нативное имя канала в нижнем регистре (`a-010`)
    pub channel: String,
    /// Включаемые полосы TCP вывода
    pub outputs: ChannelOutputConfig,
    /// Подключать ли спайк-поток
    pub spike_stream: bool,
    /// Путь к JSON-lines файлу (None = без записи)
    pub output_path: Option<PathBuf>,
    /// Ограничение по времени (None = до Ctrl+C или закрытия потоков)
    pub duration_secs: Option<u64>,
    /// Размер буфера одного `read` из сокета
    pub read_buffer_size: usize,
    /// Ёмкость канала между потоками чтения и декодером (в чанках)
    pub queue_capacity: usize,
    /// Интервал вывода статистики (секунды)
    pub stats_interval_secs: u64,
    /// Пауза после каждой команды `set` / `execute` (мс)
    pub settle_delay_ms: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl AcquireConfig {
    pub fn port(
        &self,
        stream: StreamKind,
    ) -> u16 {
        match stream {
            StreamKind::Command => self.command_port,
            StreamKind::Waveform => self.waveform_port,
            StreamKind::Spike => self.spike_port,
        }
    }

    /// `host:port` для потока.
    pub fn address(
        &self,
        stream: StreamKind,
    ) -> String {
        format!("{}:{}", self.host, self.port(stream))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_port: StreamKind::Command.default_port(),
            waveform_port: StreamKind::Waveform.default_port(),
            spike_port: StreamKind::Spike.default_port(),
            channel: "a-010".to_string(),
            outputs: ChannelOutputConfig::wideband_only(),
            spike_stream: false,
            output_path: None,
            duration_secs: None,
            read_buffer_size: 64 * 1024,
            queue_capacity: 256,
            stats_interval_secs: 5,
            settle_delay_ms: 100,
        }
    }
}

/// Парсит список полос через запятую или `+`.
///
/// # Примеры
/// ```
/// use rhx_acquire::config::parse_bands;
/// let c = parse_bands("wide,spike").unwrap();
/// assert_eq!(c.block_byte_size(), 1028);
/// assert_eq!(parse_bands("high+spike").unwrap().enabled_count(), 2);
/// ```
pub fn parse_bands(s: &str) -> Result<ChannelOutputConfig, String> {
    let bands = s
        .split([',', '+'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse::<Band>)
        .collect::<Result<Vec<_>, _>>()?;

    ChannelOutputConfig::from_bands(&bands).map_err(|e| e.to_string())
}

/// Проверяет нативное имя канала: буква порта, дефис, три цифры.
///
/// Возвращает имя в нижнем регистре, как его ждёт командный канал.
///
/// # Примеры
/// ```
/// use rhx_acquire::config::parse_channel;
/// assert_eq!(parse_channel("A-010").unwrap(), "a-010");
/// assert!(parse_channel("a10").is_err());
/// ```
pub fn parse_channel(s: &str) -> Result<String, String> {
    let name = s.trim().to_ascii_lowercase();
    let bytes = name.as_bytes();

    let valid = bytes.len() == 5
        && bytes[0].is_ascii_lowercase()
        && bytes[1] == b'-'
        && bytes[2..].iter().all(u8::is_ascii_digit);

    if !valid {
        return Err(format!(
            "Invalid channel name '{s}'. Expected <port>-<NNN>, e.g. a-010"
        ));
    }

    Ok(name)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
