//! Константы бинарных форматов TCP потоков RHX.
//!
//! Все многобайтовые числа передаются в порядке little-endian.
//!
//! ```text
//! Блок формы сигнала:
//! [0..4]      MAGIC        u32  = 0x2EF07A08
//! [4..]       128 кадров:  i32 timestamp, затем u16 на каждую включённую
//!                          полосу (wide, high, spike)
//!
//! Спайк-чанк (14 байт):
//! [0..4]      MAGIC        u32  = 0x3AE2710F
//! [4..9]      CHANNEL      5 байт ASCII ("A-010")
//! [9..13]     TIMESTAMP    u32
//! [13]        UNIT_ID      u8   (0 = спайка нет)
//! ```

/// Магическое число блока формы сигнала
pub const WAVEFORM_MAGIC: u32 = 0x2EF0_7A08;

/// Магическое число спайк-чанка
pub const SPIKE_MAGIC: u32 = 0x3AE2_710F;

/// Кадров в одном блоке формы сигнала
pub const FRAMES_PER_BLOCK: usize = 128;

pub const MAGIC_SIZE: usize = 4;
pub const TIMESTAMP_SIZE: usize = 4;
pub const SAMPLE_SIZE: usize = 2;
pub const CHANNEL_NAME_LEN: usize = 5;
pub const UNIT_ID_SIZE: usize = 1;

/// Размер спайк-чанка: magic + имя канала + timestamp + id = 14 байт
pub const SPIKE_CHUNK_SIZE: usize = MAGIC_SIZE + CHANNEL_NAME_LEN + TIMESTAMP_SIZE + UNIT_ID_SIZE;

/// Цена младшего разряда АЦП усилителя, мкВ
pub const MICROVOLTS_PER_BIT: f64 = 0.195;

/// Нулевой уровень беззнакового отсчёта
pub const SAMPLE_MIDPOINT: f64 = 32_768.0;

/// Переводит сырой u16 отсчёт в микровольты: `0.195 * (raw - 32768)`.
pub fn raw_to_microvolts(raw: u16) -> f64 {
    MICROVOLTS_PER_BIT * (raw as f64 - SAMPLE_MIDPOINT)
}

/// Переводит сырую метку времени в секунды при шаге `timestep = 1 / fs`.
pub fn raw_to_seconds(
    raw: i64,
    timestep: f64,
) -> f64 {
    raw as f64 * timestep
}
