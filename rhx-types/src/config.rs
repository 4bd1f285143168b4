use crate::{
    wire::{FRAMES_PER_BLOCK, MAGIC_SIZE, SAMPLE_SIZE, TIMESTAMP_SIZE},
    Band, RhxError, RhxResult,
};

/// Набор полос, включённых для TCP вывода канала.
///
/// Определяет раскладку кадра в потоке формы сигнала. Создаётся один раз до
/// старта сессии и дальше не меняется; пустой набор отвергается при
/// конструировании.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelOutputConfig {
    wideband: bool,
    high_band: bool,
    spike_band: bool,
}

impl ChannelOutputConfig {
    pub fn new(
        wideband: bool,
        high_band: bool,
        spike_band: bool,
    ) -> RhxResult<Self> {
        let config = Self {
            wideband,
            high_band,
            spike_band,
        };

        if config.enabled_count() == 0 {
            return Err(RhxError::configuration(
                "at least one band (wide, high, spike) must be enabled",
            ));
        }

        Ok(config)
    }

    /// Только широкополосный сигнал (раскладка по умолчанию в RHX).
    pub fn wideband_only() -> Self {
        Self {
            wideband: true,
            high_band: false,
            spike_band: false,
        }
    }

    /// Строит конфигурацию из списка полос. Повторы игнорируются.
    pub fn from_bands(bands: &[Band]) -> RhxResult<Self> {
        Self::new(
            bands.contains(&Band::Wideband),
            bands.contains(&Band::HighBand),
            bands.contains(&Band::SpikeBand),
        )
    }

    pub fn is_enabled(
        &self,
        band: Band,
    ) -> bool {
        match band {
            Band::Wideband => self.wideband,
            Band::HighBand => self.high_band,
            Band::SpikeBand => self.spike_band,
        }
    }

    /// Включённые полосы в порядке следования на проводе.
    pub fn field_order(&self) -> impl Iterator<Item = Band> + '_ {
        Band::ALL.into_iter().filter(|b| self.is_enabled(*b))
    }

    pub fn enabled_count(&self) -> usize {
        self.field_order().count()
    }

    /// Размер одного кадра: timestamp + по u16 на каждую включённую полосу.
    pub fn frame_byte_size(&self) -> usize {
        TIMESTAMP_SIZE + SAMPLE_SIZE * self.enabled_count()
    }

    /// Размер блока: magic + 128 кадров.
    pub fn block_byte_size(&self) -> usize {
        MAGIC_SIZE + FRAMES_PER_BLOCK * self.frame_byte_size()
    }
}

impl std::fmt::Display for ChannelOutputConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let names: Vec<&str> = self.field_order().map(|b| b.as_str()).collect();
        write!(f, "{}", names.join("+"))
    }
}
