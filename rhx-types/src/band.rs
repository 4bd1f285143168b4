use crate::{RhxError, RhxResult};

/// Полоса усилителя, которую можно независимо включить для TCP вывода
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Band {
    /// Широкополосный сигнал
    Wideband = 0,
    /// Высокочастотная полоса
    HighBand = 1,
    /// Полоса детектора спайков
    SpikeBand = 2,
}

impl Band {
    /// Все полосы в порядке следования на проводе.
    pub const ALL: [Band; 3] = [Band::Wideband, Band::HighBand, Band::SpikeBand];

    pub const COUNT: usize = Self::ALL.len();

    pub fn from_u8(v: u8) -> RhxResult<Self> {
        match v {
            0 => Ok(Band::Wideband),
            1 => Ok(Band::HighBand),
            2 => Ok(Band::SpikeBand),
            _ => Err(RhxError::Configuration(format!("Unknown band: {v}"))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Индекс полосы в порядке на проводе.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Wideband => "wide",
            Band::HighBand => "high",
            Band::SpikeBand => "spike",
        }
    }

    /// Суффикс свойства канала, включающего полосу через командный канал:
    /// `set a-010.<suffix> true`.
    pub fn output_property(&self) -> &'static str {
        match self {
            Band::Wideband => "tcpdataoutputenabled",
            Band::HighBand => "tcpdataoutputenabledhigh",
            Band::SpikeBand => "tcpdataoutputenabledspike",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wide" | "wideband" => Ok(Band::Wideband),
            "high" | "highband" => Ok(Band::HighBand),
            "spike" | "spikeband" => Ok(Band::SpikeBand),
            _ => Err(format!("Unknown band: '{s}'. Use: wide, high, spike")),
        }
    }
}
