use crate::{wire::raw_to_microvolts, Band};

/// Сырые отсчёты одного кадра, по одному на включённую полосу
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandSamples([Option<u16>; Band::COUNT]);

/// Один момент дискретизации внутри блока
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Метка времени в отсчётах (локальные часы контроллера)
    pub timestamp_raw: i32,
    /// Метка времени в секундах: `timestamp_raw / sample_rate_hz`
    pub timestamp_secs: f64,
    /// Сырые u16 отсчёты по полосам
    pub samples: BandSamples,
}

/// Блок формы сигнала: magic + ровно 128 кадров
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBlock {
    pub magic_number: u32,
    pub frames: Vec<Frame>,
}

impl BandSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        band: Band,
    ) -> Option<u16> {
        self.0[band.index()]
    }

    pub fn set(
        &mut self,
        band: Band,
        raw: u16,
    ) {
        self.0[band.index()] = Some(raw);
    }

    /// Присутствующие отсчёты в порядке на проводе.
    pub fn iter(&self) -> impl Iterator<Item = (Band, u16)> + '_ {
        Band::ALL
            .into_iter()
            .filter_map(|b| self.get(b).map(|raw| (b, raw)))
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Frame {
    /// Отсчёт полосы в микровольтах.
    pub fn microvolts(
        &self,
        band: Band,
    ) -> Option<f64> {
        self.samples.get(band).map(raw_to_microvolts)
    }
}

impl WaveformBlock {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Метка времени первого кадра (сырые отсчёты).
    pub fn first_timestamp(&self) -> Option<i32> {
        self.frames.first().map(|f| f.timestamp_raw)
    }

    /// Все отсчёты одной полосы в микровольтах, кадр за кадром.
    pub fn microvolts(
        &self,
        band: Band,
    ) -> impl Iterator<Item = f64> + '_ {
        self.frames.iter().filter_map(move |f| f.microvolts(band))
    }
}
