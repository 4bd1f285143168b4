//! Сессия приёма: два независимых потока, одна частота дискретизации.

use log::{debug, warn};
use rhx_types::{
    wire::SPIKE_CHUNK_SIZE, ChannelOutputConfig, RhxResult, Spike, StreamKind,
    TruncatedStreamWarning, WaveformBlock,
};

use crate::{
    reassembly::{CompleteUnits, StreamReassembler},
    spike::SpikeEventDecoder,
    waveform::WaveformBlockDecoder,
};

/// Счётчики, накопленные [`AcquisitionSession`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Успешно разобранных блоков формы сигнала.
    pub blocks_decoded: u64,
    /// Блоков с ошибкой кадрирования.
    pub blocks_rejected: u64,
    /// Разобранных спайк-чанков, включая пустые.
    pub spike_chunks_decoded: u64,
    /// Чанков с `unit_id == 0`.
    pub null_spike_chunks: u64,
    /// Спайков, отданных потребителю.
    pub spikes_reported: u64,
    /// Спайк-чанков с ошибкой кадрирования.
    pub spike_chunks_rejected: u64,
}

/// Владеет реассемблерами обоих бинарных потоков и декодерами.
///
/// Потоки кормятся независимо и в любом порядке. Сетевого ввода-вывода
/// внутри нет: байты приносит вызывающий.
#[derive(Debug)]
pub struct AcquisitionSession {
    config: ChannelOutputConfig,
    waveform: StreamReassembler,
    spikes: StreamReassembler,
    waveform_decoder: WaveformBlockDecoder,
    spike_decoder: SpikeEventDecoder,
    stats: SessionStats,
}

/// Блоки, выделенные одним вызовом [`AcquisitionSession::feed_waveform`].
///
/// Юниты отрезаны от потока в момент вызова, разбор идёт по мере обхода.
/// Неиспользованный итератор теряет свои блоки.
#[must_use = "decoded blocks are lost if the iterator is dropped"]
pub struct WaveformBlocks<'a> {
    units: CompleteUnits,
    next: usize,
    decoder: &'a WaveformBlockDecoder,
    stats: &'a mut SessionStats,
}

/// Спайки, выделенные одним вызовом [`AcquisitionSession::feed_spikes`].
#[must_use = "decoded spikes are lost if the iterator is dropped"]
pub struct Spikes<'a> {
    units: CompleteUnits,
    next: usize,
    decoder: &'a SpikeEventDecoder,
    timestep: f64,
    stats: &'a mut SessionStats,
}

impl AcquisitionSession {
    /// Создаёт сессию. Частота должна быть положительной.
    pub fn new(
        config: ChannelOutputConfig,
        sample_rate_hz: f64,
    ) -> RhxResult<Self> {
        let waveform_decoder = WaveformBlockDecoder::new(config, sample_rate_hz)?;
        let waveform = StreamReassembler::new(StreamKind::Waveform, config.block_byte_size())?;
        let spikes = StreamReassembler::new(StreamKind::Spike, SPIKE_CHUNK_SIZE)?;

        debug!(
            "session: bands={}, block={} bytes, fs={} Hz",
            config,
            config.block_byte_size(),
            sample_rate_hz
        );

        Ok(Self {
            config,
            waveform,
            spikes,
            waveform_decoder,
            spike_decoder: SpikeEventDecoder::new(),
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &ChannelOutputConfig {
        &self.config
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.waveform_decoder.sample_rate_hz()
    }

    /// Шаг времени `1 / sample_rate_hz`.
    pub fn timestep(&self) -> f64 {
        self.waveform_decoder.timestep()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Байт в остатке потока. У командного потока остатка нет.
    pub fn pending_bytes(
        &self,
        stream: StreamKind,
    ) -> usize {
        match stream {
            StreamKind::Waveform => self.waveform.pending(),
            StreamKind::Spike => self.spikes.pending(),
            StreamKind::Command => 0,
        }
    }

    /// Всего байт, принятых потоком.
    pub fn bytes_fed(
        &self,
        stream: StreamKind,
    ) -> u64 {
        match stream {
            StreamKind::Waveform => self.waveform.bytes_fed(),
            StreamKind::Spike => self.spikes.bytes_fed(),
            StreamKind::Command => 0,
        }
    }

    /// Кормит поток формы сигнала.
    ///
    /// Ошибка одного блока не мешает разбору следующих: остаток реассемблера
    /// от неё не зависит.
    pub fn feed_waveform(
        &mut self,
        chunk: &[u8],
    ) -> WaveformBlocks<'_> {
        WaveformBlocks {
            units: self.waveform.feed(chunk),
            next: 0,
            decoder: &self.waveform_decoder,
            stats: &mut self.stats,
        }
    }

    /// Кормит спайк-поток. Чанки с `unit_id == 0` в результат не попадают.
    pub fn feed_spikes(
        &mut self,
        chunk: &[u8],
    ) -> Spikes<'_> {
        Spikes {
            units: self.spikes.feed(chunk),
            next: 0,
            decoder: &self.spike_decoder,
            timestep: self.waveform_decoder.timestep(),
            stats: &mut self.stats,
        }
    }

    /// Завершает сессию. Неполные хвосты потоков возвращаются как
    /// предупреждения и пишутся в лог.
    pub fn close(self) -> Vec<TruncatedStreamWarning> {
        let warnings: Vec<_> = [self.waveform.finish(), self.spikes.finish()]
            .into_iter()
            .flatten()
            .collect();

        for w in &warnings {
            warn!("{w}");
        }

        debug!("session closed: {:?}", self.stats);

        warnings
    }
}

impl Iterator for WaveformBlocks<'_> {
    type Item = RhxResult<WaveformBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.units.get(self.next)?;
        let offset = self.units.stream_offset(self.next);
        self.next += 1;

        let result = self.decoder.decode_at(unit, offset);
        match result {
            Ok(_) => self.stats.blocks_decoded += 1,
            Err(_) => self.stats.blocks_rejected += 1,
        }

        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.units.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for WaveformBlocks<'_> {}

impl Iterator for Spikes<'_> {
    type Item = RhxResult<Spike>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let unit = self.units.get(self.next)?;
            let offset = self.units.stream_offset(self.next);
            self.next += 1;

            let event = match self.decoder.decode_at(unit, offset) {
                Ok(event) => event,
                Err(e) => {
                    self.stats.spike_chunks_rejected += 1;
                    return Some(Err(e));
                }
            };
            self.stats.spike_chunks_decoded += 1;

            if !event.is_spike() {
                self.stats.null_spike_chunks += 1;
                continue;
            }
            self.stats.spikes_reported += 1;

            return Some(Ok(Spike {
                channel_name: event.channel_name,
                timestamp_raw: event.timestamp_raw,
                timestamp_secs: event.timestamp_secs(self.timestep),
                unit_id: event.unit_id,
            }));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.units.len() - self.next))
    }
}
