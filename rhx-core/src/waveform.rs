use log::trace;
use rhx_types::{
    wire::{raw_to_seconds, FRAMES_PER_BLOCK, WAVEFORM_MAGIC},
    BandSamples, ChannelOutputConfig, Frame, RhxError, RhxResult, StreamKind, WaveformBlock,
};

use crate::binary::{write_i32_le, write_u16_le, write_u32_le, ByteCursor};

/// Декодер блоков потока формы сигнала.
///
/// Раскладка кадра задаётся [`ChannelOutputConfig`], шаг времени считается
/// один раз из частоты дискретизации.
#[derive(Debug, Clone)]
pub struct WaveformBlockDecoder {
    config: ChannelOutputConfig,
    sample_rate_hz: f64,
    timestep: f64,
}

impl WaveformBlockDecoder {
    pub fn new(
        config: ChannelOutputConfig,
        sample_rate_hz: f64,
    ) -> RhxResult<Self> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(RhxError::Configuration(format!(
                "sample rate must be a positive number of Hz, got {sample_rate_hz}"
            )));
        }

        Ok(Self {
            config,
            sample_rate_hz,
            timestep: 1.0 / sample_rate_hz,
        })
    }

    pub fn config(&self) -> &ChannelOutputConfig {
        &self.config
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Ожидаемый размер юнита в байтах.
    pub fn block_byte_size(&self) -> usize {
        self.config.block_byte_size()
    }

    /// Разбирает блок, лежащий в начале `unit`.
    pub fn decode(
        &self,
        unit: &[u8],
    ) -> RhxResult<WaveformBlock> {
        self.decode_at(unit, 0)
    }

    /// То же, что [`decode`](Self::decode), но смещения в ошибках считаются
    /// от `stream_offset`.
    ///
    /// Байты после последнего кадра не читаются.
    pub fn decode_at(
        &self,
        unit: &[u8],
        stream_offset: u64,
    ) -> RhxResult<WaveformBlock> {
        let mut cursor = ByteCursor::with_base_offset(unit, stream_offset);

        let magic_offset = cursor.stream_offset();
        let magic_number = cursor.read_u32_le()?;
        if magic_number != WAVEFORM_MAGIC {
            return Err(RhxError::BadMagicNumber {
                stream: StreamKind::Waveform,
                expected: WAVEFORM_MAGIC,
                found: magic_number,
                offset: magic_offset,
            });
        }

        let mut frames = Vec::with_capacity(FRAMES_PER_BLOCK);

        for _ in 0..FRAMES_PER_BLOCK {
            let timestamp_raw = cursor.read_i32_le()?;

            let mut samples = BandSamples::new();
            for band in self.config.field_order() {
                samples.set(band, cursor.read_u16_le()?);
            }

            frames.push(Frame {
                timestamp_raw,
                timestamp_secs: raw_to_seconds(timestamp_raw as i64, self.timestep),
                samples,
            });
        }

        trace!(
            "waveform block @{}: t0={} ({} frames)",
            stream_offset,
            frames[0].timestamp_raw,
            frames.len()
        );

        Ok(WaveformBlock {
            magic_number,
            frames,
        })
    }
}

/// Разовый разбор блока без создания декодера.
pub fn decode_waveform_block(
    unit: &[u8],
    config: &ChannelOutputConfig,
    sample_rate_hz: f64,
) -> RhxResult<WaveformBlock> {
    WaveformBlockDecoder::new(*config, sample_rate_hz)?.decode(unit)
}

/// Сериализует блок в раскладке `config`.
///
/// Блок должен содержать ровно 128 кадров, и в каждом кадре должны быть
/// отсчёты всех включённых полос. Лишние полосы не пишутся.
pub fn encode_waveform_block(
    block: &WaveformBlock,
    config: &ChannelOutputConfig,
) -> RhxResult<Vec<u8>> {
    if block.frames.len() != FRAMES_PER_BLOCK {
        return Err(RhxError::Configuration(format!(
            "waveform block must hold {FRAMES_PER_BLOCK} frames, got {}",
            block.frames.len()
        )));
    }

    let mut buf = Vec::with_capacity(config.block_byte_size());
    write_u32_le(&mut buf, block.magic_number);

    for (i, frame) in block.frames.iter().enumerate() {
        write_i32_le(&mut buf, frame.timestamp_raw);

        for band in config.field_order() {
            let raw = frame.samples.get(band).ok_or_else(|| {
                RhxError::Configuration(format!("frame {i} has no {band} sample"))
            })?;
            write_u16_le(&mut buf, raw);
        }
    }

    Ok(buf)
}
