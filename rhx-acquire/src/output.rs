use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use rhx_types::{Band, Spike, WaveformBlock};
use serde::Serialize;

use crate::{AcquireError, AcquireResult};

/// Потребитель декодированных данных.
pub trait AcquisitionSink {
    fn on_block(
        &mut self,
        block: &WaveformBlock,
    ) -> AcquireResult<()>;

    fn on_spike(
        &mut self,
        spike: &Spike,
    ) -> AcquireResult<()>;

    /// Вызывается один раз после последнего блока.
    fn finish(&mut self) -> AcquireResult<()> {
        Ok(())
    }
}

/// Одна строка JSON-lines файла.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Record<'a> {
    Frame {
        timestamp: f64,
        timestamp_raw: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        wideband_uv: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        highband_uv: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        spikeband_uv: Option<f64>,
    },
    Spike {
        channel: &'a str,
        timestamp: f64,
        timestamp_raw: u32,
        unit_id: u8,
    },
}

/// Пишет каждый кадр и каждый спайк отдельной JSON строкой.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    lines: u64,
}

impl JsonLinesSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> AcquireResult<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            lines: 0,
        }
    }

    /// Записано строк.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Сбрасывает буфер и отдаёт внутренний writer.
    pub fn into_inner(self) -> AcquireResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| AcquireError::Io(e.into_error()))
    }

    fn write_record(
        &mut self,
        record: &Record<'_>,
    ) -> AcquireResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;

        Ok(())
    }
}

impl<W: Write> AcquisitionSink for JsonLinesSink<W> {
    fn on_block(
        &mut self,
        block: &WaveformBlock,
    ) -> AcquireResult<()> {
        for frame in &block.frames {
            self.write_record(&Record::Frame {
                timestamp: frame.timestamp_secs,
                timestamp_raw: frame.timestamp_raw,
                wideband_uv: frame.microvolts(Band::Wideband),
                highband_uv: frame.microvolts(Band::HighBand),
                spikeband_uv: frame.microvolts(Band::SpikeBand),
            })?;
        }

        Ok(())
    }

    fn on_spike(
        &mut self,
        spike: &Spike,
    ) -> AcquireResult<()> {
        let channel = spike.channel_name.to_string();

        self.write_record(&Record::Spike {
            channel: &channel,
            timestamp: spike.timestamp_secs,
            timestamp_raw: spike.timestamp_raw,
            unit_id: spike.unit_id,
        })
    }

    fn finish(&mut self) -> AcquireResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Отбрасывает всё.
#[derive(Debug, Default)]
pub struct NullSink;

impl AcquisitionSink for NullSink {
    fn on_block(
        &mut self,
        _block: &WaveformBlock,
    ) -> AcquireResult<()> {
        Ok(())
    }

    fn on_spike(
        &mut self,
        _spike: &Spike,
    ) -> AcquireResult<()> {
        Ok(())
    }
}
