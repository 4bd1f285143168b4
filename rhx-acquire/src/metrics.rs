use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use rhx_types::StreamKind;

/// Метрики, обновляемые lock-free из нескольких потоков.
#[derive(Debug, Default)]
pub struct AcquireMetrics {
    pub waveform_bytes: AtomicU64,
    pub spike_bytes: AtomicU64,
    pub blocks_decoded: AtomicU64,
    pub frames_decoded: AtomicU64,
    pub spikes_reported: AtomicU64,
    pub null_spike_chunks: AtomicU64,
    pub decode_errors: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    pub waveform_bytes: u64,
    pub spike_bytes: u64,
    pub blocks_decoded: u64,
    pub frames_decoded: u64,
    pub spikes_reported: u64,
    pub null_spike_chunks: u64,
    pub decode_errors: u64,
    pub frame_rate_hz: f64,
    pub data_rate_mbps: f64,
}

impl AcquireMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Учитывает байты, прочитанные из сокета потока.
    pub fn record_bytes(
        &self,
        stream: StreamKind,
        n: usize,
    ) {
        let counter = match stream {
            StreamKind::Waveform => &self.waveform_bytes,
            StreamKind::Spike => &self.spike_bytes,
            StreamKind::Command => return,
        };

        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn bytes_received(&self) -> u64 {
        self.waveform_bytes.load(Ordering::Relaxed) + self.spike_bytes.load(Ordering::Relaxed)
    }

    /// Кадров в секунду с момента `elapsed`. Для одного канала совпадает с
    /// частотой дискретизации, если декодер успевает за потоком.
    pub fn frame_rate_hz(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.frames_decoded.load(Ordering::Relaxed) as f64 / secs
    }

    /// Скорость приёма в МБ/с по обоим бинарным потокам.
    pub fn data_rate_mbps(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.bytes_received() as f64 / secs / 1_000_000.0
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> MetricsSummary {
        MetricsSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            waveform_bytes: self.waveform_bytes.load(Ordering::Relaxed),
            spike_bytes: self.spike_bytes.load(Ordering::Relaxed),
            blocks_decoded: self.blocks_decoded.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            spikes_reported: self.spikes_reported.load(Ordering::Relaxed),
            null_spike_chunks: self.null_spike_chunks.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frame_rate_hz: self.frame_rate_hz(elapsed),
            data_rate_mbps: self.data_rate_mbps(elapsed),
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(
            f,
            "  Received      : {:.2} MB waveform, {:.2} kB spike",
            self.waveform_bytes as f64 / 1e6,
            self.spike_bytes as f64 / 1e3
        )?;
        writeln!(f, "  Blocks        : {}", self.blocks_decoded)?;
        writeln!(f, "  Frames        : {}", self.frames_decoded)?;
        writeln!(
            f,
            "  Spikes        : {} ({} empty chunks)",
            self.spikes_reported, self.null_spike_chunks
        )?;
        writeln!(f, "  Decode errors : {}", self.decode_errors)?;
        writeln!(f, "  Frame rate    : {:.0} Hz", self.frame_rate_hz)?;
        writeln!(f, "  Data rate     : {:.2} MB/s", self.data_rate_mbps)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
