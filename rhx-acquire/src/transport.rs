// Источники байт для декодера: TCP сокет контроллера или синтетический поток.
// Каждый источник крутится в своём потоке и отдаёт сырые чанки в общий
// crossbeam канал; границы чанков никак не связаны с границами блоков.
// stop_flag: Arc<AtomicBool> поток можно остановить безопасно.

use std::{
    io::{ErrorKind, Read},
    net::{TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{SendTimeoutError, Sender};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rhx_core::{encode_spike_event, encode_waveform_block};
use rhx_types::{
    wire::{raw_to_seconds, FRAMES_PER_BLOCK, SPIKE_MAGIC, WAVEFORM_MAGIC},
    BandSamples, ChannelName, ChannelOutputConfig, Frame, RhxResult, SpikeEvent, StreamKind,
    WaveformBlock,
};

use crate::{metrics::AcquireMetrics, AcquireResult};

/// Как часто потоки чтения проверяют `stop_flag`.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Поставщик сырых байт одного бинарного потока.
pub trait StreamSource: Send {
    /// Какой поток отдаёт источник.
    fn kind(&self) -> StreamKind;

    /// Читает поток и отправляет чанки в `tx`. Блокируется до установки
    /// `stop_flag`, конца потока или закрытия канала.
    fn run(
        &mut self,
        tx: Sender<DataChunk>,
        metrics: Arc<AcquireMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> AcquireResult<()>;
}

/// Порция байт, полученная одним `read`.
#[derive(Debug, Clone)]
pub struct DataChunk {
    pub stream: StreamKind,
    pub data: Vec<u8>,
}

/// Отправляет чанк, не теряя его: при заполненном канале ждёт, периодически
/// проверяя `stop_flag`. `false`, если отправка больше невозможна.
fn forward(
    tx: &Sender<DataChunk>,
    mut chunk: DataChunk,
    stop_flag: &AtomicBool,
) -> bool {
    loop {
        match tx.send_timeout(chunk, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(c)) => {
                if stop_flag.load(Ordering::Relaxed) {
                    return false;
                }
                chunk = c;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// Момент выдачи юнита `index` от начала потока.
fn unit_deadline(
    unit_period_secs: f64,
    index: u64,
) -> Duration {
    Duration::from_secs_f64(unit_period_secs * index as f64)
}

////////////////////////////////////////////////////////////////////////////////
// TcpStreamSource
////////////////////////////////////////////////////////////////////////////////

/// Поток данных RHX из TCP сокета.
pub struct TcpStreamSource {
    kind: StreamKind,
    stream: TcpStream,
    buffer_size: usize,
}

impl TcpStreamSource {
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        kind: StreamKind,
        buffer_size: usize,
    ) -> AcquireResult<Self> {
        let stream = TcpStream::connect(addr)?;
        info!("Connected to {kind} stream at {}", stream.peer_addr()?);

        Self::from_stream(stream, kind, buffer_size)
    }

    /// Оборачивает уже открытый сокет. Выставляет таймаут чтения, чтобы
    /// поток мог заметить `stop_flag`.
    pub fn from_stream(
        stream: TcpStream,
        kind: StreamKind,
        buffer_size: usize,
    ) -> AcquireResult<Self> {
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            kind,
            stream,
            buffer_size: buffer_size.max(1),
        })
    }
}

impl StreamSource for TcpStreamSource {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn run(
        &mut self,
        tx: Sender<DataChunk>,
        metrics: Arc<AcquireMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> AcquireResult<()> {
        let mut buf = vec![0u8; self.buffer_size];

        while !stop_flag.load(Ordering::Relaxed) {
            let n = match self.stream.read(&mut buf) {
                Ok(0) => {
                    info!("{} stream closed by peer", self.kind);
                    break;
                }
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            };

            let chunk = DataChunk {
                stream: self.kind,
                data: buf[..n].to_vec(),
            };

            if !forward(&tx, chunk, &stop_flag) {
                debug!("{} reader: channel closed", self.kind);
                break;
            }
            metrics.record_bytes(self.kind, n);
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// SimulatedSource
////////////////////////////////////////////////////////////////////////////////

/// Синтетический поток для тестов и работы без контроллера.
///
/// Генерирует корректные блоки (синусоида 100 Гц на всех включённых полосах)
/// или спайк-чанки и режет их на куски случайной длины, так что декодер
/// видит те же разрывы, что и на реальном сокете.
pub struct SimulatedSource {
    kind: StreamKind,
    config: ChannelOutputConfig,
    sample_rate_hz: f64,
    channel: ChannelName,
    /// Сколько юнитов выдать (None = до `stop_flag`)
    units: Option<u64>,
    /// Максимальная длина одного чанка
    max_chunk: usize,
    /// Мусорные байты в конце потока (обрезанная передача)
    trailing_bytes: usize,
    /// Выдавать юниты в темпе реального времени
    realtime: bool,
    seed: u64,
}

impl SimulatedSource {
    /// Поток блоков формы сигнала в раскладке `config`.
    pub fn waveform(
        config: ChannelOutputConfig,
        sample_rate_hz: f64,
    ) -> Self {
        Self {
            kind: StreamKind::Waveform,
            config,
            sample_rate_hz,
            channel: ChannelName::from_bytes(*b"A-010"),
            units: None,
            max_chunk: 4_096,
            trailing_bytes: 0,
            realtime: false,
            seed: 0x5EED,
        }
    }

    /// Поток спайк-чанков канала `channel`; примерно половина чанков пустые.
    pub fn spikes(
        channel: ChannelName,
        sample_rate_hz: f64,
    ) -> Self {
        Self {
            kind: StreamKind::Spike,
            channel,
            max_chunk: 64,
            ..Self::waveform(ChannelOutputConfig::wideband_only(), sample_rate_hz)
        }
    }

    pub fn with_units(
        mut self,
        units: u64,
    ) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_max_chunk(
        mut self,
        max_chunk: usize,
    ) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    pub fn with_trailing_bytes(
        mut self,
        n: usize,
    ) -> Self {
        self.trailing_bytes = n;
        self
    }

    pub fn with_seed(
        mut self,
        seed: u64,
    ) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_realtime(
        mut self,
        realtime: bool,
    ) -> Self {
        self.realtime = realtime;
        self
    }

    /// Байты юнита с номером `index`.
    fn unit(
        &self,
        index: u64,
        rng: &mut StdRng,
    ) -> RhxResult<Vec<u8>> {
        let t0 = index * FRAMES_PER_BLOCK as u64;

        match self.kind {
            StreamKind::Spike => Ok(encode_spike_event(&SpikeEvent {
                magic_number: SPIKE_MAGIC,
                channel_name: self.channel,
                timestamp_raw: t0 as u32,
                unit_id: if rng.gen_bool(0.5) {
                    rng.gen_range(1..=4)
                } else {
                    0
                },
            })),
            _ => {
                let timestep = 1.0 / self.sample_rate_hz;
                let frames = (0..FRAMES_PER_BLOCK as u64)
                    .map(|i| {
                        let ts = (t0 + i) as i32;
                        let t = raw_to_seconds(ts as i64, timestep);
                        let raw = 32_768.0 + 8_000.0 * (2.0 * std::f64::consts::PI * 100.0 * t).sin();

                        let mut samples = BandSamples::new();
                        for band in self.config.field_order() {
                            samples.set(band, raw as u16);
                        }

                        Frame {
                            timestamp_raw: ts,
                            timestamp_secs: t,
                            samples,
                        }
                    })
                    .collect();

                encode_waveform_block(
                    &WaveformBlock {
                        magic_number: WAVEFORM_MAGIC,
                        frames,
                    },
                    &self.config,
                )
            }
        }
    }
}

impl StreamSource for SimulatedSource {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn run(
        &mut self,
        tx: Sender<DataChunk>,
        metrics: Arc<AcquireMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> AcquireResult<()> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let unit_period_secs = FRAMES_PER_BLOCK as f64 / self.sample_rate_hz;
        let start = Instant::now();

        let mut pending: Vec<u8> = Vec::new();
        let mut next_unit: u64 = 0;
        let mut trailer_added = false;

        while !stop_flag.load(Ordering::Relaxed) {
            let more_units = !matches!(self.units, Some(n) if next_unit >= n);

            // Держим в запасе хотя бы max_chunk байт.
            if pending.len() < self.max_chunk && more_units {
                pending.extend(self.unit(next_unit, &mut rng)?);
                next_unit += 1;

                if self.realtime {
                    let expected = unit_deadline(unit_period_secs, next_unit);
                    let elapsed = start.elapsed();
                    if expected > elapsed {
                        thread::sleep(expected - elapsed);
                    }
                }
                continue;
            }

            if !more_units && !trailer_added {
                pending.extend((0..self.trailing_bytes).map(|_| rng.gen::<u8>()));
                trailer_added = true;
            }

            if pending.is_empty() {
                debug!("simulated {} stream exhausted", self.kind);
                break;
            }

            let n = rng.gen_range(1..=self.max_chunk.min(pending.len()));
            let rest = pending.split_off(n);
            let data = std::mem::replace(&mut pending, rest);

            let len = data.len();

            if !forward(
                &tx,
                DataChunk {
                    stream: self.kind,
                    data,
                },
                &stop_flag,
            ) {
                break;
            }
            metrics.record_bytes(self.kind, len);
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
