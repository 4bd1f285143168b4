use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use rhx_core::{AcquisitionSession, SessionStats};
use rhx_types::{StreamKind, TruncatedStreamWarning};

use crate::{
    metrics::AcquireMetrics,
    output::AcquisitionSink,
    transport::{DataChunk, StreamSource},
    AcquireConfig, AcquireError, AcquireResult,
};

/// Оркестрирует сессию приёма: потоки чтения -> канал -> декодер -> sink.
pub struct AcquisitionPipeline {
    config: AcquireConfig,
    metrics: Arc<AcquireMetrics>,
    stop_flag: Arc<AtomicBool>,
}

/// Итог завершённого прогона.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: SessionStats,
    pub warnings: Vec<TruncatedStreamWarning>,
    pub elapsed: Duration,
}

impl AcquisitionPipeline {
    /// Создаёт пайплайн. Возвращает также shared-ссылку на метрики.
    pub fn new(config: AcquireConfig) -> (Self, Arc<AcquireMetrics>) {
        let metrics = AcquireMetrics::new();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let p = Self {
            config,
            metrics: metrics.clone(),
            stop_flag,
        };

        (p, metrics)
    }

    /// Флаг остановки. Устанавливается в `true` для graceful shutdown.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Запускает приём. Блокируется до остановки, истечения времени или
    /// закрытия всех источников.
    ///
    /// Ошибка кадрирования завершает прогон ошибкой с указанием потока и
    /// смещения. Сессия закрывается и sink сбрасывается в любом случае.
    /// При остановке по флагу или по времени уже прочитанные чанки
    /// декодируются до конца.
    pub fn run(
        self,
        waveform: Box<dyn StreamSource>,
        spikes: Option<Box<dyn StreamSource>>,
        sample_rate_hz: f64,
        sink: &mut dyn AcquisitionSink,
    ) -> AcquireResult<RunReport> {
        let mut session = AcquisitionSession::new(self.config.outputs, sample_rate_hz)?;

        info!(
            "Starting acquisition: {} [{}] @ {} Hz, block {} bytes",
            self.config.channel,
            self.config.outputs,
            sample_rate_hz,
            self.config.outputs.block_byte_size()
        );

        let (tx, rx) = crossbeam_channel::bounded::<DataChunk>(self.config.queue_capacity);

        let handles: Vec<_> = std::iter::once(waveform)
            .chain(spikes)
            .map(|mut source| {
                let tx = tx.clone();
                let metrics = self.metrics.clone();
                let stop_flag = self.stop_flag.clone();
                let kind = source.kind();

                let handle = thread::spawn(move || {
                    let result = source.run(tx, metrics, stop_flag);

                    if let Err(ref e) = result {
                        warn!("{kind} reader error: {e}");
                    }

                    result
                });

                (kind, handle)
            })
            .collect();

        // Канал закрывается, когда завершатся все источники.
        drop(tx);

        let started = Instant::now();
        let result = self.decode_loop(&mut session, rx, sink);

        self.stop_flag.store(true, Ordering::Relaxed);
        join_readers(handles);

        let stats = session.stats().clone();
        let warnings = session.close();

        match result {
            Ok(()) => {
                sink.finish()?;
                info!("Acquisition finished: {stats:?}");

                Ok(RunReport {
                    stats,
                    warnings,
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                // Уже декодированное должно дойти до файла.
                if let Err(finish_err) = sink.finish() {
                    warn!("Failed to flush sink after abort: {finish_err}");
                }
                error!("Acquisition aborted: {e}");
                Err(e)
            }
        }
    }

    fn decode_loop(
        &self,
        session: &mut AcquisitionSession,
        rx: Receiver<DataChunk>,
        sink: &mut dyn AcquisitionSink,
    ) -> AcquireResult<()> {
        let cfg = &self.config;
        let recv_timeout = Duration::from_millis(100);
        let stats_interval = Duration::from_secs(cfg.stats_interval_secs);

        let session_start = Instant::now();
        let mut last_stats = Instant::now();

        loop {
            // Проверяем ограничение по времени
            if let Some(dur) = cfg.duration_secs {
                if session_start.elapsed().as_secs() >= dur {
                    info!("Duration limit reached ({dur}s). Finalizing...");
                    break;
                }
            }

            // Проверяем внешний stop_flag (Ctrl+C)
            if self.stop_flag.load(Ordering::Relaxed) {
                info!("Stop signal received. Finalizing...");
                break;
            }

            let chunk = match rx.recv_timeout(recv_timeout) {
                Ok(c) => c,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    info!("All streams closed. Finalizing...");
                    return Ok(());
                }
            };

            self.process_chunk(session, chunk, sink)?;

            // Периодически выводим статистику
            if last_stats.elapsed() >= stats_interval {
                self.log_progress(session, &session_start);
                last_stats = Instant::now();
            }
        }

        // Потоки чтения выходят по флагу; прочитанное ими декодируем до конца.
        self.stop_flag.store(true, Ordering::Relaxed);

        let mut drained = 0usize;
        for chunk in rx.iter() {
            self.process_chunk(session, chunk, sink)?;
            drained += 1;
        }
        debug!("Drained {drained} queued chunks");

        Ok(())
    }

    fn process_chunk(
        &self,
        session: &mut AcquisitionSession,
        chunk: DataChunk,
        sink: &mut dyn AcquisitionSink,
    ) -> AcquireResult<()> {
        let metrics = &self.metrics;

        match chunk.stream {
            StreamKind::Waveform => {
                for block in session.feed_waveform(&chunk.data) {
                    let block = block.map_err(|e| {
                        metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
                        AcquireError::decode(StreamKind::Waveform, e)
                    })?;

                    metrics.blocks_decoded.fetch_add(1, Ordering::Relaxed);
                    metrics
                        .frames_decoded
                        .fetch_add(block.len() as u64, Ordering::Relaxed);
                    sink.on_block(&block)?;
                }
            }
            StreamKind::Spike => {
                let before = session.stats().null_spike_chunks;

                for spike in session.feed_spikes(&chunk.data) {
                    let spike = spike.map_err(|e| {
                        metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
                        AcquireError::decode(StreamKind::Spike, e)
                    })?;

                    metrics.spikes_reported.fetch_add(1, Ordering::Relaxed);
                    sink.on_spike(&spike)?;
                }

                let nulls = session.stats().null_spike_chunks - before;
                metrics
                    .null_spike_chunks
                    .fetch_add(nulls, Ordering::Relaxed);
            }
            StreamKind::Command => {
                return Err(AcquireError::Pipeline(
                    "command channel bytes routed to the decoder".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn log_progress(
        &self,
        session: &AcquisitionSession,
        start: &Instant,
    ) {
        let m = &self.metrics;

        info!(
            "[ {:.0}s ] blocks={} frames={} spikes={} pending={}/{} B rate={:.0} Hz",
            start.elapsed().as_secs_f64(),
            m.blocks_decoded.load(Ordering::Relaxed),
            m.frames_decoded.load(Ordering::Relaxed),
            m.spikes_reported.load(Ordering::Relaxed),
            session.pending_bytes(StreamKind::Waveform),
            session.pending_bytes(StreamKind::Spike),
            m.frame_rate_hz(start),
        );
    }
}

/// Дожидается завершения потоков чтения.
fn join_readers(handles: Vec<(StreamKind, JoinHandle<AcquireResult<()>>)>) {
    for (kind, handle) in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{kind} reader finished with error: {e}"),
            Err(_) => warn!("{kind} reader panicked"),
        }
    }
}
