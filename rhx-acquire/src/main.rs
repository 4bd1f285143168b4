use std::{
    net::TcpStream,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use clap::Parser;
use log::{error, info, warn};
use rhx_acquire::{
    parse_bands, parse_channel, prepare_acquisition, AcquireConfig, AcquisitionPipeline,
    AcquisitionSink, CommandClient, JsonLinesSink, NullSink, RunMode, SimulatedSource,
    StreamSource, TcpStreamSource,
};
use rhx_types::{ChannelName, StreamKind};

#[derive(Parser, Debug)]
#[command(
    name = "rhx-acquire",
    version = env!("CARGO_PKG_VERSION"),
    about = "Stream waveform and spike data from Intan RHX over TCP",
    long_about = None,
)]
struct Cli {
    /// Адрес машины с RHX
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Порт командного канала
    #[arg(long, default_value_t = 5000)]
    command_port: u16,
    /// Порт потока формы сигнала
    #[arg(long, default_value_t = 5001)]
    waveform_port: u16,
    /// Порт спайк-потока
    #[arg(long, default_value_t = 5002)]
    spike_port: u16,
    /// Канал (a-010)
    #[arg(short, long, default_value = "a-010")]
    channel: String,
    /// Полосы: wide, high, spike через запятую
    #[arg(short, long, default_value = "wide")]
    bands: String,
    /// Подключить спайк-поток (порт 5002)
    #[arg(long)]
    spikes: bool,
    /// JSON-lines файл для кадров и спайков
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Ограничение приёма (секунды). По умолчанию: до Ctrl+C
    #[arg(short, long)]
    duration: Option<u64>,
    /// Размер буфера чтения из сокета (байт)
    #[arg(long, default_value_t = 64 * 1024)]
    read_buffer: usize,
    /// Ёмкость канала между потоками чтения и декодером (чанков)
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,
    /// Интервал вывода статистики (секунды)
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,
    /// Пауза после команд set / execute (мс)
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,
    /// Работать без контроллера: синтетические потоки
    #[arg(long)]
    simulate: bool,
    /// Частота дискретизации для --simulate (Гц)
    #[arg(long, default_value_t = 30_000.0)]
    sim_rate: f64,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

/// Источники данных и частота дискретизации.
struct Sources {
    waveform: Box<dyn StreamSource>,
    spikes: Option<Box<dyn StreamSource>>,
    sample_rate_hz: f64,
    command: Option<CommandClient<TcpStream>>,
}

fn connect_controller(config: &AcquireConfig) -> rhx_acquire::AcquireResult<Sources> {
    let stream = TcpStream::connect(config.address(StreamKind::Command))?;
    stream.set_nodelay(true)?;
    info!("Connected to command server at {}", stream.peer_addr()?);

    let mut client = CommandClient::new(stream).with_settle_delay(config.settle_delay());
    info!("Controller type: {}", client.controller_type()?);

    let sample_rate_hz = prepare_acquisition(&mut client, &config.channel, &config.outputs)?;

    let waveform = TcpStreamSource::connect(
        config.address(StreamKind::Waveform),
        StreamKind::Waveform,
        config.read_buffer_size,
    )?;

    let spikes = if config.spike_stream {
        let src = TcpStreamSource::connect(
            config.address(StreamKind::Spike),
            StreamKind::Spike,
            config.read_buffer_size,
        )?;
        Some(Box::new(src) as Box<dyn StreamSource>)
    } else {
        None
    };

    client.set_run_mode(RunMode::Run)?;

    Ok(Sources {
        waveform: Box::new(waveform),
        spikes,
        sample_rate_hz,
        command: Some(client),
    })
}

fn simulated(
    config: &AcquireConfig,
    sample_rate_hz: f64,
) -> Sources {
    let name = ChannelName::new(&config.channel.to_ascii_uppercase())
        .unwrap_or_else(|_| ChannelName::from_bytes(*b"A-010"));

    let spikes = config.spike_stream.then(|| {
        Box::new(SimulatedSource::spikes(name, sample_rate_hz).with_realtime(true))
            as Box<dyn StreamSource>
    });

    Sources {
        waveform: Box::new(
            SimulatedSource::waveform(config.outputs, sample_rate_hz).with_realtime(true),
        ),
        spikes,
        sample_rate_hz,
        command: None,
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let outputs = match parse_bands(&cli.bands) {
        Ok(o) => o,
        Err(e) => {
            error!("--bands: {e}");
            std::process::exit(1);
        }
    };

    let channel = match parse_channel(&cli.channel) {
        Ok(c) => c,
        Err(e) => {
            error!("--channel: {e}");
            std::process::exit(1);
        }
    };

    let config = AcquireConfig {
        host: cli.host.clone(),
        command_port: cli.command_port,
        waveform_port: cli.waveform_port,
        spike_port: cli.spike_port,
        channel,
        outputs,
        spike_stream: cli.spikes,
        output_path: cli.output.clone(),
        duration_secs: cli.duration,
        read_buffer_size: cli.read_buffer,
        queue_capacity: cli.queue_capacity,
        stats_interval_secs: cli.stats_interval,
        settle_delay_ms: cli.settle_ms,
    };

    let sources = if cli.simulate {
        simulated(&config, cli.sim_rate)
    } else {
        match connect_controller(&config) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to prepare controller: {e}");
                std::process::exit(1);
            }
        }
    };

    let mut sink: Box<dyn AcquisitionSink> = match &config.output_path {
        Some(path) => match JsonLinesSink::create(path) {
            Ok(s) => Box::new(s),
            Err(e) => {
                error!("Failed to create {path:?}: {e}");
                std::process::exit(1);
            }
        },
        None => Box::new(NullSink),
    };

    // Выводим конфигурацию
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Source        : {}", if cli.simulate { "simulated" } else { config.host.as_str() });
    info!("  Channel       : {}", config.channel);
    info!("  Bands         : {}", config.outputs);
    info!("  Block size    : {} bytes", config.outputs.block_byte_size());
    info!("  Sample rate   : {:.0} Hz", sources.sample_rate_hz);
    info!("  Spike stream  : {}", if config.spike_stream { "on" } else { "off" });
    info!("  Output        : {:?}", config.output_path);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (pipeline, metrics) = AcquisitionPipeline::new(config);
    let stop_flag: Arc<AtomicBool> = pipeline.stop_flag();

    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C: принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received, draining streams...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    let Sources {
        waveform,
        spikes,
        sample_rate_hz,
        command,
    } = sources;

    let session_start = Instant::now();
    let result = pipeline.run(waveform, spikes, sample_rate_hz, sink.as_mut());

    if let Some(mut client) = command {
        if let Err(e) = client.set_run_mode(RunMode::Stop) {
            warn!("Failed to stop controller: {e}");
        }
    }

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            error!("Acquisition failed: {e}");
            std::process::exit(1);
        }
    };

    // --- Итоговая статистика ---
    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    if !report.warnings.is_empty() {
        warn!(
            "⚠ {} stream(s) ended with a partial unit; the controller was stopped mid-transfer",
            report.warnings.len()
        );
    }

    info!(
        "✓ Acquisition complete: {} blocks, {} spikes in {:.1}s",
        report.stats.blocks_decoded,
        report.stats.spikes_reported,
        report.elapsed.as_secs_f64()
    );
}
