use std::{
    fs,
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::Receiver;
use rhx_acquire::{
    prepare_acquisition, AcquireConfig, AcquireError, AcquisitionPipeline, CommandClient,
    JsonLinesSink, RunMode, StreamSource, TcpStreamSource,
};
use rhx_core::{encode_spike_event, encode_waveform_block};
use rhx_types::{
    wire::{FRAMES_PER_BLOCK, SPIKE_MAGIC, WAVEFORM_MAGIC},
    BandSamples, ChannelName, ChannelOutputConfig, Frame, RhxError, SpikeEvent, StreamKind,
    WaveformBlock,
};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers: поддельный контроллер RHX на локальных сокетах
// ===========================================================================

struct FakeRhx {
    command: SocketAddr,
    waveform: SocketAddr,
    spike: SocketAddr,
    /// Журнал команд, полученных командным сервером
    log: JoinHandle<Vec<String>>,
}

/// Разбивает склеенный TCP текст на отдельные команды.
fn split_commands(text: &str) -> Vec<String> {
    let mut starts: Vec<usize> = ["get ", "set ", "execute "]
        .iter()
        .flat_map(|p| text.match_indices(p).map(|(i, _)| i))
        .collect();
    starts.sort_unstable();
    starts.push(text.len());

    starts
        .windows(2)
        .map(|w| text[w[0]..w[1]].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn reply_for(command: &str) -> Option<&'static str> {
    match command {
        "get uploadinprogress" => Some("Return: UploadInProgress False"),
        "get type" => Some("Return: Type ControllerRecordUSB3"),
        "get runmode" => Some("Return: RunMode Stop"),
        "get sampleratehertz" => Some("Return: SampleRateHertz 30000"),
        c if c.starts_with("get ") => Some("Error: Unrecognized parameter"),
        _ => None,
    }
}

fn serve_data(
    listener: TcpListener,
    start: Receiver<()>,
    payload: Vec<u8>,
    chunk: usize,
) {
    thread::spawn(move || {
        let Ok((mut sock, _)) = listener.accept() else {
            return;
        };
        if start.recv_timeout(Duration::from_secs(5)).is_err() {
            return;
        }
        for part in payload.chunks(chunk) {
            if sock.write_all(part).is_err() {
                return;
            }
        }
    });
}

fn spawn_fake_rhx(
    waveform_payload: Vec<u8>,
    spike_payload: Vec<u8>,
) -> FakeRhx {
    let cmd_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let wf_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let sp_listener = TcpListener::bind("127.0.0.1:0").unwrap();

    let command = cmd_listener.local_addr().unwrap();
    let waveform = wf_listener.local_addr().unwrap();
    let spike = sp_listener.local_addr().unwrap();

    let (start_tx, start_rx) = crossbeam_channel::bounded::<()>(2);

    // Нарочно некратные размерам юнитов куски.
    serve_data(wf_listener, start_rx.clone(), waveform_payload, 1_000);
    serve_data(sp_listener, start_rx, spike_payload, 9);

    let log = thread::spawn(move || {
        let (mut sock, _) = cmd_listener.accept().unwrap();
        let mut log = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = match sock.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };

            for cmd in split_commands(&String::from_utf8_lossy(&buf[..n])) {
                if let Some(reply) = reply_for(&cmd) {
                    sock.write_all(reply.as_bytes()).unwrap();
                }
                if cmd == "set runmode run" {
                    let _ = start_tx.send(());
                    let _ = start_tx.send(());
                }
                log.push(cmd);
            }
        }

        log
    });

    FakeRhx {
        command,
        waveform,
        spike,
        log,
    }
}

fn blocks(
    config: &ChannelOutputConfig,
    n: usize,
) -> Vec<u8> {
    (0..n)
        .flat_map(|b| {
            let frames = (0..FRAMES_PER_BLOCK)
                .map(|i| {
                    let mut samples = BandSamples::new();
                    for band in config.field_order() {
                        samples.set(band, 32_768 + i as u16);
                    }
                    Frame {
                        timestamp_raw: (b * FRAMES_PER_BLOCK + i) as i32,
                        timestamp_secs: 0.0,
                        samples,
                    }
                })
                .collect();

            encode_waveform_block(
                &WaveformBlock {
                    magic_number: WAVEFORM_MAGIC,
                    frames,
                },
                config,
            )
            .unwrap()
        })
        .collect()
}

fn spikes(unit_ids: &[u8]) -> Vec<u8> {
    unit_ids
        .iter()
        .enumerate()
        .flat_map(|(i, &unit_id)| {
            encode_spike_event(&SpikeEvent {
                magic_number: SPIKE_MAGIC,
                channel_name: ChannelName::new("A-010").unwrap(),
                timestamp_raw: i as u32 * 300,
                unit_id,
            })
        })
        .collect()
}

fn test_config(outputs: ChannelOutputConfig) -> AcquireConfig {
    AcquireConfig {
        outputs,
        spike_stream: true,
        duration_secs: Some(10), // страховка от зависания
        queue_capacity: 4,
        stats_interval_secs: 60,
        settle_delay_ms: 10,
        ..AcquireConfig::default()
    }
}

/// Повторяет последовательность CLI: подготовка, подключение, запуск.
fn connect(
    rhx: &FakeRhx,
    config: &AcquireConfig,
) -> (
    CommandClient<TcpStream>,
    f64,
    Box<dyn StreamSource>,
    Box<dyn StreamSource>,
) {
    let stream = TcpStream::connect(rhx.command).unwrap();
    stream.set_nodelay(true).unwrap();
    let mut client = CommandClient::new(stream).with_settle_delay(config.settle_delay());

    let rate = prepare_acquisition(&mut client, &config.channel, &config.outputs).unwrap();

    let wf = TcpStreamSource::connect(rhx.waveform, StreamKind::Waveform, 4_096).unwrap();
    let sp = TcpStreamSource::connect(rhx.spike, StreamKind::Spike, 64).unwrap();

    client.set_run_mode(RunMode::Run).unwrap();

    (client, rate, Box::new(wf), Box::new(sp))
}

// ===========================================================================
// Сквозные сценарии
// ===========================================================================

#[test]
fn test_end_to_end_json_lines() {
    let outputs = ChannelOutputConfig::new(true, false, true).unwrap();
    let unit_ids = [0, 1, 0, 0, 2, 3, 0];
    let rhx = spawn_fake_rhx(blocks(&outputs, 10), spikes(&unit_ids));
    let config = test_config(outputs);

    let (client, rate, wf, sp) = connect(&rhx, &config);
    assert_eq!(rate, 30_000.0);

    let tmp = NamedTempFile::new().unwrap();
    let mut sink = JsonLinesSink::create(tmp.path()).unwrap();

    let (pipeline, metrics) = AcquisitionPipeline::new(config);
    let report = pipeline.run(wf, Some(sp), rate, &mut sink).unwrap();

    assert_eq!(report.stats.blocks_decoded, 10);
    assert_eq!(report.stats.spike_chunks_decoded, 7);
    assert_eq!(report.stats.spikes_reported, 3);
    assert!(report.warnings.is_empty());
    assert_eq!(metrics.bytes_received(), (10 * 1_028 + 7 * 14) as u64);

    drop(sink);
    let text = fs::read_to_string(tmp.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 10 * FRAMES_PER_BLOCK + 3);

    let spike_lines: Vec<serde_json::Value> = lines
        .iter()
        .filter(|l| l.contains("\"type\":\"spike\""))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(spike_lines.len(), 3);
    assert_eq!(spike_lines[0]["channel"], "A-010");
    assert_eq!(spike_lines[0]["unit_id"], 1);
    assert!((spike_lines[0]["timestamp"].as_f64().unwrap() - 0.01).abs() < 1e-12);

    drop(client);
    let log = rhx.log.join().unwrap();
    assert_eq!(
        log,
        vec![
            "get uploadinprogress",
            "get runmode",
            "get sampleratehertz",
            "execute clearalldataoutputs",
            "set a-010.tcpdataoutputenabled true",
            "set a-010.tcpdataoutputenabledspike true",
            "set runmode run",
        ]
    );
}

#[test]
fn test_end_to_end_truncated_transfer() {
    let outputs = ChannelOutputConfig::wideband_only();
    let mut payload = blocks(&outputs, 2);
    payload.extend_from_slice(&blocks(&outputs, 1)[..100]);

    let rhx = spawn_fake_rhx(payload, spikes(&[5]));
    let config = test_config(outputs);
    let (_client, rate, wf, sp) = connect(&rhx, &config);

    let (pipeline, _) = AcquisitionPipeline::new(config);
    let report = pipeline
        .run(wf, Some(sp), rate, &mut rhx_acquire::NullSink)
        .unwrap();

    assert_eq!(report.stats.blocks_decoded, 2);
    assert_eq!(report.stats.spikes_reported, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].stream, StreamKind::Waveform);
    assert_eq!(report.warnings[0].len(), 100);
    assert_eq!(report.warnings[0].stream_offset, 2 * 772);
}

#[test]
fn test_end_to_end_corrupted_block() {
    let outputs = ChannelOutputConfig::wideband_only();
    let mut payload = blocks(&outputs, 3);
    payload[772] = 0x00;

    let rhx = spawn_fake_rhx(payload, Vec::new());
    let config = test_config(outputs);
    let (_client, rate, wf, sp) = connect(&rhx, &config);

    let (pipeline, _) = AcquisitionPipeline::new(config);
    let err = pipeline
        .run(wf, Some(sp), rate, &mut rhx_acquire::NullSink)
        .unwrap_err();

    match err {
        AcquireError::Decode {
            stream: StreamKind::Waveform,
            source: RhxError::BadMagicNumber { offset, found, .. },
        } => {
            assert_eq!(offset, 772);
            assert_ne!(found, WAVEFORM_MAGIC);
        }
        other => panic!("expected waveform decode error, got {other:?}"),
    }
}

#[test]
fn test_split_commands() {
    assert_eq!(
        split_commands("set runmode stopget sampleratehertz"),
        vec!["set runmode stop", "get sampleratehertz"]
    );
    assert_eq!(
        split_commands("execute clearalldataoutputsset a-010.tcpdataoutputenabled true"),
        vec![
            "execute clearalldataoutputs",
            "set a-010.tcpdataoutputenabled true"
        ]
    );
}
