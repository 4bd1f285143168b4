use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rhx_core::{
    encode_spike_event, encode_waveform_block, AcquisitionSession, BandSamples, ChannelName,
    ChannelOutputConfig, Frame, SpikeEvent, SpikeEventDecoder, WaveformBlock,
    WaveformBlockDecoder,
};
use rhx_types::wire::{FRAMES_PER_BLOCK, SPIKE_MAGIC, WAVEFORM_MAGIC};

const FS: f64 = 30_000.0;
const BLOCKS: usize = 256;

/// Синусоида 1 кГц во всех включённых полосах.
fn capture(
    config: &ChannelOutputConfig,
    blocks: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(blocks * config.block_byte_size());

    for b in 0..blocks {
        let frames = (0..FRAMES_PER_BLOCK)
            .map(|i| {
                let t = (b * FRAMES_PER_BLOCK + i) as i32;
                let raw = 32_768.0 + 4_000.0 * (t as f64 * 1_000.0 / FS).sin();
                let mut samples = BandSamples::new();
                for band in config.field_order() {
                    samples.set(band, raw as u16);
                }
                Frame {
                    timestamp_raw: t,
                    timestamp_secs: 0.0,
                    samples,
                }
            })
            .collect();

        let block = WaveformBlock {
            magic_number: WAVEFORM_MAGIC,
            frames,
        };
        if let Ok(bytes) = encode_waveform_block(&block, config) {
            out.extend_from_slice(&bytes);
        }
    }

    out
}

fn layouts() -> [(&'static str, ChannelOutputConfig); 3] {
    [
        ("wide", ChannelOutputConfig::wideband_only()),
        (
            "wide+high",
            ChannelOutputConfig::new(true, true, false).unwrap(),
        ),
        (
            "wide+high+spike",
            ChannelOutputConfig::new(true, true, true).unwrap(),
        ),
    ]
}

/// Нарезка как у сокета: куски случайного размера.
fn split_points(
    len: usize,
    max_chunk: usize,
) -> Vec<(usize, usize)> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut parts = Vec::new();
    let mut pos = 0;

    while pos < len {
        let end = (pos + rng.gen_range(1..=max_chunk)).min(len);
        parts.push((pos, end));
        pos = end;
    }

    parts
}

fn bench_block_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("waveform_block_decode");

    for (name, config) in layouts() {
        let bytes = capture(&config, 1);
        let decoder = WaveformBlockDecoder::new(config, FS).unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| black_box(decoder.decode(black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

fn bench_session_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_feed_waveform");

    for (name, config) in layouts() {
        let bytes = capture(&config, BLOCKS);
        let parts = split_points(bytes.len(), 16 * 1024);

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| {
                let mut session = AcquisitionSession::new(config, FS).unwrap();
                let mut frames = 0usize;
                for &(start, end) in &parts {
                    for block in session.feed_waveform(&bytes[start..end]) {
                        frames += block.unwrap().len();
                    }
                }
                black_box(session.close());
                frames
            });
        });
    }

    group.finish();
}

fn bench_spike_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("spike_decode");

    let name = ChannelName::new("A-010").unwrap();
    let bytes: Vec<u8> = (0..4_096u32)
        .flat_map(|i| {
            encode_spike_event(&SpikeEvent {
                magic_number: SPIKE_MAGIC,
                channel_name: name,
                timestamp_raw: i * 30,
                unit_id: (i % 4) as u8,
            })
        })
        .collect();

    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("chunk", |b| {
        let decoder = SpikeEventDecoder::new();
        b.iter(|| black_box(decoder.decode(black_box(&bytes[..14])).unwrap()));
    });

    group.bench_function("session_4096_chunks", |b| {
        let parts = split_points(bytes.len(), 1_500);
        b.iter(|| {
            let mut session =
                AcquisitionSession::new(ChannelOutputConfig::wideband_only(), FS).unwrap();
            let mut spikes = 0usize;
            for &(start, end) in &parts {
                spikes += session.feed_spikes(&bytes[start..end]).count();
            }
            spikes
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_block_decode,
    bench_session_feed,
    bench_spike_decode
);
criterion_main!(benches);
