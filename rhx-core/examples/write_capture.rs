//! Пример: запись синтетического захвата потока формы сигнала
//!
//! Демонстрирует:
//! - раскладку блока для выбранного набора полос
//! - кодирование блоков через encode_waveform_block
//! - запись сырых байт так, как их отдаёт порт 5001

use std::{fs::File, io::Write};

use rhx_core::{encode_waveform_block, BandSamples, ChannelOutputConfig, Frame, WaveformBlock};
use rhx_types::wire::{raw_to_seconds, FRAMES_PER_BLOCK, WAVEFORM_MAGIC};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = "rhx-core/test_capture.bin";
    let sample_rate_hz = 30_000.0;
    let config = ChannelOutputConfig::new(true, true, false)?;

    println!("Bands      : {config}");
    println!("Block size : {} bytes", config.block_byte_size());

    let mut file = File::create(output_path)?;

    for b in 0..10 {
        let frames = (0..FRAMES_PER_BLOCK)
            .map(|i| {
                let ts = (b * FRAMES_PER_BLOCK + i) as i32;
                let phase = ts as f64 * 2.0 * std::f64::consts::PI * 100.0 / sample_rate_hz;

                let mut samples = BandSamples::new();
                for band in config.field_order() {
                    samples.set(band, (32_768.0 + 5_000.0 * phase.sin()) as u16);
                }

                Frame {
                    timestamp_raw: ts,
                    timestamp_secs: raw_to_seconds(ts as i64, 1.0 / sample_rate_hz),
                    samples,
                }
            })
            .collect();

        let block = WaveformBlock {
            magic_number: WAVEFORM_MAGIC,
            frames,
        };
        file.write_all(&encode_waveform_block(&block, &config)?)?;
    }

    println!("✓ Wrote 10 blocks to {output_path}");

    Ok(())
}
