//! Пример: разбор сохранённого захвата потока формы сигнала
//!
//! Демонстрирует:
//! - чтение файла кусками произвольной длины, как из сокета
//! - сборку блоков через AcquisitionSession
//! - предупреждение о неполном хвосте при close()

use std::{fs::File, io::Read};

use rhx_core::{AcquisitionSession, Band, ChannelOutputConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = "rhx-core/test_capture.bin";
    let config = ChannelOutputConfig::new(true, true, false)?;
    let mut session = AcquisitionSession::new(config, 30_000.0)?;

    let mut file = File::open(input_path)?;
    // Нарочно не кратно размеру блока.
    let mut buf = [0u8; 1_000];
    let mut blocks = Vec::new();

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for block in session.feed_waveform(&buf[..n]) {
            blocks.push(block?);
        }
    }

    println!("✓ Decoded {} blocks", blocks.len());

    for (i, block) in blocks.iter().take(3).enumerate() {
        let peak = block
            .microvolts(Band::Wideband)
            .fold(0.0f64, |acc, uv| acc.max(uv.abs()));
        println!(
            "  [{i}] t0={:?} ({:.4} s), peak {:.1} uV",
            block.first_timestamp(),
            block.frames[0].timestamp_secs,
            peak
        );
    }

    for warning in session.close() {
        println!("✗ {warning}");
    }

    Ok(())
}
