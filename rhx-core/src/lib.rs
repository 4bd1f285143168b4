//! Декодер бинарных TCP потоков Intan RHX
//!
//! Превращает байтовый поток без границ сообщений в последовательность
//! блоков формы сигнала и спайк-событий. Раскладка кадра определяется
//! включёнными полосами ([`ChannelOutputConfig`]), а не константой.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use rhx_core::{AcquisitionSession, ChannelOutputConfig};
//! use std::io::Read;
//! use std::net::TcpStream;
//!
//! let config = ChannelOutputConfig::wideband_only();
//! let mut session = AcquisitionSession::new(config, 30_000.0)?;
//!
//! let mut socket = TcpStream::connect("127.0.0.1:5001")?;
//! let mut buf = vec![0u8; 64 * 1024];
//! loop {
//!     let n = socket.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     for block in session.feed_waveform(&buf[..n]) {
//!         let block = block?;
//!         println!("t0 = {:?}", block.first_timestamp());
//!     }
//! }
//!
//! for warning in session.close() {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod reassembly;
pub mod session;
pub mod spike;
pub mod waveform;

pub use binary::ByteCursor;
pub use reassembly::{CompleteUnits, StreamReassembler};
pub use rhx_types::{
    Band, BandSamples, ChannelName, ChannelOutputConfig, Frame, RhxError, RhxResult, Spike,
    SpikeEvent, StreamKind, TruncatedStreamWarning, WaveformBlock,
};
pub use session::{AcquisitionSession, SessionStats, Spikes, WaveformBlocks};
pub use spike::{encode_spike_event, SpikeEventDecoder};
pub use waveform::{decode_waveform_block, encode_waveform_block, WaveformBlockDecoder};

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
