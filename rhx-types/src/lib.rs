pub mod band;
pub mod config;
pub mod error;
pub mod spike;
pub mod stream;
pub mod waveform;
pub mod wire;

pub use band::*;
pub use config::*;
pub use error::*;
pub use spike::*;
pub use stream::*;
pub use waveform::*;
pub use wire::*;
