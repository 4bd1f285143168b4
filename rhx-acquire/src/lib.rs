//! Клиент Intan RHX: командный канал, потоки чтения, пайплайн декодирования
//! и запись результатов.

pub mod command;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod transport;

pub use command::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use output::*;
pub use pipeline::*;
pub use transport::*;
