//! Client module - append path and stream reads
//!
//! - `append` takes a token, writes the entry, retries on conflict or stale epoch
//! - `read_stream` walks a stream backward over backpointers

mod append;
mod config;
mod stream;

pub use append::LogClient;
pub use config::ClientConfig;
