//! Configuration types for catalog sources and analysis.
//!
//! - `ConnectionParams`: SQL Server connection settings
//! - `AnalysisConfig`: FK distribution analysis settings

mod analysis;
mod connection;

pub use analysis::{AnalysisConfig, CardinalityMode, MAX_CONCURRENCY};
pub use connection::{ConnectionParams, DEFAULT_PORT, EncryptMode, MAX_POOL_SIZE, parse_flag};
