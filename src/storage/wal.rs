use thiserror::Error;

use crate::common::types::Lsn;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Log flush failed: {0}")]
    FlushFailed(String),
}

/// Write-ahead log sink
///
/// The buffer pool calls `flush_till_lsn` with a page's LSN before writing
/// that page back, so no page reaches disk ahead of its log records. Log
/// record formats and recovery live outside this crate.
pub trait LogManager: Send + Sync {
    fn flush_till_lsn(&self, lsn: Lsn) -> Result<(), LogError>;
}
