use thiserror::Error;

/// Result type local to qexec-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient buffers: {per_join} per join ({total} total over {joins} joins), at least {min} required")]
    InsufficientBuffers {
        total: usize,
        joins: usize,
        per_join: usize,
        min: usize,
    },

    #[error("page window full ({capacity} pages)")]
    WindowFull { capacity: usize },

    #[error("spill storage error: {0}")]
    Storage(String),

    #[error("unsupported codec: {0}")]
    CodecUnsupported(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch in {0}")]
    ChecksumMismatch(String),

    #[error("page {index} out of range for run {run} ({pages} pages)")]
    PageOutOfRange {
        run: String,
        index: usize,
        pages: usize,
    },
}
