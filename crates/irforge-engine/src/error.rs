//! Engine errors and internal worker control flow.

use thiserror::Error;

use crate::shared::MAX_DEPTH;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Width must be >= 2")]
    WidthTooSmall,
    #[error("Width must be <= 64")]
    WidthTooLarge,
    #[error("Cores must be >= 1")]
    CoresZero,
    #[error("NumFiles must be >= 1")]
    NumFilesZero,
    #[error("Seed can only be used with --fuzz")]
    SeedWithoutFuzz,
    #[error("Choices can only be used with --fuzz")]
    ChoicesWithoutFuzz,
    #[error("Choices must be a space-separated list of integers")]
    MalformedChoices,
    #[error("Promote width must be >= the base width")]
    PromoteTooNarrow,
    #[error("Promote width must be <= 128")]
    PromoteTooWide,
    #[error("choice oracle invoked with n = 0")]
    EmptyChoice,
    #[error("forced choice sequence exhausted after {0} tokens")]
    ChoicesExhausted(usize),
    #[error("replayed choice {token} is out of range for choose({n})")]
    ReplayOutOfRange { token: u64, n: u64 },
    #[error("exploration depth {0} exceeds the maximum of {MAX_DEPTH}")]
    DepthExceeded(usize),
    #[error("no argument of width {0} is available")]
    NoArgSlot(u32),
    #[error("short write to {path}: wrote {written} of {len} bytes")]
    ShortWrite {
        path: String,
        written: usize,
        len: usize,
    },
    #[error("verifier rejected a generated function: {0}")]
    Verify(#[from] irforge_ir::VerifyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("worker pool failure: {0}")]
    Pool(String),
}

/// Why a worker unwinds without producing a leaf. `DeadEnd` discards the
/// leaf silently; `Stopped` means the global stop flag is set (the error, if
/// any, is recorded in the shared state by `die`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abort {
    DeadEnd,
    Stopped,
}

pub(crate) type Gen<T> = Result<T, Abort>;
