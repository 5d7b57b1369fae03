use thiserror::Error;

/// Dispatch-time failures. Once a group is launched the sort cannot fail.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("input has {len} elements, the single-group sort handles at most {max}")]
    TooManyElements { len: usize, max: usize },

    #[error("input has {len} elements but the work-group only holds {capacity}")]
    ExceedsGroupCapacity { len: usize, capacity: usize },

    #[error("work-group size {wg_size} exceeds the device limit of {max}")]
    WorkGroupTooLarge { wg_size: u16, max: u16 },

    #[error("invalid work-group shape: {wg_size} workers x {block_size} slots")]
    InvalidWorkGroup { wg_size: u16, block_size: u16 },

    #[error("radix must be in [1, 8] bits, got {radix}")]
    InvalidRadix { radix: u32 },

    #[error("end bit {end_bit} must be a non-zero multiple of radix {radix} and at most {key_bits}")]
    InvalidEndBit {
        end_bit: u32,
        key_bits: u32,
        radix: u32,
    },

    #[error("failed to spawn work-group worker: {0}")]
    Launch(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SortError>;
