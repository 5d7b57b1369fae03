use std::fmt;

use tracing::{debug, warn};

use crate::SortConfig;
use crate::device::Device;
use crate::error::{Result, SortError};
use crate::key::RadixKey;

/// Placement indices are 16-bit, so one group never sorts more than this.
pub const MAX_ELEMENTS: usize = u16::MAX as usize;
/// Slots a group may address, padding included.
pub const MAX_GROUP_SLOTS: usize = 1 << 16;
pub const MAX_RADIX: u32 = 8;

/// Where a launch keeps its counter table and exchange buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StorageStrategy {
    LocalMemory,
    GlobalBuffer,
}

impl StorageStrategy {
    pub fn label(self) -> &'static str {
        match self {
            Self::LocalMemory => "slm",
            Self::GlobalBuffer => "global",
        }
    }

    /// Variant index distinguishing the two compiled kernels.
    pub fn kernel_index(self) -> u8 {
        match self {
            Self::LocalMemory => 0,
            Self::GlobalBuffer => 1,
        }
    }
}

impl fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validated group shape for one key type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupGeometry {
    pub wg_size: usize,
    pub block_size: usize,
    pub radix: u32,
    pub bin_count: usize,
    pub end_bit: u32,
}

impl GroupGeometry {
    pub fn capacity(&self) -> usize {
        self.wg_size * self.block_size
    }

    /// One counter per (bucket, worker) plus the exclusive-scan seed.
    pub fn counter_count(&self) -> usize {
        self.wg_size * self.bin_count + 1
    }

    pub fn digit_mask(&self) -> u64 {
        (self.bin_count - 1) as u64
    }

    pub fn passes(&self) -> u32 {
        self.end_bit / self.radix
    }
}

pub fn check_config<K: RadixKey>(config: &SortConfig, device: &Device) -> Result<GroupGeometry> {
    let SortConfig {
        wg_size,
        block_size,
        radix,
        end_bit,
    } = *config;

    if wg_size == 0 || block_size == 0 || wg_size as usize * block_size as usize > MAX_GROUP_SLOTS {
        return Err(SortError::InvalidWorkGroup {
            wg_size,
            block_size,
        });
    }
    if wg_size > device.max_work_group_size() {
        return Err(SortError::WorkGroupTooLarge {
            wg_size,
            max: device.max_work_group_size(),
        });
    }
    if radix == 0 || radix > MAX_RADIX {
        return Err(SortError::InvalidRadix { radix });
    }

    let end_bit = end_bit.unwrap_or(K::BITS);
    if end_bit == 0 || end_bit > K::BITS || end_bit % radix != 0 {
        return Err(SortError::InvalidEndBit {
            end_bit,
            key_bits: K::BITS,
            radix,
        });
    }

    Ok(GroupGeometry {
        wg_size: wg_size as usize,
        block_size: block_size as usize,
        radix,
        bin_count: 1 << radix,
        end_bit,
    })
}

/// Capacity planner output for one launch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LaunchPlan {
    pub n: usize,
    pub n_uniform: usize,
    pub value_bytes: usize,
    pub counter_bytes: usize,
    pub local_mem_size: usize,
    pub strategy: StorageStrategy,
}

impl LaunchPlan {
    pub fn local_bytes_required(&self) -> usize {
        self.value_bytes + self.counter_bytes
    }
}

/// Smallest power of two that holds `n` elements.
#[inline]
pub fn uniform_size(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Chooses the storage tier for `n` values of `value_size` bytes.
///
/// Counters always have to fit in local memory for the fast path; values are
/// sized to `n` rounded up to a power of two.
pub fn plan(
    n: usize,
    value_size: usize,
    device: &Device,
    geometry: &GroupGeometry,
) -> Result<LaunchPlan> {
    if n > MAX_ELEMENTS {
        return Err(SortError::TooManyElements {
            len: n,
            max: MAX_ELEMENTS,
        });
    }
    if n > geometry.capacity() {
        return Err(SortError::ExceedsGroupCapacity {
            len: n,
            capacity: geometry.capacity(),
        });
    }

    let n_uniform = uniform_size(n);
    let value_bytes = n_uniform * value_size;
    let counter_bytes = geometry.counter_count() * size_of::<u32>();
    let local_mem_size = device.local_mem_size();

    let fits = counter_bytes <= local_mem_size && value_bytes <= local_mem_size - counter_bytes;
    let strategy = if fits {
        StorageStrategy::LocalMemory
    } else {
        StorageStrategy::GlobalBuffer
    };

    debug!(
        n,
        n_uniform,
        value_bytes,
        counter_bytes,
        local_mem_size,
        %strategy,
        "planned single-group radix sort"
    );
    if !fits {
        warn!(
            required = value_bytes + counter_bytes,
            local_mem_size, "local memory too small, falling back to global buffers"
        );
    }

    Ok(LaunchPlan {
        n,
        n_uniform,
        value_bytes,
        counter_bytes,
        local_mem_size,
        strategy,
    })
}
