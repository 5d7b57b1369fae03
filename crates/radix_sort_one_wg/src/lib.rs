//! Stable LSD radix sort run by a single cooperating work-group.
//!
//! A group of `wg_size` workers each owns `block_size` consecutive slots of the
//! input. Every digit pass counts per-worker bucket occurrences into a shared
//! counter table, scans it across the group and relays the elements through a
//! shared exchange buffer; the last pass writes them straight back into the
//! caller's slice. Inputs are limited to 65535 elements.

mod block;
mod device;
mod error;
mod exchange;
mod group;
mod histogram;
mod kernel;
mod key;
mod planner;
mod storage;

pub use device::{DEFAULT_LOCAL_MEM_SIZE, DEFAULT_MAX_WORK_GROUP_SIZE, Device};
pub use error::{Result, SortError};
pub use kernel::{KERNEL_BASE_NAME, KernelName};
pub use key::{RadixKey, sentinel};
pub use planner::{
    GroupGeometry, LaunchPlan, MAX_ELEMENTS, MAX_GROUP_SLOTS, MAX_RADIX, StorageStrategy,
    check_config, plan, uniform_size,
};

/// Shape of the launched group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SortConfig {
    /// Workers per group, at most the device limit.
    pub wg_size: u16,
    /// Slots per worker. `wg_size * block_size` bounds the input length.
    pub block_size: u16,
    /// Bits per digit pass.
    pub radix: u32,
    /// Sort by the low `end_bit` transformed key bits; `None` is the full key.
    pub end_bit: Option<u32>,
}

pub const DEFAULT_CONFIG: SortConfig = SortConfig {
    wg_size: 256,
    block_size: 16,
    radix: 4,
    end_bit: None,
};

impl Default for SortConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

impl SortConfig {
    pub const fn capacity(&self) -> usize {
        self.wg_size as usize * self.block_size as usize
    }

    /// [`DEFAULT_CONFIG`] with blocks grown until the group holds `len`
    /// elements, up to [`MAX_GROUP_SLOTS`].
    pub const fn for_len(len: usize) -> Self {
        let wg_size = DEFAULT_CONFIG.wg_size as usize;
        let mut block_size = len.div_ceil(wg_size);
        if block_size < DEFAULT_CONFIG.block_size as usize {
            block_size = DEFAULT_CONFIG.block_size as usize;
        } else if block_size > MAX_GROUP_SLOTS / wg_size {
            block_size = MAX_GROUP_SLOTS / wg_size;
        }
        Self {
            block_size: block_size as u16,
            ..DEFAULT_CONFIG
        }
    }
}

/// Sorts keys in place with a group sized by [`SortConfig::for_len`].
pub fn sort_one_group<K: RadixKey>(device: &Device, data: &mut [K], ascending: bool) -> Result<()> {
    let config = SortConfig::for_len(data.len());
    sort_one_group_with_config(device, data, ascending, &config)
}

pub fn sort_one_group_with_config<K: RadixKey>(
    device: &Device,
    data: &mut [K],
    ascending: bool,
    config: &SortConfig,
) -> Result<()> {
    kernel::dispatch(
        device,
        data,
        |key: &K| *key,
        Some(sentinel::<K>(ascending)),
        ascending,
        config,
    )
}

/// Sorts elements in place by a projected key with a group sized by
/// [`SortConfig::for_len`]. Equal keys keep their input order.
pub fn sort_one_group_by_key<T, K, F>(
    device: &Device,
    data: &mut [T],
    key_of: F,
    ascending: bool,
) -> Result<()>
where
    T: Copy + Send + Sync,
    K: RadixKey,
    F: Fn(&T) -> K + Sync,
{
    let config = SortConfig::for_len(data.len());
    sort_one_group_by_key_with_config(device, data, key_of, ascending, &config)
}

pub fn sort_one_group_by_key_with_config<T, K, F>(
    device: &Device,
    data: &mut [T],
    key_of: F,
    ascending: bool,
    config: &SortConfig,
) -> Result<()>
where
    T: Copy + Send + Sync,
    K: RadixKey,
    F: Fn(&T) -> K + Sync,
{
    kernel::dispatch(device, data, key_of, None, ascending, config)
}
