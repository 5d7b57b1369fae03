//! Scratch storage tiers. The kernel is generic over the tier, so the
//! local-memory and global-buffer variants are separate instantiations.

use std::ops::Deref;

use crate::device::{Device, GlobalReservation};
use crate::group::SharedSlots;
use crate::planner::StorageStrategy;

pub(crate) trait ScratchTier {
    const STRATEGY: StorageStrategy;

    fn allocate<T: Copy>(device: &Device, len: usize) -> Scratch<'_, T>;
}

/// Group-local scratch: lives only inside the launch, budgeted by the planner.
pub(crate) struct LocalTier;

/// Fallback scratch taken from the device's global pool.
pub(crate) struct GlobalTier;

impl ScratchTier for LocalTier {
    const STRATEGY: StorageStrategy = StorageStrategy::LocalMemory;

    fn allocate<T: Copy>(_device: &Device, len: usize) -> Scratch<'_, T> {
        Scratch {
            slots: SharedSlots::new_uninit(len),
            _reservation: None,
        }
    }
}

impl ScratchTier for GlobalTier {
    const STRATEGY: StorageStrategy = StorageStrategy::GlobalBuffer;

    fn allocate<T: Copy>(device: &Device, len: usize) -> Scratch<'_, T> {
        let reservation = device.reserve_global(len * size_of::<T>());
        Scratch {
            slots: SharedSlots::new_uninit(len),
            _reservation: Some(reservation),
        }
    }
}

pub(crate) struct Scratch<'d, T> {
    slots: SharedSlots<T>,
    _reservation: Option<GlobalReservation<'d>>,
}

impl<T> Deref for Scratch<'_, T> {
    type Target = SharedSlots<T>;

    fn deref(&self) -> &Self::Target {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_tier_is_accounted() {
        let device = Device::default();
        {
            let values = GlobalTier::allocate::<u64>(&device, 100);
            let counters = GlobalTier::allocate::<u32>(&device, 17);
            assert_eq!(values.len(), 100);
            assert_eq!(counters.len(), 17);
            assert_eq!(device.global_bytes_in_use(), 800 + 68);
        }
        assert_eq!(device.global_bytes_in_use(), 0);
    }

    #[test]
    fn local_tier_leaves_global_pool_alone() {
        let device = Device::default();
        let values = LocalTier::allocate::<u64>(&device, 100);
        assert_eq!(values.len(), 100);
        assert_eq!(device.global_bytes_in_use(), 0);
        assert_eq!(LocalTier::STRATEGY, StorageStrategy::LocalMemory);
        assert_eq!(GlobalTier::STRATEGY, StorageStrategy::GlobalBuffer);
    }
}
