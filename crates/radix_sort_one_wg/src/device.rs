use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

pub const DEFAULT_LOCAL_MEM_SIZE: usize = 64 * 1024;
pub const DEFAULT_MAX_WORK_GROUP_SIZE: u16 = 1024;

/// Execution context a group is launched on.
///
/// `local_mem_size` is the fast group-shared memory budget the planner sizes
/// against. Fallback buffers are accounted in a global pool and returned to it
/// when the launch that took them completes.
#[derive(Debug)]
pub struct Device {
    local_mem_size: usize,
    max_work_group_size: u16,
    global_in_use: AtomicUsize,
}

impl Default for Device {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_MEM_SIZE, DEFAULT_MAX_WORK_GROUP_SIZE)
    }
}

impl Device {
    pub fn new(local_mem_size: usize, max_work_group_size: u16) -> Self {
        Self {
            local_mem_size,
            max_work_group_size,
            global_in_use: AtomicUsize::new(0),
        }
    }

    pub fn with_local_mem_size(mut self, bytes: usize) -> Self {
        self.local_mem_size = bytes;
        self
    }

    pub fn with_max_work_group_size(mut self, size: u16) -> Self {
        self.max_work_group_size = size;
        self
    }

    pub fn local_mem_size(&self) -> usize {
        self.local_mem_size
    }

    pub fn max_work_group_size(&self) -> u16 {
        self.max_work_group_size
    }

    /// Bytes currently held by fallback buffers of in-flight launches.
    pub fn global_bytes_in_use(&self) -> usize {
        self.global_in_use.load(Ordering::Acquire)
    }

    pub(crate) fn reserve_global(&self, bytes: usize) -> GlobalReservation<'_> {
        let total = self.global_in_use.fetch_add(bytes, Ordering::AcqRel) + bytes;
        trace!(bytes, total, "global buffer reserved");
        GlobalReservation {
            device: self,
            bytes,
        }
    }
}

/// Global-pool accounting for one fallback buffer; released on drop.
#[derive(Debug)]
pub(crate) struct GlobalReservation<'d> {
    device: &'d Device,
    bytes: usize,
}

impl Drop for GlobalReservation<'_> {
    fn drop(&mut self) {
        self.device
            .global_in_use
            .fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let device = Device::default();
        assert_eq!(device.local_mem_size(), DEFAULT_LOCAL_MEM_SIZE);
        assert_eq!(device.max_work_group_size(), DEFAULT_MAX_WORK_GROUP_SIZE);
        assert_eq!(device.global_bytes_in_use(), 0);

        let device = device.with_local_mem_size(1024).with_max_work_group_size(64);
        assert_eq!(device.local_mem_size(), 1024);
        assert_eq!(device.max_work_group_size(), 64);
    }

    #[test]
    fn reservations_are_released_on_drop() {
        let device = Device::default();
        let a = device.reserve_global(128);
        {
            let _b = device.reserve_global(64);
            assert_eq!(device.global_bytes_in_use(), 192);
        }
        assert_eq!(device.global_bytes_in_use(), 128);
        drop(a);
        assert_eq!(device.global_bytes_in_use(), 0);
    }
}
