use crate::group::{SharedSlots, WorkItem};
use crate::kernel::Registers;

/// Reorder phase: scatter registers to their placement indices, wait for the
/// whole group, then gather this worker's block back.
///
/// Afterwards the registers hold the elements in the order of the pass just
/// ranked. The caller must barrier before the buffer is scattered into again.
pub(crate) fn to_blocked<T: Copy>(
    item: &WorkItem<'_>,
    exchange: &SharedSlots<T>,
    regs: &mut Registers<T>,
    block_size: usize,
) {
    for (&val, &idx) in regs.vals.iter().zip(&regs.indices) {
        // Placement indices are unique across the group.
        unsafe { exchange.write(idx as usize, val) };
    }

    item.barrier();

    // Workers whose block starts past `n` hold nothing in a non-uniform space.
    let begin = item.local_id() * block_size;
    debug_assert!(regs.vals.is_empty() || begin + regs.vals.len() <= exchange.len());
    for (i, val) in regs.vals.iter_mut().enumerate() {
        *val = unsafe { exchange.read(begin + i) };
    }
}
