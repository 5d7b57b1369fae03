//! Per-pass counting and group-wide scan.
//!
//! The counter table is bucket-major: worker `w`'s counter for bucket `b`
//! lives at `b * wg_size + w`. An exclusive scan over the flat table therefore
//! yields, for every (bucket, worker) pair, the number of elements that sort
//! in front of that worker's first element of that bucket. Slot
//! `wg_size * bin_count` only receives the grand total.

use crate::group::{SharedSlots, WorkItem};
use crate::kernel::Registers;
use crate::key::{RadixKey, get_bucket, order_preserving_cast};
use crate::planner::GroupGeometry;

/// Counting phase: zero this worker's counters, then read-then-increment the
/// counter of each register's bucket, keeping the pre-increment value as the
/// local offset. Ends on a barrier.
pub(crate) fn count<T, K, P>(
    item: &WorkItem<'_>,
    counters: &SharedSlots<u32>,
    regs: &mut Registers<T>,
    key_of: &P,
    ascending: bool,
    begin_bit: u32,
    geometry: &GroupGeometry,
) where
    K: RadixKey,
    P: Fn(&T) -> K,
{
    let wi = item.local_id();
    let wg_size = geometry.wg_size;
    debug_assert_eq!(item.group_size(), wg_size);
    let mask = geometry.digit_mask();

    // Column `wi` of the table belongs to this worker until the barrier.
    for bin in 0..geometry.bin_count {
        unsafe { counters.write(bin * wg_size + wi, 0) };
    }

    let Registers {
        vals,
        indices,
        slots,
        ..
    } = regs;
    for ((val, index), slot) in vals.iter().zip(indices.iter_mut()).zip(slots.iter_mut()) {
        let bits = order_preserving_cast(key_of(val), ascending);
        let counter = get_bucket(bits, begin_bit, mask) * wg_size + wi;
        let local = unsafe { counters.read(counter) };
        unsafe { counters.write(counter, local + 1) };
        *slot = counter;
        *index = local as u16;
    }

    item.barrier();
}

/// Scan phase: turns raw counts into exclusive placement starts and adds them
/// to every register's local offset. Ends on a barrier.
pub(crate) fn scan<T>(
    item: &WorkItem<'_>,
    counters: &SharedSlots<u32>,
    regs: &mut Registers<T>,
    geometry: &GroupGeometry,
) {
    let wi = item.local_id();
    let bin_count = geometry.bin_count;
    let chunk = wi * bin_count;

    // Inclusive scan of this worker's contiguous chunk of the table.
    let mut running = 0_u32;
    for (i, sum) in regs.bin_sum.iter_mut().enumerate() {
        running += unsafe { counters.read(chunk + i) };
        *sum = running;
    }
    item.barrier();

    let base = item.exclusive_scan_over_group(running);

    // Shifted one slot right: the inclusive sum of slot i is the exclusive start of slot i + 1.
    for (i, &sum) in regs.bin_sum.iter().enumerate() {
        unsafe { counters.write(chunk + i + 1, base + sum) };
    }
    if wi == 0 {
        unsafe { counters.write(0, 0) };
    }
    item.barrier();

    for (index, &slot) in regs.indices.iter_mut().zip(&regs.slots) {
        let start = unsafe { counters.read(slot) };
        let placed = *index as u32 + start;
        debug_assert!(placed <= u16::MAX as u32);
        *index = placed as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{GlobalRange, launch};
    use crate::key::width_mask;
    use crate::{block, planner};

    /// Ranks produced by one digit pass, in input order.
    fn ranks(keys: &mut [u32], wg_size: usize, block_size: usize, radix: u32, begin_bit: u32, ascending: bool) -> Vec<u16> {
        let n = keys.len();
        let geometry = planner::GroupGeometry {
            wg_size,
            block_size,
            radix,
            bin_count: 1 << radix,
            end_bit: 32,
        };
        let counters = SharedSlots::<u32>::new_uninit(geometry.counter_count());
        let out = SharedSlots::<u16>::new_uninit(n);
        let src = GlobalRange::new(keys);

        launch(wg_size, |item| {
            let mut regs = Registers::new(block_size, geometry.bin_count);
            block::load(&src, &mut regs, item.local_id(), block_size, n, None);
            item.barrier();
            count(item, &counters, &mut regs, &|k: &u32| *k, ascending, begin_bit, &geometry);
            scan(item, &counters, &mut regs, &geometry);
            for (i, &r) in regs.indices.iter().enumerate() {
                unsafe { out.write(item.local_id() * block_size + i, r) };
            }
        })
        .unwrap();

        (0..n).map(|i| unsafe { out.read(i) }).collect()
    }

    /// Stable counting-sort ranks for the same digit.
    fn expected_ranks(keys: &[u32], radix: u32, begin_bit: u32, ascending: bool) -> Vec<u16> {
        let digit = |k: u32| {
            let bits = order_preserving_cast(k, ascending) & width_mask(32);
            get_bucket(bits, begin_bit, (1 << radix) - 1)
        };
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by_key(|&i| digit(keys[i]));
        let mut ranks = vec![0_u16; keys.len()];
        for (rank, &i) in order.iter().enumerate() {
            ranks[i] = rank as u16;
        }
        ranks
    }

    #[test]
    fn single_pass_ranks_are_stable() {
        let mut keys: Vec<u32> = vec![3, 1, 2, 1, 0, 3, 3, 2, 0, 1, 15, 14, 2];
        let expected = expected_ranks(&keys, 4, 0, true);
        assert_eq!(ranks(&mut keys, 4, 4, 4, 0, true), expected);
    }

    #[test]
    fn ranks_for_higher_digits_and_descending() {
        let mut keys: Vec<u32> = (0..61_u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        for begin_bit in [0, 8, 24] {
            for ascending in [true, false] {
                let expected = expected_ranks(&keys, 8, begin_bit, ascending);
                assert_eq!(ranks(&mut keys, 8, 8, 8, begin_bit, ascending), expected);
            }
        }
    }

    #[test]
    fn ranks_are_a_bijection() {
        let mut keys: Vec<u32> = (0..100_u32).map(|i| (i * 37) % 5).collect();
        let mut r = ranks(&mut keys, 16, 7, 2, 0, true);
        r.sort_unstable();
        assert!(r.iter().enumerate().all(|(i, &x)| x as usize == i));
    }
}
