use std::fmt;

use tracing::{Span, debug_span, trace};

use crate::SortConfig;
use crate::device::Device;
use crate::error::Result;
use crate::group::{GlobalRange, SharedSlots, WorkItem, launch};
use crate::key::RadixKey;
use crate::planner::{self, GroupGeometry, StorageStrategy};
use crate::storage::{GlobalTier, LocalTier, ScratchTier};
use crate::{block, exchange, histogram};

pub const KERNEL_BASE_NAME: &str = "radix_sort_one_wg";

/// Label of one compiled kernel variant. The local-memory and global-buffer
/// kernels get distinct names.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct KernelName {
    base: &'static str,
    strategy: StorageStrategy,
}

impl KernelName {
    pub fn new(base: &'static str, strategy: StorageStrategy) -> Self {
        Self { base, strategy }
    }

    pub fn index(&self) -> u8 {
        self.strategy.kernel_index()
    }
}

impl fmt::Display for KernelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}:{}>", self.base, self.index(), self.strategy.label())
    }
}

/// Per-worker private state: the block being sorted plus the ranks of the
/// current pass.
pub(crate) struct Registers<T> {
    pub(crate) vals: Vec<T>,
    /// Local offset after counting, placement index after scanning.
    pub(crate) indices: Vec<u16>,
    /// Counter-table slot each register was counted in.
    pub(crate) slots: Vec<usize>,
    pub(crate) bin_sum: Vec<u32>,
}

impl<T: Copy> Registers<T> {
    pub(crate) fn new(block_size: usize, bin_count: usize) -> Self {
        Self {
            vals: Vec::with_capacity(block_size),
            indices: Vec::with_capacity(block_size),
            slots: Vec::with_capacity(block_size),
            bin_sum: vec![0; bin_count],
        }
    }

    pub(crate) fn reset_ranks(&mut self) {
        let live = self.vals.len();
        self.indices.clear();
        self.indices.resize(live, 0);
        self.slots.clear();
        self.slots.resize(live, 0);
    }
}

struct KernelArgs<'a, 'd, T, P> {
    src: GlobalRange<'a, T>,
    exchange: &'d SharedSlots<T>,
    counters: &'d SharedSlots<u32>,
    key_of: P,
    padding: Option<T>,
    ascending: bool,
    geometry: GroupGeometry,
    n: usize,
    span: Span,
}

/// Validates the request, plans storage and runs the matching kernel variant.
///
/// `padding` selects the iteration space: `Some` pads tail blocks with a
/// sentinel (key-only sorts), `None` leaves them short (projected sorts).
pub(crate) fn dispatch<T, K, P>(
    device: &Device,
    data: &mut [T],
    key_of: P,
    padding: Option<T>,
    ascending: bool,
    config: &SortConfig,
) -> Result<()>
where
    T: Copy + Send + Sync,
    K: RadixKey,
    P: Fn(&T) -> K + Sync,
{
    let geometry = planner::check_config::<K>(config, device)?;
    let plan = planner::plan(data.len(), size_of::<T>(), device, &geometry)?;
    if data.len() < 2 {
        return Ok(());
    }

    match plan.strategy {
        StorageStrategy::LocalMemory => {
            submit::<LocalTier, T, K, P>(device, data, key_of, padding, ascending, geometry)
        }
        StorageStrategy::GlobalBuffer => {
            submit::<GlobalTier, T, K, P>(device, data, key_of, padding, ascending, geometry)
        }
    }
}

fn submit<S, T, K, P>(
    device: &Device,
    data: &mut [T],
    key_of: P,
    padding: Option<T>,
    ascending: bool,
    geometry: GroupGeometry,
) -> Result<()>
where
    S: ScratchTier,
    T: Copy + Send + Sync,
    K: RadixKey,
    P: Fn(&T) -> K + Sync,
{
    let n = data.len();
    let name = KernelName::new(KERNEL_BASE_NAME, S::STRATEGY);
    let span = debug_span!(
        "group_sort",
        kernel = %name,
        n,
        wg_size = geometry.wg_size,
        block_size = geometry.block_size,
        passes = geometry.passes(),
    );
    let _enter = span.enter();

    // Padding slots are scattered too, so a uniform space needs the whole group.
    let exchange_len = if padding.is_some() {
        geometry.capacity()
    } else {
        n
    };
    let exchange = S::allocate::<T>(device, exchange_len);
    let counters = S::allocate::<u32>(device, geometry.counter_count());

    let args = KernelArgs {
        src: GlobalRange::new(data),
        exchange: &exchange,
        counters: &counters,
        key_of,
        padding,
        ascending,
        geometry,
        n,
        span: span.clone(),
    };

    launch(geometry.wg_size, |item| run::<T, K, P>(item, &args))
}

/// Body executed by every worker:
/// `LOAD -> {COUNT -> SCAN -> REORDER}* -> STORE`.
fn run<T, K, P>(item: &WorkItem<'_>, args: &KernelArgs<'_, '_, T, P>)
where
    T: Copy,
    K: RadixKey,
    P: Fn(&T) -> K,
{
    let geometry = &args.geometry;
    let wi = item.local_id();
    let mut regs = Registers::new(geometry.block_size, geometry.bin_count);

    block::load(&args.src, &mut regs, wi, geometry.block_size, args.n, args.padding);
    item.barrier();

    let mut begin_bit = 0_u32;
    loop {
        if wi == 0 {
            trace!(parent: &args.span, begin_bit, "digit pass");
        }

        histogram::count(
            item,
            args.counters,
            &mut regs,
            &args.key_of,
            args.ascending,
            begin_bit,
            geometry,
        );
        histogram::scan(item, args.counters, &mut regs, geometry);

        begin_bit += geometry.radix;
        item.barrier();

        if begin_bit >= geometry.end_bit {
            block::store(&args.src, &regs, args.n);
            return;
        }

        exchange::to_blocked(item, args.exchange, &mut regs, geometry.block_size);
        item.barrier();
    }
}
