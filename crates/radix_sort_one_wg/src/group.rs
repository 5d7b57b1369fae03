//! Work-group runtime: one scoped thread per worker, a shared barrier, and
//! the group collectives built on it.
//!
//! Shared buffers are plain slot arrays. Workers only touch a slot while no
//! other worker may write it, and every hand-off between workers happens
//! across [`WorkItem::barrier`], which orders the accesses.
//!
//! A panicking worker aborts the group barrier. The workers still parked on it
//! unwind as well, and [`launch`] re-raises the first panic on the caller.

use std::any::Any;
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;

use crate::error::Result;

const WORKER_STACK_SIZE: usize = 256 * 1024;

/// Group-shared slot array with barrier-ordered access.
pub(crate) struct SharedSlots<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Access discipline is enforced by the kernel's barrier placement.
unsafe impl<T: Send> Sync for SharedSlots<T> {}

impl<T: Copy> SharedSlots<T> {
    pub(crate) fn new_uninit(len: usize) -> Self {
        let slots = (0..len)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self { slots }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// # Safety
    ///
    /// `idx` must have been written before the last barrier (or earlier by
    /// this worker) and nobody may write it until the next barrier.
    #[inline]
    pub(crate) unsafe fn read(&self, idx: usize) -> T {
        debug_assert!(idx < self.slots.len());
        unsafe { (*self.slots.get_unchecked(idx).get()).assume_init() }
    }

    /// # Safety
    ///
    /// No other worker may access `idx` until the next barrier.
    #[inline]
    pub(crate) unsafe fn write(&self, idx: usize, value: T) {
        debug_assert!(idx < self.slots.len());
        unsafe {
            *self.slots.get_unchecked(idx).get() = MaybeUninit::new(value);
        }
    }
}

/// Caller-owned input range, shared by every worker of one launch.
pub(crate) struct GlobalRange<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Sync for GlobalRange<'_, T> {}

impl<'a, T: Copy> GlobalRange<'a, T> {
    pub(crate) fn new(data: &'a mut [T]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// # Safety
    ///
    /// `idx < len` and no worker writes `idx` until the next barrier.
    #[inline]
    pub(crate) unsafe fn read(&self, idx: usize) -> T {
        debug_assert!(idx < self.len);
        unsafe { *self.ptr.add(idx) }
    }

    /// # Safety
    ///
    /// `idx < len` and no other worker accesses `idx` until the launch ends.
    #[inline]
    pub(crate) unsafe fn write(&self, idx: usize, value: T) {
        debug_assert!(idx < self.len);
        unsafe {
            *self.ptr.add(idx) = value;
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GateState {
    Pending,
    Open,
    Aborted,
}

/// Holds workers back until every one of them has been spawned, so a failed
/// spawn never leaves the others parked on a barrier that cannot fill.
struct LaunchGate {
    state: Mutex<GateState>,
    cv: Condvar,
}

impl LaunchGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Pending),
            cv: Condvar::new(),
        }
    }

    fn set(&self, next: GateState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
        self.cv.notify_all();
    }

    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while *state == GateState::Pending {
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        *state == GateState::Open
    }
}

/// Generation-counting barrier that can be torn down by a failing worker.
struct GroupBarrier {
    size: usize,
    state: Mutex<BarrierState>,
    cv: Condvar,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

impl GroupBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Returns `false` if the barrier was aborted before the group filled it.
    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.aborted {
            return false;
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation = generation.wrapping_add(1);
            self.cv.notify_all();
            return true;
        }
        while state.generation == generation && !state.aborted {
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.generation != generation
    }

    fn abort(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.aborted = true;
        self.cv.notify_all();
    }
}

/// Unwind payload of a worker released from an aborted barrier.
struct GroupAborted;

struct GroupShared {
    barrier: GroupBarrier,
    scan_slots: SharedSlots<u32>,
    gate: LaunchGate,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl GroupShared {
    fn record_panic(&self, payload: Box<dyn Any + Send>) {
        self.barrier.abort();
        if payload.is::<GroupAborted>() {
            return;
        }
        let mut first = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            *first = Some(payload);
        }
    }
}

/// Handle a worker uses to identify itself and synchronise with its group.
pub(crate) struct WorkItem<'g> {
    local_id: usize,
    group_size: usize,
    shared: &'g GroupShared,
}

impl WorkItem<'_> {
    #[inline]
    pub(crate) fn local_id(&self) -> usize {
        self.local_id
    }

    #[inline]
    pub(crate) fn group_size(&self) -> usize {
        self.group_size
    }

    /// Blocks until every worker of the group has arrived. Unwinds if another
    /// worker panicked instead.
    #[inline]
    pub(crate) fn barrier(&self) {
        if !self.shared.barrier.wait() {
            panic::resume_unwind(Box::new(GroupAborted));
        }
    }

    /// Group-wide exclusive prefix sum: returns the sum of `value` over all
    /// lower-ranked workers. Every worker must call it.
    pub(crate) fn exclusive_scan_over_group(&self, value: u32) -> u32 {
        let slots = &self.shared.scan_slots;
        unsafe { slots.write(self.local_id, value) };
        self.barrier();

        // Two barriers per scan; worker `w` reads the `w` slots below it.
        let mut sum = 0_u32;
        for w in 0..self.local_id {
            sum += unsafe { slots.read(w) };
        }

        // Slots are reused by the next scan.
        self.barrier();
        sum
    }
}

/// Runs `kernel` on `group_size` workers and returns once all have finished.
///
/// A panic in any worker is resumed on the calling thread after the group has
/// been torn down.
pub(crate) fn launch<F>(group_size: usize, kernel: F) -> Result<()>
where
    F: Fn(&WorkItem<'_>) + Sync,
{
    debug_assert!(group_size > 0);
    let shared = GroupShared {
        barrier: GroupBarrier::new(group_size),
        scan_slots: SharedSlots::new_uninit(group_size),
        gate: LaunchGate::new(),
        panic: Mutex::new(None),
    };

    let launched = thread::scope(|scope| -> Result<()> {
        for local_id in 0..group_size {
            let shared = &shared;
            let kernel = &kernel;
            let spawned = thread::Builder::new()
                .name(format!("wg-worker-{local_id}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    if !shared.gate.wait() {
                        return;
                    }
                    let item = WorkItem {
                        local_id,
                        group_size,
                        shared,
                    };
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| kernel(&item))) {
                        shared.record_panic(payload);
                    }
                });

            if let Err(err) = spawned {
                shared.gate.set(GateState::Aborted);
                return Err(err.into());
            }
        }

        shared.gate.set(GateState::Open);
        Ok(())
    });

    let panicked = shared
        .panic
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
    launched
}
