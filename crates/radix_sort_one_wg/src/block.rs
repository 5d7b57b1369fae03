use crate::group::GlobalRange;
use crate::kernel::Registers;

/// Loads worker `wi`'s block into its registers.
///
/// Slots past `n` become `padding` when the group iterates a uniform space;
/// without padding they are left out, so a tail worker holds a short block.
pub(crate) fn load<T: Copy>(
    src: &GlobalRange<'_, T>,
    regs: &mut Registers<T>,
    wi: usize,
    block_size: usize,
    n: usize,
    padding: Option<T>,
) {
    regs.vals.clear();
    let begin = wi * block_size;
    for idx in begin..begin + block_size {
        if idx < n {
            // Loads finish before the first barrier; stores only start after the last one.
            regs.vals.push(unsafe { src.read(idx) });
        } else if let Some(pad) = padding {
            regs.vals.push(pad);
        } else {
            break;
        }
    }
    regs.reset_ranks();
}

/// Final store: every register goes to its placement index. Indices at or past
/// `n` belong to padding and are dropped.
pub(crate) fn store<T: Copy>(dst: &GlobalRange<'_, T>, regs: &Registers<T>, n: usize) {
    debug_assert!(n <= dst.len());
    for (&val, &r) in regs.vals.iter().zip(&regs.indices) {
        let r = r as usize;
        if r < n {
            // Placement indices are a bijection, so no two workers share `r`.
            unsafe { dst.write(r, val) };
        }
    }
}
