use log::debug;

use crate::array::{Engine, EngineMut, MoYeArray};
use crate::layout::Layout;
use crate::layout_algebra::{coalesce, filter_zeros, max_common_vector};

/// Length of the stride-1 run at the head of the coalesced layout
fn contiguous_run(l: &Layout) -> i64 {
    let c = coalesce(&filter_zeros(l));
    let (s, d) = c.flat_modes()[0];
    if d.value() == 1 {
        s.value()
    } else {
        1
    }
}

/// Copy `src` into `dst`, element `i` to element `i` of the logical
/// domain. The vector width comes from the layouts: equal-sized
/// contiguous runs move as chunks, anything else element by element.
///
/// The buffers must not overlap.
pub fn copy<T, ES, ED>(src: &MoYeArray<ES>, dst: &mut MoYeArray<ED>)
where
    T: Copy,
    ES: Engine<Elem = T>,
    ED: EngineMut<Elem = T>,
{
    let n = src.size().value();
    assert_eq!(n, dst.size().value(), "copy: domain size mismatch");
    if n == 0 {
        return;
    }

    let mut v = max_common_vector(src.layout(), dst.layout()).value();
    if v > 1 {
        let rs = contiguous_run(src.layout());
        let rd = contiguous_run(dst.layout());
        if rs % v != 0 || rd % v != 0 || n % v != 0 {
            v = 1;
        }
    }
    debug!("copy: {} elements, vector width {}", n, v);

    let s_base = src.base();
    let d_base = dst.base_mut();

    if v == n {
        unsafe {
            core::ptr::copy_nonoverlapping(s_base, d_base, n as usize);
        }
    } else if v > 1 {
        let mut k = 0;
        while k < n {
            let s_off = src.layout().index(k) as usize;
            let d_off = dst.layout().index(k) as usize;
            unsafe {
                core::ptr::copy_nonoverlapping(s_base.add(s_off), d_base.add(d_off), v as usize);
            }
            k += v;
        }
    } else {
        for i in 0..n {
            let s_off = src.layout().index(i) as usize;
            let d_off = dst.layout().index(i) as usize;
            unsafe {
                *d_base.add(d_off) = *s_base.add(s_off);
            }
        }
    }
}
