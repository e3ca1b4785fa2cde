use crate::dim::Dim;
use crate::error::{LayoutError, Result};
use crate::tuple::IntTuple;

/// Stride tuple whose flattening is `(1, s1, s1*s2, ...)`, tree structure
/// preserved. Leftmost leaf varies fastest.
pub fn compact_col_major(shape: &IntTuple) -> IntTuple {
    fn recur(shape: &IntTuple, acc: &mut Dim) -> IntTuple {
        match shape {
            IntTuple::Int(s) => {
                let d = *acc;
                *acc = *acc * *s;
                IntTuple::Int(d)
            }
            IntTuple::Tuple(v) => IntTuple::Tuple(v.iter().map(|c| recur(c, acc)).collect()),
        }
    }
    let mut acc = Dim::ONE;
    recur(shape, &mut acc)
}

/// Same with the reversed cumulative product: rightmost leaf varies fastest
pub fn compact_row_major(shape: &IntTuple) -> IntTuple {
    fn recur(shape: &IntTuple, acc: &mut Dim) -> IntTuple {
        match shape {
            IntTuple::Int(s) => {
                let d = *acc;
                *acc = *acc * *s;
                IntTuple::Int(d)
            }
            IntTuple::Tuple(v) => {
                let mut out: Vec<IntTuple> = v.iter().rev().map(|c| recur(c, acc)).collect();
                out.reverse();
                IntTuple::Tuple(out)
            }
        }
    }
    let mut acc = Dim::ONE;
    recur(shape, &mut acc)
}

/// Compact strides filling flattened modes by ascending `order` rank, ties
/// broken by position. `order` must flatten to the same length as `shape`.
pub fn compact_order(shape: &IntTuple, order: &IntTuple) -> IntTuple {
    let flat_shape = shape.flatten();
    let flat_order = order.flatten();
    assert_eq!(
        flat_shape.len(),
        flat_order.len(),
        "compact_order: shape and order disagree"
    );

    let mut positions: Vec<usize> = (0..flat_shape.len()).collect();
    positions.sort_by_key(|&i| (flat_order[i].value(), i));

    let mut strides = vec![Dim::ZERO; flat_shape.len()];
    let mut acc = Dim::ONE;
    for i in positions {
        strides[i] = acc;
        acc = acc * flat_shape[i];
    }
    shape.from_flat(&strides)
}

/// Division propagating staticness. `a / b` when `b` divides `a`; the sign
/// of `a*b` when `a` divides `b` (the mode is fully consumed); otherwise a
/// divisibility failure.
pub fn shape_div(a: Dim, b: Dim) -> Result<Dim> {
    let (av, bv) = (a.value(), b.value());
    if bv != 0 && av % bv == 0 {
        Ok(a / b)
    } else if av != 0 && bv % av == 0 {
        Ok((a * b).sign())
    } else {
        Err(LayoutError::Divisibility { num: av, den: bv })
    }
}

/// Elementwise `shape_div` over congruent tuples
pub fn shape_div_tuple(a: &IntTuple, b: &IntTuple) -> Result<IntTuple> {
    match (a, b) {
        (IntTuple::Int(x), IntTuple::Int(y)) => Ok(IntTuple::Int(shape_div(*x, *y)?)),
        (IntTuple::Tuple(av), IntTuple::Tuple(bv)) if av.len() == bv.len() => {
            let out: Result<Vec<IntTuple>> =
                av.iter().zip(bv).map(|(x, y)| shape_div_tuple(x, y)).collect();
            Ok(IntTuple::Tuple(out?))
        }
        _ => Err(LayoutError::ShapeMismatch {
            shape: a.to_string(),
            stride: b.to_string(),
        }),
    }
}

pub fn ceil_div(a: Dim, b: Dim) -> Dim {
    let v = (a.value() + b.value() - 1) / b.value();
    if a.is_static() && b.is_static() {
        Dim::Static(v)
    } else {
        Dim::Dyn(v)
    }
}
