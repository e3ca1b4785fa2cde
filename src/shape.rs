use crate::dim::Dim;
use crate::stride::compact_col_major;
use crate::tuple::IntTuple;

/// Leaf-wise inner product of a coordinate against a stride tuple.
///
/// `coord` may be:
/// - a single integer: decomposed colexicographically over the flattened
///   shape, the last mode absorbing any remainder,
/// - an R-D or hierarchical tuple weakly congruent to `shape`: each leaf of
///   `coord` is decomposed over the matching subtree.
pub fn coord_to_index(coord: &IntTuple, shape: &IntTuple, stride: &IntTuple) -> Dim {
    match (coord, shape, stride) {
        (IntTuple::Int(c), IntTuple::Int(_), IntTuple::Int(d)) => *c * *d,
        (IntTuple::Int(c), IntTuple::Tuple(_), IntTuple::Tuple(_)) => {
            let ss = shape.flatten();
            let ds = stride.flatten();
            let mut rest = *c;
            let mut idx = Dim::ZERO;
            for i in 0..ss.len() {
                if i + 1 == ss.len() {
                    idx = idx + rest * ds[i];
                } else {
                    let (q, r) = rest.divrem(ss[i]);
                    idx = idx + r * ds[i];
                    rest = q;
                }
            }
            idx
        }
        (IntTuple::Tuple(cs), IntTuple::Tuple(ss), IntTuple::Tuple(ds)) => {
            debug_assert_eq!(cs.len(), ss.len(), "coord_to_index: rank mismatch");
            cs.iter()
                .zip(ss.iter().zip(ds))
                .fold(Dim::ZERO, |acc, (c, (s, d))| acc + coord_to_index(c, s, d))
        }
        _ => panic!(
            "coord_to_index: coordinate {} does not match shape {}",
            coord, shape
        ),
    }
}

/// Colexicographic decomposition of a linear index into a coordinate
/// congruent to `shape`. The last mode absorbs any remainder.
pub fn index_to_coord(index: Dim, shape: &IntTuple) -> IntTuple {
    let flat = shape.flatten();
    let mut leaves = Vec::with_capacity(flat.len());
    let mut rest = index;
    for (i, s) in flat.iter().enumerate() {
        if i + 1 == flat.len() {
            leaves.push(rest);
        } else {
            let (q, r) = rest.divrem(*s);
            leaves.push(r);
            rest = q;
        }
    }
    shape.from_flat(&leaves)
}

/// Map a coordinate of `from` to the coordinate of `to` denoting the same
/// colexicographic position. `from` and `to` must have equal sizes.
pub fn coord_to_coord(coord: &IntTuple, from: &IntTuple, to: &IntTuple) -> IntTuple {
    debug_assert_eq!(from.size(), to.size(), "coord_to_coord: size mismatch");
    let idx = coord_to_index(coord, from, &compact_col_major(from));
    index_to_coord(idx, to)
}
