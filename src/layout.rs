use core::fmt;

use smallvec::SmallVec;

use crate::dim::Dim;
use crate::error::{LayoutError, Result};
use crate::shape::coord_to_index;
use crate::stride::{compact_col_major, compact_order, compact_row_major};
use crate::tuple::IntTuple;

/// Layout = mapping from hierarchical coordinates → linear index.
///
/// `shape` and `stride` are congruent trees; every shape leaf is ≥ 1.
/// Coordinates and indices are 0-based throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: IntTuple,
    stride: IntTuple,
}

/// Stride policy for compact construction
pub trait LayoutPolicy {
    fn make_stride(shape: &IntTuple) -> IntTuple;
}

/// Leftmost mode varies fastest
pub struct ColMajor;

/// Rightmost mode varies fastest
pub struct RowMajor;

impl LayoutPolicy for ColMajor {
    fn make_stride(shape: &IntTuple) -> IntTuple {
        compact_col_major(shape)
    }
}

impl LayoutPolicy for RowMajor {
    fn make_stride(shape: &IntTuple) -> IntTuple {
        compact_row_major(shape)
    }
}

/// Flattened (shape, stride) mode pairs
pub(crate) type FlatModes = SmallVec<[(Dim, Dim); 8]>;

impl Layout {
    pub fn new(shape: IntTuple, stride: IntTuple) -> Result<Self> {
        if !shape.congruent(&stride) {
            return Err(LayoutError::ShapeMismatch {
                shape: shape.to_string(),
                stride: stride.to_string(),
            });
        }
        if shape.flatten().iter().any(|s| s.value() < 1) {
            return Err(LayoutError::ShapeMismatch {
                shape: shape.to_string(),
                stride: stride.to_string(),
            });
        }
        Ok(Layout { shape, stride })
    }

    /// Construction bypassing the congruence check, for results the algebra
    /// builds shape-and-stride in lockstep
    pub(crate) fn from_parts(shape: IntTuple, stride: IntTuple) -> Self {
        debug_assert!(shape.congruent(&stride));
        Layout { shape, stride }
    }

    pub fn with_policy<P: LayoutPolicy>(shape: IntTuple) -> Self {
        let stride = P::make_stride(&shape);
        Layout { shape, stride }
    }

    /// Compact column-major layout (the default)
    pub fn from_shape(shape: IntTuple) -> Self {
        Layout::with_policy::<ColMajor>(shape)
    }

    pub fn col_major(shape: IntTuple) -> Self {
        Layout::with_policy::<ColMajor>(shape)
    }

    pub fn row_major(shape: IntTuple) -> Self {
        Layout::with_policy::<RowMajor>(shape)
    }

    /// Compact layout whose modes are filled by ascending `order` rank
    pub fn ordered(shape: IntTuple, order: &IntTuple) -> Self {
        let stride = compact_order(&shape, order);
        Layout { shape, stride }
    }

    /// Mode concatenation: `(A, B, ...)`
    pub fn concat(parts: &[Layout]) -> Self {
        Layout {
            shape: IntTuple::Tuple(parts.iter().map(|l| l.shape.clone()).collect()),
            stride: IntTuple::Tuple(parts.iter().map(|l| l.stride.clone()).collect()),
        }
    }

    /// The `1:0` layout: domain of one point, image {0}
    pub fn unit() -> Self {
        Layout {
            shape: IntTuple::Int(Dim::ONE),
            stride: IntTuple::Int(Dim::ZERO),
        }
    }

    pub fn shape(&self) -> &IntTuple {
        &self.shape
    }

    pub fn stride(&self) -> &IntTuple {
        &self.stride
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn depth(&self) -> usize {
        self.shape.depth()
    }

    /// Cardinality of the coordinate domain
    pub fn size(&self) -> Dim {
        self.shape.size()
    }

    /// Least upper bound of the linear image + 1; negative strides do not
    /// extend the bound
    pub fn cosize(&self) -> Dim {
        self.flat_modes()
            .iter()
            .fold(Dim::ONE, |acc, (s, d)| {
                acc + (*s - Dim::ONE) * (*d).max(Dim::ZERO)
            })
    }

    /// True when every shape and stride leaf is static
    pub fn is_static(&self) -> bool {
        self.shape.is_static() && self.stride.is_static()
    }

    /// Sub-layout of top-level mode `i`
    pub fn mode(&self, i: usize) -> Layout {
        Layout {
            shape: self.shape.at(i).clone(),
            stride: self.stride.at(i).clone(),
        }
    }

    pub fn modes(&self) -> impl Iterator<Item = Layout> + '_ {
        (0..self.rank().max(1)).map(|i| self.mode(i))
    }

    pub(crate) fn flat_modes(&self) -> FlatModes {
        self.shape
            .flatten()
            .into_iter()
            .zip(self.stride.flatten())
            .collect()
    }

    /// Rank-N layout over the flattened modes, hierarchy removed
    pub fn flatten(&self) -> Layout {
        let (shapes, strides): (Vec<IntTuple>, Vec<IntTuple>) = self
            .flat_modes()
            .into_iter()
            .map(|(s, d)| (IntTuple::Int(s), IntTuple::Int(d)))
            .unzip();
        Layout {
            shape: IntTuple::Tuple(shapes),
            stride: IntTuple::Tuple(strides),
        }
    }

    /* ---------- evaluation ---------- */

    /// Evaluate at a coordinate: a leaf is a 1-D (colexicographic)
    /// coordinate, a tuple is an R-D or hierarchical coordinate
    pub fn call(&self, coord: &IntTuple) -> Dim {
        coord_to_index(coord, &self.shape, &self.stride)
    }

    /// Evaluate at a 0-based linear index
    pub fn index(&self, i: i64) -> i64 {
        debug_assert!(
            0 <= i && i < self.size().value(),
            "{}",
            LayoutError::OutOfBounds {
                index: i,
                size: self.size().value()
            }
        );
        self.call(&IntTuple::dy(i)).value()
    }

    /* ---------- mode edits ---------- */

    /// Pad right with copies of `x` (typically `Layout::unit()`) to rank `n`
    pub fn append(&self, x: &Layout, n: usize) -> Layout {
        Layout {
            shape: self.shape.append(&x.shape, n),
            stride: self.stride.append(&x.stride, n),
        }
    }

    pub fn prepend(&self, x: &Layout, n: usize) -> Layout {
        Layout {
            shape: self.shape.prepend(&x.shape, n),
            stride: self.stride.prepend(&x.stride, n),
        }
    }

    pub fn replace(&self, x: &Layout, n: usize) -> Layout {
        Layout {
            shape: self.shape.replace(x.shape.clone(), n),
            stride: self.stride.replace(x.stride.clone(), n),
        }
    }

    pub fn group(&self, b: usize, e: usize) -> Layout {
        Layout {
            shape: self.shape.group(b, e),
            stride: self.stride.group(b, e),
        }
    }

    /// Permutation of top-level modes
    pub fn select(&self, order: &[usize]) -> Layout {
        Layout::concat(&order.iter().map(|&i| self.mode(i)).collect::<Vec<_>>())
    }

    /// Swap the two modes of a rank-2 layout
    pub fn transpose(&self) -> Layout {
        assert_eq!(self.rank(), 2, "transpose: rank-2 layouts only");
        self.select(&[1, 0])
    }

    /* ---------- slicing / dicing ---------- */

    /// Keep the modes where `coord` holds a wildcard; evaluated modes are
    /// dropped. An all-integer coordinate slices down to `1:0`.
    pub fn slice(&self, coord: &Coord) -> Result<Layout> {
        Ok(self.slice_and_offset(coord)?.0)
    }

    /// Slice plus the linear offset of the evaluated (non-wildcard) entries,
    /// i.e. the layout applied to `coord` with wildcards replaced by 0
    pub fn slice_and_offset(&self, coord: &Coord) -> Result<(Layout, Dim)> {
        fn recur(
            c: &Coord,
            shape: &IntTuple,
            stride: &IntTuple,
            offset: &mut Dim,
        ) -> Result<Option<(IntTuple, IntTuple)>> {
            match c {
                Coord::Wild => Ok(Some((shape.clone(), stride.clone()))),
                Coord::Int(v) => {
                    *offset = *offset + coord_to_index(&IntTuple::Int(*v), shape, stride);
                    Ok(None)
                }
                Coord::Tuple(cs) => {
                    let (ss, ds) = match (shape, stride) {
                        (IntTuple::Tuple(ss), IntTuple::Tuple(ds)) if ss.len() == cs.len() => {
                            (ss, ds)
                        }
                        _ => {
                            return Err(LayoutError::InvalidSlice {
                                spec: c.to_string(),
                                layout: shape.to_string(),
                            })
                        }
                    };
                    let mut kept_s = Vec::new();
                    let mut kept_d = Vec::new();
                    for (c, (s, d)) in cs.iter().zip(ss.iter().zip(ds)) {
                        if let Some((s, d)) = recur(c, s, d, offset)? {
                            kept_s.push(s);
                            kept_d.push(d);
                        }
                    }
                    if kept_s.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some((IntTuple::Tuple(kept_s), IntTuple::Tuple(kept_d))))
                    }
                }
            }
        }

        let mut offset = Dim::ZERO;
        match recur(coord, &self.shape, &self.stride, &mut offset)? {
            Some((shape, stride)) => Ok((Layout { shape, stride }, offset)),
            None => Ok((Layout::unit(), offset)),
        }
    }

    /// Dual of `slice`: keep the modes that `coord` evaluates, drop the
    /// wildcard modes
    pub fn dice(&self, coord: &Coord) -> Result<Layout> {
        fn recur(
            c: &Coord,
            shape: &IntTuple,
            stride: &IntTuple,
        ) -> Result<Option<(IntTuple, IntTuple)>> {
            match c {
                Coord::Wild => Ok(None),
                Coord::Int(_) => Ok(Some((shape.clone(), stride.clone()))),
                Coord::Tuple(cs) => {
                    let (ss, ds) = match (shape, stride) {
                        (IntTuple::Tuple(ss), IntTuple::Tuple(ds)) if ss.len() == cs.len() => {
                            (ss, ds)
                        }
                        _ => {
                            return Err(LayoutError::InvalidSlice {
                                spec: c.to_string(),
                                layout: shape.to_string(),
                            })
                        }
                    };
                    let mut kept_s = Vec::new();
                    let mut kept_d = Vec::new();
                    for (c, (s, d)) in cs.iter().zip(ss.iter().zip(ds)) {
                        if let Some((s, d)) = recur(c, s, d)? {
                            kept_s.push(s);
                            kept_d.push(d);
                        }
                    }
                    if kept_s.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some((IntTuple::Tuple(kept_s), IntTuple::Tuple(kept_d))))
                    }
                }
            }
        }

        match recur(coord, &self.shape, &self.stride)? {
            Some((shape, stride)) => Ok(Layout { shape, stride }),
            None => Ok(Layout::unit()),
        }
    }
}

/// Compact layout whose modes are filled by ascending `order` rank, ties
/// broken by position
pub fn make_ordered_layout(shape: IntTuple, order: &IntTuple) -> Layout {
    Layout::ordered(shape, order)
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shape, self.stride)
    }
}

/// Slicing coordinate: an integer entry evaluates a mode, a wildcard keeps
/// it in the sliced layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coord {
    Wild,
    Int(Dim),
    Tuple(Vec<Coord>),
}

/// Builds a `Coord`; `_` is a wildcard, brackets nest:
/// `coord![_, 3, [_, 0]]`.
#[macro_export]
macro_rules! coord {
    ($($x:tt),+ $(,)?) => {
        $crate::layout::Coord::Tuple(vec![$($crate::coord!(@e $x)),+])
    };
    (@e _) => { $crate::layout::Coord::Wild };
    (@e [$($x:tt),+ $(,)?]) => {
        $crate::layout::Coord::Tuple(vec![$($crate::coord!(@e $x)),+])
    };
    (@e $x:expr) => {
        $crate::layout::Coord::Int($crate::dim::Dim::Dyn($x))
    };
}

impl Coord {
    /// Coordinate with every leaf of `t` as an integer entry
    pub fn from_tuple(t: &IntTuple) -> Coord {
        match t {
            IntTuple::Int(d) => Coord::Int(*d),
            IntTuple::Tuple(v) => Coord::Tuple(v.iter().map(Coord::from_tuple).collect()),
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Wild => write!(f, "_"),
            Coord::Int(d) => write!(f, "{}", d),
            Coord::Tuple(v) => {
                write!(f, "(")?;
                for (i, c) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}
