use crate::array::{Engine, EngineMut, MoYeArray, ViewArray, ViewArrayMut};
use crate::dim::Dim;
use crate::error::Result;
use crate::layout::{Coord, Layout};
use crate::layout_algebra::{zipped_divide, Tiler};
use crate::tuple::IntTuple;

/* ============================================================
   block- and thread-level partitioning
   ============================================================ */

/// Zipped division of `l` by a compact tile of `tile_shape`, sliced at
/// `block_coord` along the across-tiles mode. Returns the tile's layout and
/// its linear offset into `l`'s codomain.
pub fn local_tile_layout(
    l: &Layout,
    tile_shape: &IntTuple,
    block_coord: &IntTuple,
) -> Result<(Layout, Dim)> {
    let z = zipped_divide(l, &Tiler::from_shape(tile_shape))?;
    let c = Coord::Tuple(vec![Coord::Wild, Coord::from_tuple(block_coord)]);
    z.slice_and_offset(&c)
}

/// View of the tile at `block_coord` in a tiling of `a` by `tile_shape`
pub fn local_tile<'a, E: Engine>(
    a: &'a MoYeArray<E>,
    tile_shape: &IntTuple,
    block_coord: &IntTuple,
) -> Result<ViewArray<'a, E::Elem>> {
    let (layout, offset) = local_tile_layout(a.layout(), tile_shape, block_coord)?;
    unsafe {
        Ok(ViewArray::from_raw_parts(
            a.base().add(offset.value() as usize),
            layout,
        ))
    }
}

pub fn local_tile_mut<'a, E: EngineMut>(
    a: &'a mut MoYeArray<E>,
    tile_shape: &IntTuple,
    block_coord: &IntTuple,
) -> Result<ViewArrayMut<'a, E::Elem>> {
    let (layout, offset) = local_tile_layout(a.layout(), tile_shape, block_coord)?;
    unsafe {
        Ok(ViewArrayMut::from_raw_parts(
            a.base_mut().add(offset.value() as usize),
            layout,
        ))
    }
}

/// `thread_layout` maps a thread id to its position inside one tile; the
/// returned layout addresses everything that thread owns across the whole
/// of `l`, with its linear base offset.
pub fn local_partition_layout(
    l: &Layout,
    thread_layout: &Layout,
    thread_id: i64,
) -> Result<(Layout, Dim)> {
    let z = zipped_divide(l, &Tiler::from_shape(thread_layout.shape()))?;
    let pos = thread_layout.call(&IntTuple::dy(thread_id));
    let c = Coord::Tuple(vec![Coord::Int(pos), Coord::Wild]);
    z.slice_and_offset(&c)
}

/// Per-thread view: one element of every tile, at the position
/// `thread_layout` assigns to `thread_id`
pub fn local_partition<'a, E: Engine>(
    a: &'a MoYeArray<E>,
    thread_layout: &Layout,
    thread_id: i64,
) -> Result<ViewArray<'a, E::Elem>> {
    let (layout, offset) = local_partition_layout(a.layout(), thread_layout, thread_id)?;
    unsafe {
        Ok(ViewArray::from_raw_parts(
            a.base().add(offset.value() as usize),
            layout,
        ))
    }
}

pub fn local_partition_mut<'a, E: EngineMut>(
    a: &'a mut MoYeArray<E>,
    thread_layout: &Layout,
    thread_id: i64,
) -> Result<ViewArrayMut<'a, E::Elem>> {
    let (layout, offset) = local_partition_layout(a.layout(), thread_layout, thread_id)?;
    unsafe {
        Ok(ViewArrayMut::from_raw_parts(
            a.base_mut().add(offset.value() as usize),
            layout,
        ))
    }
}

/* ============================================================
   coordinate iteration
   ============================================================ */

/// Colexicographic walk over the coordinates of a shape; drives host-side
/// loops over across-tile modes
pub struct CoordIter {
    shape: IntTuple,
    dims: Vec<i64>,
    current: Vec<i64>,
    done: bool,
}

impl CoordIter {
    pub fn new(shape: IntTuple) -> Self {
        let dims: Vec<i64> = shape.flatten().iter().map(|d| d.value()).collect();
        let done = dims.iter().any(|&d| d == 0);
        Self {
            current: vec![0; dims.len()],
            shape,
            dims,
            done,
        }
    }
}

impl Iterator for CoordIter {
    type Item = IntTuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let leaves: Vec<Dim> = self.current.iter().map(|&v| Dim::Dyn(v)).collect();
        let result = self.shape.from_flat(&leaves);

        // colex increment: leftmost leaf varies fastest
        for i in 0..self.current.len() {
            self.current[i] += 1;
            if self.current[i] < self.dims[i] {
                break;
            }
            self.current[i] = 0;
            if i + 1 == self.current.len() {
                self.done = true;
            }
        }

        Some(result)
    }
}
