use crate::dim::Dim;
use crate::error::{LayoutError, Result};
use crate::layout::{FlatModes, Layout};
use crate::stride::{ceil_div, shape_div};
use crate::tuple::IntTuple;

/* ============================================================
   coalesce / filter
   ============================================================ */

/// Left-to-right fold over flattened modes: drop size-1 modes, fuse
/// `(s0,d0),(s,d)` into `(s0*s, d0)` whenever `s0*d0 == d`
fn fuse_modes(modes: &[(Dim, Dim)]) -> FlatModes {
    let mut out = FlatModes::new();
    for &(s, d) in modes {
        if s.value() == 1 {
            continue;
        }
        match out.last_mut() {
            Some((s0, d0)) if s0.value() * d0.value() == d.value() => {
                *s0 = *s0 * s;
            }
            _ => out.push((s, d)),
        }
    }
    if out.is_empty() {
        out.push((Dim::ONE, Dim::ZERO));
    }
    out
}

/// Right-to-left variant used while composition builds its result
fn bw_coalesce(modes: &[(Dim, Dim)]) -> FlatModes {
    let mut out = FlatModes::new();
    for &(s, d) in modes.iter().rev() {
        if s.value() == 1 {
            continue;
        }
        match out.first_mut() {
            Some((s0, d0)) if s.value() * d.value() == d0.value() => {
                *s0 = s * *s0;
                *d0 = d;
            }
            _ => out.insert(0, (s, d)),
        }
    }
    if out.is_empty() {
        out.push((Dim::ONE, Dim::ZERO));
    }
    out
}

fn modes_to_layout(modes: &[(Dim, Dim)]) -> Layout {
    if modes.len() == 1 {
        Layout::from_parts(IntTuple::Int(modes[0].0), IntTuple::Int(modes[0].1))
    } else {
        let (shapes, strides) = modes
            .iter()
            .map(|&(s, d)| (IntTuple::Int(s), IntTuple::Int(d)))
            .unzip();
        Layout::from_parts(IntTuple::Tuple(shapes), IntTuple::Tuple(strides))
    }
}

/// Smallest layout denoting the same function on `[0, size(l))`
pub fn coalesce(l: &Layout) -> Layout {
    modes_to_layout(&fuse_modes(&l.flat_modes()))
}

/// Coalesce per mode named by `profile`: a leaf entry coalesces the whole
/// sub-layout, a tuple entry recurses. Modes past the profile's rank are
/// coalesced whole.
pub fn coalesce_profile(l: &Layout, profile: &IntTuple) -> Layout {
    if profile.is_leaf() || l.rank() == 0 {
        return coalesce(l);
    }
    let r = l.rank();
    let pr = profile.rank();
    assert!(pr <= r, "coalesce_profile: profile rank exceeds layout rank");
    let parts: Vec<Layout> = (0..r)
        .map(|i| {
            if i < pr {
                coalesce_profile(&l.mode(i), profile.at(i))
            } else {
                coalesce(&l.mode(i))
            }
        })
        .collect();
    Layout::concat(&parts)
}

/// Broadcast modes (stride 0) get shape 1, tree preserved
pub fn filter_zeros(l: &Layout) -> Layout {
    fn recur(shape: &IntTuple, stride: &IntTuple) -> IntTuple {
        match (shape, stride) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                if d.value() == 0 {
                    IntTuple::Int(Dim::ONE)
                } else {
                    IntTuple::Int(*s)
                }
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(ds)) => IntTuple::Tuple(
                ss.iter().zip(ds).map(|(s, d)| recur(s, d)).collect(),
            ),
            _ => unreachable!("congruence holds by construction"),
        }
    }
    Layout::from_parts(recur(l.shape(), l.stride()), l.stride().clone())
}

pub fn filter(l: &Layout) -> Layout {
    coalesce(&filter_zeros(l))
}

/* ============================================================
   composition
   ============================================================ */

fn check_non_negative(l: &Layout) -> Result<()> {
    for d in l.stride().flatten() {
        if d.value() < 0 {
            return Err(LayoutError::NegativeStride(d.value()));
        }
    }
    Ok(())
}

/// Compose the flattened left operand with a single right mode `s:d`
fn compose_flat(a: &[(Dim, Dim)], s: Dim, d: Dim) -> Result<FlatModes> {
    if d.value() == 0 {
        let mut out = FlatModes::new();
        out.push((s, d));
        return Ok(out);
    }

    // Skip the first d positions of `a`: fully consumed leading modes fall
    // away, a partially consumed mode keeps its tail with a scaled stride.
    let mut r = d;
    let mut i = 0;
    while i + 1 < a.len() && r.value() != 1 && r.value() % a[i].0.value() == 0 {
        r = shape_div(r, a[i].0)?;
        i += 1;
    }
    let mut modes = FlatModes::new();
    modes.push((shape_div(a[i].0, r)?, a[i].1 * r));
    modes.extend_from_slice(&a[i + 1..]);

    // Split s over the residual modes: leading modes take what they can,
    // the final mode absorbs the remaining quotient unchecked.
    let mut out = FlatModes::new();
    let mut rem = s;
    for (k, &(ak, bk)) in modes.iter().enumerate() {
        if k + 1 == modes.len() {
            out.push((rem, bk));
        } else {
            out.push((ak.min(rem), bk));
            rem = shape_div(rem, ak)?;
        }
    }
    Ok(bw_coalesce(&out))
}

/// Functional composition `a ∘ b`: `(a ∘ b)(c) = a(b(c))`. The result keeps
/// `b`'s top-level structure; a mode of `b` whose split straddles several
/// modes of `a` comes back nested.
pub fn composition(a: &Layout, b: &Layout) -> Result<Layout> {
    check_non_negative(a)?;
    check_non_negative(b)?;

    fn recur(
        a_flat: &[(Dim, Dim)],
        bs: &IntTuple,
        bd: &IntTuple,
    ) -> Result<(IntTuple, IntTuple)> {
        match (bs, bd) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                let modes = compose_flat(a_flat, *s, *d)?;
                if modes.len() == 1 {
                    Ok((IntTuple::Int(modes[0].0), IntTuple::Int(modes[0].1)))
                } else {
                    let (shapes, strides) = modes
                        .iter()
                        .map(|&(s, d)| (IntTuple::Int(s), IntTuple::Int(d)))
                        .unzip();
                    Ok((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
                }
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(ds)) => {
                let mut shapes = Vec::with_capacity(ss.len());
                let mut strides = Vec::with_capacity(ss.len());
                for (s, d) in ss.iter().zip(ds) {
                    let (rs, rd) = recur(a_flat, s, d)?;
                    shapes.push(rs);
                    strides.push(rd);
                }
                Ok((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
            }
            _ => unreachable!("congruence holds by construction"),
        }
    }

    let a_flat = a.flat_modes();
    let (shape, stride) = recur(&a_flat, b.shape(), b.stride())?;
    Ok(Layout::from_parts(shape, stride))
}

/// Reshape: `l` composed with the compact column-major layout of `shape`
pub fn with_shape(l: &Layout, shape: IntTuple) -> Result<Layout> {
    composition(l, &Layout::from_shape(shape))
}

/* ============================================================
   complement
   ============================================================ */

/// Layout covering `[0, m)` jointly with `l`: the images of `l` and of its
/// complement meet only at 0, and `(l, complement(l, m))` fills `[0, m)`
/// without overlap for admissible `m`.
pub fn complement(l: &Layout, m: Dim) -> Result<Layout> {
    let f = filter(l);
    check_non_negative(&f)?;

    let mut modes: Vec<(Dim, Dim)> = f
        .flat_modes()
        .into_iter()
        .filter(|(s, _)| s.value() > 1)
        .collect();
    if modes.is_empty() {
        return Ok(Layout::from_parts(IntTuple::Int(m), IntTuple::Int(Dim::ONE)));
    }
    modes.sort_by_key(|&(_, d)| d.value());

    // Gap before each mode, then the tail above the total reach
    let mut out = FlatModes::new();
    let mut reach = Dim::ONE;
    for &(s, d) in &modes {
        out.push((shape_div(d, reach)?, reach));
        reach = s * d;
    }
    out.push((ceil_div(m, reach), reach));

    Ok(modes_to_layout(&bw_coalesce(&out)))
}

/// Complement within the filtered layout's own codomain
pub fn complement_cosize(l: &Layout) -> Result<Layout> {
    complement(l, filter(l).cosize())
}

/* ============================================================
   products
   ============================================================ */

fn promote(l: &Layout) -> Layout {
    if l.rank() == 0 {
        Layout::from_parts(
            IntTuple::Tuple(vec![l.shape().clone()]),
            IntTuple::Tuple(vec![l.stride().clone()]),
        )
    } else {
        l.clone()
    }
}

/// `(a, b-over-the-gaps-of-a)`: mode 1 is `a`, mode 2 replays `b` across
/// the complement of `a`
pub fn logical_product(a: &Layout, b: &Layout) -> Result<Layout> {
    let m = a.size() * b.cosize();
    let rest = composition(&complement(a, m)?, b)?;
    Ok(Layout::concat(&[a.clone(), rest]))
}

/// Product with mode-`i`-of-`a` paired against mode-`i`-of-`b`:
/// `((a1,c1),(a2,c2),...)`
pub fn blocked_product(a: &Layout, b: &Layout, coalesce_result: bool) -> Result<Layout> {
    let r = a.rank().max(1).max(b.rank().max(1));
    let a = promote(a).append(&Layout::unit(), r);
    let b = promote(b).append(&Layout::unit(), r);
    let lp = logical_product(&a, &b)?;
    let (block, rest) = (lp.mode(0), lp.mode(1));
    let parts: Vec<Layout> = (0..r)
        .map(|i| Layout::concat(&[block.mode(i), rest.mode(i)]))
        .collect();
    finish_product(parts, coalesce_result)
}

/// Interleaved variant: the replicated mode leads, `((c1,a1),(c2,a2),...)`
pub fn raked_product(a: &Layout, b: &Layout, coalesce_result: bool) -> Result<Layout> {
    let r = a.rank().max(1).max(b.rank().max(1));
    let a = promote(a).append(&Layout::unit(), r);
    let b = promote(b).append(&Layout::unit(), r);
    let lp = logical_product(&a, &b)?;
    let (block, rest) = (lp.mode(0), lp.mode(1));
    let parts: Vec<Layout> = (0..r)
        .map(|i| Layout::concat(&[rest.mode(i), block.mode(i)]))
        .collect();
    finish_product(parts, coalesce_result)
}

fn finish_product(parts: Vec<Layout>, coalesce_result: bool) -> Result<Layout> {
    if coalesce_result {
        Ok(Layout::concat(
            &parts.iter().map(coalesce).collect::<Vec<_>>(),
        ))
    } else {
        Ok(Layout::concat(&parts))
    }
}

/* ============================================================
   divides
   ============================================================ */

/// Division pattern: a whole-layout tile, a per-mode tuple of tiles, or a
/// wildcard passing a mode through untouched
#[derive(Debug, Clone)]
pub enum Tiler {
    Wild,
    Tile(Layout),
    Tuple(Vec<Tiler>),
}

impl Tiler {
    /// One compact tile per top-level mode of `shape`
    pub fn from_shape(shape: &IntTuple) -> Tiler {
        match shape {
            IntTuple::Int(_) => Tiler::Tile(Layout::from_shape(shape.clone())),
            IntTuple::Tuple(v) => Tiler::Tuple(
                v.iter()
                    .map(|m| Tiler::Tile(Layout::from_shape(m.clone())))
                    .collect(),
            ),
        }
    }
}

impl From<Layout> for Tiler {
    fn from(l: Layout) -> Tiler {
        Tiler::Tile(l)
    }
}

/// `((tile, rest-of-mode), ...)`: each tiled mode splits into the tile's
/// view of it and the remainder across tiles
pub fn logical_divide(l: &Layout, tiler: &Tiler) -> Result<Layout> {
    match tiler {
        Tiler::Wild => Ok(l.clone()),
        Tiler::Tile(tile) => {
            let rest = complement(tile, l.size())?;
            composition(l, &Layout::concat(&[tile.clone(), rest]))
        }
        Tiler::Tuple(ts) => {
            let r = l.rank().max(1);
            if ts.len() > r {
                return Err(LayoutError::RankMismatch {
                    expected: r,
                    got: ts.len(),
                });
            }
            let parts: Result<Vec<Layout>> = (0..r)
                .map(|i| {
                    if i < ts.len() {
                        logical_divide(&l.mode(i), &ts[i])
                    } else {
                        Ok(l.mode(i))
                    }
                })
                .collect();
            Ok(Layout::concat(&parts?))
        }
    }
}

/// Regrouped division: mode 1 gathers the inside-tile axes, mode 2 the
/// across-tiles axes (wildcard and un-tiled modes land across-tiles whole)
pub fn zipped_divide(l: &Layout, tiler: &Tiler) -> Result<Layout> {
    let d = logical_divide(l, tiler)?;
    match tiler {
        Tiler::Wild | Tiler::Tile(_) => Ok(d),
        Tiler::Tuple(ts) => {
            let mut tiles = Vec::new();
            let mut rests = Vec::new();
            for i in 0..d.rank() {
                let m = d.mode(i);
                match ts.get(i) {
                    Some(Tiler::Wild) | None => rests.push(m),
                    Some(_) => {
                        tiles.push(m.mode(0));
                        rests.push(m.mode(1));
                    }
                }
            }
            Ok(Layout::concat(&[
                Layout::concat(&tiles),
                Layout::concat(&rests),
            ]))
        }
    }
}

/// `((tile...), rest_1, ..., rest_r)`: zipped division with the
/// across-tiles mode unpacked
pub fn tiled_divide(l: &Layout, tiler: &Tiler) -> Result<Layout> {
    let z = zipped_divide(l, tiler)?;
    let rest = z.mode(1);
    let mut parts = vec![z.mode(0)];
    parts.extend((0..rest.rank().max(1)).map(|i| rest.mode(i)));
    Ok(Layout::concat(&parts))
}

/* ============================================================
   inverses
   ============================================================ */

/// Layout `r` with `l(r(x)) = x` on the contiguous prefix of `l`'s image:
/// chain modes by `s_k * d_k == d_{k+1}` starting from |stride| 1, strides
/// are the domain prefix products signed like the originals. `1:0` when no
/// unit-stride mode exists.
pub fn right_inverse(l: &Layout) -> Layout {
    let modes = coalesce(l).flat_modes();

    let mut prefix = Vec::with_capacity(modes.len());
    let mut acc = Dim::ONE;
    for &(s, _) in &modes {
        prefix.push(acc);
        acc = acc * s;
    }

    let mut out = FlatModes::new();
    let mut next = 1i64;
    loop {
        match modes
            .iter()
            .position(|&(_, d)| d.value().abs() == next && next > 0)
        {
            Some(i) => {
                let (s, d) = modes[i];
                out.push((s, d.sign() * prefix[i]));
                next = s.value() * next;
            }
            None => break,
        }
        if out.len() == modes.len() {
            break;
        }
    }
    if out.is_empty() {
        return Layout::unit();
    }
    modes_to_layout(&bw_coalesce(&out))
}

/// Inverse on the domain side: `left_inverse(l)(l(c)) = c`
pub fn left_inverse(l: &Layout) -> Result<Layout> {
    Ok(right_inverse(&Layout::concat(&[
        l.clone(),
        complement_cosize(l)?,
    ])))
}

/* ============================================================
   max common layout
   ============================================================ */

/// Largest layout `r` such that `a ∘ r` and `b ∘ r` both address memory
/// contiguously; `1:0` unless both layouts are fully static
pub fn max_common_layout(a: &Layout, b: &Layout) -> Layout {
    if !(a.is_static() && b.is_static()) {
        return Layout::unit();
    }
    let inv_b = right_inverse(b);
    let common = match composition(a, &inv_b) {
        Ok(c) => coalesce(&c),
        Err(_) => return Layout::unit(),
    };
    let (s0, d0) = common.flat_modes()[0];
    if d0.value() == 1 && s0.value() > 1 {
        let head = Layout::from_parts(IntTuple::Int(s0), IntTuple::Int(d0));
        composition(&inv_b, &head).unwrap_or_else(|_| Layout::unit())
    } else {
        Layout::unit()
    }
}

/// Vector width usable for moving data between the two layouts
pub fn max_common_vector(a: &Layout, b: &Layout) -> Dim {
    max_common_layout(a, b).size()
}

/* ============================================================
   element-type recasting
   ============================================================ */

/// Same byte addresses under elements `m`× larger. The contiguous mode
/// shrinks by `m`, larger strides divide by `m`.
pub fn upcast(l: &Layout, m: i64) -> Result<Layout> {
    debug_assert!(m >= 1);
    let f = Dim::Static(m);
    fn mode(s: Dim, d: Dim, f: Dim) -> Result<(Dim, Dim)> {
        if d.value() == 0 {
            Ok((s, d))
        } else if d.value() % f.value() == 0 {
            Ok((s, d / f))
        } else if f.value() % d.value().abs() == 0 {
            let chunk = shape_div(f, d.abs())?;
            Ok((shape_div(s, chunk)?, d.sign()))
        } else {
            Err(LayoutError::Divisibility {
                num: d.value(),
                den: f.value(),
            })
        }
    }
    transform_modes(l, |s, d| mode(s, d, f))
}

/// Inverse of `upcast`: elements `n`× smaller. The unit-stride mode grows
/// by `n`, other strides multiply.
pub fn downcast(l: &Layout, n: i64) -> Result<Layout> {
    debug_assert!(n >= 1);
    let f = Dim::Static(n);
    transform_modes(l, |s, d| {
        if d.value().abs() == 1 {
            Ok((s * f, d))
        } else {
            Ok((s, d * f))
        }
    })
}

/// Dispatch on the element-size ratio; sizes must be whole multiples
pub fn recast_layout(l: &Layout, old_size: usize, new_size: usize) -> Result<Layout> {
    if old_size == new_size {
        Ok(l.clone())
    } else if old_size % new_size == 0 {
        downcast(l, (old_size / new_size) as i64)
    } else if new_size % old_size == 0 {
        upcast(l, (new_size / old_size) as i64)
    } else {
        Err(LayoutError::Recast {
            old: old_size,
            new: new_size,
        })
    }
}

fn transform_modes(
    l: &Layout,
    f: impl Fn(Dim, Dim) -> Result<(Dim, Dim)> + Copy,
) -> Result<Layout> {
    fn recur(
        shape: &IntTuple,
        stride: &IntTuple,
        f: impl Fn(Dim, Dim) -> Result<(Dim, Dim)> + Copy,
    ) -> Result<(IntTuple, IntTuple)> {
        match (shape, stride) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                let (s, d) = f(*s, *d)?;
                Ok((IntTuple::Int(s), IntTuple::Int(d)))
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(ds)) => {
                let mut shapes = Vec::with_capacity(ss.len());
                let mut strides = Vec::with_capacity(ss.len());
                for (s, d) in ss.iter().zip(ds) {
                    let (rs, rd) = recur(s, d, f)?;
                    shapes.push(rs);
                    strides.push(rd);
                }
                Ok((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
            }
            _ => unreachable!("congruence holds by construction"),
        }
    }
    let (shape, stride) = recur(l.shape(), l.stride(), f)?;
    Ok(Layout::from_parts(shape, stride))
}

/* ============================================================
   fragments
   ============================================================ */

/// Compact layout shaped like `l`, mode 0 filled first, the remaining
/// modes ordered by their original strides. Dynamic or rank ≤ 1 inputs
/// fall back to plain column-major.
pub fn make_fragment_like(l: &Layout) -> Layout {
    if l.rank() <= 1 || !l.is_static() {
        return Layout::from_shape(l.shape().clone());
    }

    let r = l.rank();
    let mut keys = Vec::with_capacity(r);
    keys.push(i64::MIN); // mode 0 always leads
    for i in 1..r {
        let key = l
            .mode(i)
            .stride()
            .flatten()
            .iter()
            .map(|d| d.value().abs())
            .filter(|&v| v > 0)
            .min()
            .unwrap_or(i64::MAX);
        keys.push(key);
    }

    let mut by_key: Vec<usize> = (0..r).collect();
    by_key.sort_by_key(|&i| (keys[i], i));
    let mut order_of_mode = vec![0i64; r];
    for (pos, &i) in by_key.iter().enumerate() {
        order_of_mode[i] = pos as i64;
    }

    let order = IntTuple::Tuple(
        (0..r)
            .map(|i| l.shape().at(i).repeat_like(Dim::Dyn(order_of_mode[i])))
            .collect(),
    );
    Layout::ordered(l.shape().clone(), &order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lay(shape: IntTuple, stride: IntTuple) -> Layout {
        Layout::new(shape, stride).unwrap()
    }

    /* ---------- coalesce / filter ---------- */

    #[test]
    fn coalesce_merges_and_drops() {
        let l = lay(ituple![2, [1, 6]], ituple![1, [6, 2]]);
        let c = coalesce(&l);
        assert_eq!(c.shape(), &IntTuple::st(12));
        assert_eq!(c.stride(), &IntTuple::st(1));
        assert_eq!(c.size().value(), 12);
        assert_eq!(c.cosize().value(), 12);
    }

    #[test]
    fn coalesce_preserves_function() {
        let cases = [
            lay(ituple![2, [1, 6]], ituple![1, [6, 2]]),
            lay(ituple![4, 6], ituple![1, 8]),
            lay(ituple![2, [2, 2]], ituple![4, [1, 2]]),
            lay(ituple![3, 1, 5], ituple![5, 0, 15]),
        ];
        for l in &cases {
            let c = coalesce(l);
            assert_eq!(c.size(), l.size());
            assert!(c.shape().congruent(c.stride()));
            for i in 0..l.size().value() {
                assert_eq!(c.index(i), l.index(i), "mismatch in {}", l);
            }
        }
    }

    #[test]
    fn coalesce_by_profile_stops_at_mode_boundaries() {
        let l = lay(ituple![[2, 2], [3, 4]], ituple![[1, 2], [4, 12]]);
        let c = coalesce_profile(&l, &ituple![1, 1]);
        assert_eq!(c.shape(), &ituple![4, 12]);
        assert_eq!(c.stride(), &ituple![1, 4]);
    }

    #[test]
    fn coalesce_of_unit_is_unit() {
        let l = lay(ituple![1, 1], ituple![3, 4]);
        assert_eq!(coalesce(&l), Layout::unit());
    }

    #[test]
    fn filter_drops_broadcast_modes() {
        let l = lay(ituple![4, 3], ituple![1, 0]);
        let fz = filter_zeros(&l);
        assert_eq!(fz.shape(), &ituple![4, 1]);
        let f = filter(&l);
        assert_eq!(f.shape(), &IntTuple::st(4));
        assert_eq!(f.stride(), &IntTuple::st(1));
    }

    /* ---------- composition ---------- */

    #[test]
    fn composition_against_strided_vector() {
        let a = lay(IntTuple::st(20), IntTuple::st(2));
        let b = lay(ituple![4, 5], ituple![1, 4]);
        let c = composition(&a, &b).unwrap();
        assert_eq!(c.shape(), &ituple![4, 5]);
        assert_eq!(c.stride(), &ituple![2, 8]);
        assert!(c.is_static());
    }

    #[test]
    fn composition_matches_function_composition() {
        let pairs = [
            (
                lay(IntTuple::st(20), IntTuple::st(2)),
                lay(ituple![4, 5], ituple![1, 4]),
            ),
            (
                lay(ituple![4, 6], ituple![1, 4]),
                lay(ituple![2, 12], ituple![2, 1]),
            ),
            (
                lay(ituple![2, [3, 4]], ituple![12, [1, 3]]),
                lay(ituple![6, 4], ituple![1, 6]),
            ),
            (
                lay(ituple![8, 8], ituple![1, 8]),
                lay(ituple![[2, 2], [2, 2]], ituple![[1, 16], [8, 32]]),
            ),
        ];
        for (a, b) in &pairs {
            let c = composition(a, b).unwrap();
            assert!(c.shape().congruent(c.stride()));
            assert_eq!(c.size(), b.size());
            for i in 0..b.size().value() {
                assert_eq!(c.index(i), a.index(b.index(i)), "{} ∘ {}", a, b);
            }
        }
    }

    #[test]
    fn composition_with_broadcast_mode() {
        let a = lay(ituple![4, 6], ituple![1, 4]);
        let b = lay(IntTuple::st(8), IntTuple::st(0));
        let c = composition(&a, &b).unwrap();
        assert_eq!(c.shape(), &IntTuple::st(8));
        assert_eq!(c.stride(), &IntTuple::st(0));
    }

    #[test]
    fn composition_splits_across_left_modes() {
        // padded columns keep the split from fusing back together
        let a = lay(ituple![4, 6], ituple![1, 8]);
        let b = lay(IntTuple::st(8), IntTuple::st(2));
        let c = composition(&a, &b).unwrap();
        assert_eq!(c.shape(), &ituple![2, 4]);
        assert_eq!(c.stride(), &ituple![2, 8]);
    }

    #[test]
    fn composition_over_identity_coalesces() {
        let a = lay(ituple![4, 6], ituple![1, 4]);
        let b = lay(IntTuple::st(8), IntTuple::st(2));
        let c = composition(&a, &b).unwrap();
        assert_eq!(c.shape(), &IntTuple::st(8));
        assert_eq!(c.stride(), &IntTuple::st(2));
    }

    #[test]
    fn composition_is_associative() {
        let a = lay(ituple![4, 6], ituple![1, 4]);
        let b = lay(ituple![2, 12], ituple![2, 1]);
        let c = lay(ituple![2, 2], ituple![1, 8]);
        let left = composition(&composition(&a, &b).unwrap(), &c).unwrap();
        let right = composition(&a, &composition(&b, &c).unwrap()).unwrap();
        for i in 0..c.size().value() {
            assert_eq!(left.index(i), right.index(i));
        }
    }

    #[test]
    fn composition_reports_non_divisible_tiles() {
        let a = lay(ituple![20], ituple![2]);
        let b = lay(IntTuple::st(5), IntTuple::st(7));
        assert!(matches!(
            composition(&a, &b),
            Err(LayoutError::Divisibility { .. })
        ));
    }

    #[test]
    fn composition_rejects_negative_strides() {
        let a = lay(IntTuple::st(8), IntTuple::st(-1));
        let b = lay(IntTuple::st(4), IntTuple::st(1));
        assert!(matches!(
            composition(&a, &b),
            Err(LayoutError::NegativeStride(-1))
        ));
    }

    #[test]
    fn with_shape_regroups_a_vector() {
        let l = lay(IntTuple::st(20), IntTuple::st(2));
        let r = with_shape(&l, ituple![4, 5]).unwrap();
        assert_eq!(r.shape(), &ituple![4, 5]);
        assert_eq!(r.stride(), &ituple![2, 8]);
    }

    /* ---------- complement ---------- */

    #[test]
    fn complement_of_contiguous_prefix() {
        let l = lay(IntTuple::st(4), IntTuple::st(1));
        let c = complement(&l, Dim::Static(24)).unwrap();
        assert_eq!(c.shape(), &IntTuple::st(6));
        assert_eq!(c.stride(), &IntTuple::st(4));
    }

    #[test]
    fn complement_of_strided_mode_fills_the_gap() {
        let l = lay(IntTuple::st(6), IntTuple::st(4));
        let c = complement(&l, Dim::Static(24)).unwrap();
        assert_eq!(c.size().value(), 4);
        let image: Vec<i64> = (0..4).map(|i| c.index(i)).collect();
        assert_eq!(image, vec![0, 1, 2, 3]);
    }

    #[test]
    fn complement_covers_without_overlap() {
        let cases = [
            (lay(IntTuple::st(4), IntTuple::st(1)), 24),
            (lay(IntTuple::st(6), IntTuple::st(4)), 24),
            (lay(ituple![2, 2], ituple![1, 6]), 24),
            (lay(ituple![2, 2], ituple![1, 2]), 16),
        ];
        for (l, m) in cases {
            let c = complement(&l, Dim::Static(m)).unwrap();
            let joint = Layout::concat(&[l.clone(), c]);
            let mut image: Vec<i64> = (0..joint.size().value()).map(|i| joint.index(i)).collect();
            image.sort_unstable();
            assert_eq!(image, (0..m).collect::<Vec<_>>(), "for {}", l);
        }
    }

    #[test]
    fn complement_images_meet_only_at_zero() {
        let l = lay(IntTuple::st(4), IntTuple::st(1));
        let c = complement(&l, Dim::Static(24)).unwrap();
        let li: Vec<i64> = (1..l.size().value()).map(|i| l.index(i)).collect();
        let ci: Vec<i64> = (1..c.size().value()).map(|i| c.index(i)).collect();
        assert!(li.iter().all(|v| !ci.contains(v)));
    }

    #[test]
    fn complement_of_unit_spans_everything() {
        let c = complement(&Layout::unit(), Dim::Static(10)).unwrap();
        assert_eq!(c.shape(), &IntTuple::st(10));
        assert_eq!(c.stride(), &IntTuple::st(1));
    }

    /* ---------- products ---------- */

    #[test]
    fn logical_product_replays_the_block() {
        let a = lay(ituple![2, 2], ituple![1, 2]);
        let b = lay(ituple![3, 4], ituple![4, 1]);
        let p = logical_product(&a, &b).unwrap();
        assert_eq!(p.shape(), &ituple![[2, 2], [3, 4]]);
        assert_eq!(p.stride(), &ituple![[1, 2], [16, 4]]);
    }

    #[test]
    fn blocked_product_pairs_modes() {
        let a = Layout::from_shape(ituple![2, 2]);
        let b = lay(ituple![3, 4], ituple![4, 1]);
        let p = blocked_product(&a, &b, false).unwrap();
        assert_eq!(p.shape(), &ituple![[2, 3], [2, 4]]);
        assert_eq!(p.stride(), &ituple![[1, 16], [2, 4]]);
    }

    #[test]
    fn raked_product_interleaves_modes() {
        let a = Layout::from_shape(ituple![2, 2]);
        let b = lay(ituple![3, 4], ituple![4, 1]);
        let p = raked_product(&a, &b, false).unwrap();
        assert_eq!(p.shape(), &ituple![[3, 2], [4, 2]]);
        assert_eq!(p.stride(), &ituple![[16, 1], [4, 2]]);
    }

    #[test]
    fn product_then_divide_roundtrips() {
        let t = lay(ituple![2, 2], ituple![1, 2]);
        let m = lay(ituple![3, 4], ituple![4, 1]);
        let p = logical_product(&t, &m).unwrap();
        let d = logical_divide(&p, &Tiler::Tile(t.clone())).unwrap();
        assert_eq!(coalesce(&d.mode(0)), coalesce(&t));
        assert_eq!(d.size(), p.size());
        for i in 0..p.size().value() {
            assert_eq!(d.index(i), p.index(i));
        }
    }

    /* ---------- divides ---------- */

    #[test]
    fn zipped_divide_groups_tile_and_rest() {
        let l = lay(ituple![[3, 2], [4, 2]], ituple![[16, 1], [4, 2]]);
        let tiler = Tiler::Tuple(vec![
            Tiler::Tile(lay(IntTuple::st(2), IntTuple::st(3))),
            Tiler::Tile(lay(IntTuple::st(2), IntTuple::st(4))),
        ]);
        let z = zipped_divide(&l, &tiler).unwrap();
        assert_eq!(z.shape(), &ituple![[2, 2], [3, 4]]);
        assert_eq!(z.stride(), &ituple![[1, 2], [16, 4]]);
    }

    #[test]
    fn zipped_divide_passes_wildcard_modes_through() {
        let l = Layout::from_shape(ituple![8, 5]);
        let tiler = Tiler::Tuple(vec![
            Tiler::Tile(Layout::from_shape(IntTuple::st(4))),
            Tiler::Wild,
        ]);
        let z = zipped_divide(&l, &tiler).unwrap();
        assert_eq!(z.shape(), &ituple![[4], [2, 5]]);
        assert_eq!(z.stride(), &ituple![[1], [4, 8]]);
    }

    #[test]
    fn tiled_divide_unpacks_the_rest_modes() {
        let l = lay(ituple![[3, 2], [4, 2]], ituple![[16, 1], [4, 2]]);
        let tiler = Tiler::Tuple(vec![
            Tiler::Tile(lay(IntTuple::st(2), IntTuple::st(3))),
            Tiler::Tile(lay(IntTuple::st(2), IntTuple::st(4))),
        ]);
        let t = tiled_divide(&l, &tiler).unwrap();
        assert_eq!(t.rank(), 3);
        assert_eq!(t.shape(), &ituple![[2, 2], 3, 4]);
    }

    #[test]
    fn divide_by_shape_tiles_compactly() {
        let l = Layout::from_shape(ituple![8, 6]);
        let z = zipped_divide(&l, &Tiler::from_shape(&ituple![2, 3])).unwrap();
        assert_eq!(z.shape(), &ituple![[2, 3], [4, 2]]);
        // tile mode walks the tile, rest mode jumps between tiles
        assert_eq!(z.stride(), &ituple![[1, 8], [2, 24]]);
    }

    #[test]
    fn divide_rank_mismatch_is_reported() {
        let l = Layout::from_shape(ituple![8, 6]);
        let t = Tiler::Tuple(vec![Tiler::Wild, Tiler::Wild, Tiler::Wild]);
        assert!(matches!(
            logical_divide(&l, &t),
            Err(LayoutError::RankMismatch { expected: 2, got: 3 })
        ));
    }

    /* ---------- inverses ---------- */

    #[test]
    fn right_inverse_round_trips() {
        let cases = [
            lay(ituple![2, 4], ituple![4, 1]),
            lay(ituple![4, 4], ituple![1, 4]),
            lay(ituple![2, [3, 4]], ituple![12, [1, 3]]),
        ];
        for l in &cases {
            let r = right_inverse(l);
            assert!(r.size().value() > 1, "no unit-stride chain in {}", l);
            for x in 0..r.size().value() {
                assert_eq!(l.index(r.index(x)), x, "for {}", l);
            }
        }
    }

    #[test]
    fn right_inverse_without_unit_stride_is_unit() {
        let l = lay(IntTuple::st(6), IntTuple::st(4));
        assert_eq!(right_inverse(&l), Layout::unit());
    }

    #[test]
    fn left_inverse_recovers_coordinates() {
        let l = lay(IntTuple::st(6), IntTuple::st(4));
        let inv = left_inverse(&l).unwrap();
        for c in 0..l.size().value() {
            assert_eq!(inv.index(l.index(c)), c);
        }
    }

    /* ---------- max common ---------- */

    #[test]
    fn common_vector_of_identical_layouts_is_their_size() {
        let l = Layout::from_shape(ituple![4, 4]);
        assert_eq!(max_common_vector(&l, &l).value(), 16);
    }

    #[test]
    fn common_vector_across_a_transpose_is_one() {
        let a = Layout::from_shape(ituple![4, 4]);
        let b = Layout::row_major(ituple![4, 4]);
        assert_eq!(max_common_vector(&a, &b).value(), 1);
    }

    #[test]
    fn common_vector_limited_by_padding() {
        let a = lay(ituple![4, 4], ituple![1, 8]);
        let b = Layout::from_shape(ituple![4, 4]);
        assert_eq!(max_common_vector(&a, &b).value(), 4);
    }

    #[test]
    fn common_vector_needs_static_layouts() {
        let a = Layout::from_shape(ituple![4, 4]);
        let b = Layout::from_shape(IntTuple::Tuple(vec![
            IntTuple::dy(4),
            IntTuple::dy(4),
        ]));
        assert_eq!(max_common_vector(&a, &b).value(), 1);
    }

    /* ---------- recast ---------- */

    #[test]
    fn upcast_halves_the_contiguous_mode() {
        let l = lay(ituple![2, 4], ituple![1, 2]);
        let u = upcast(&l, 2).unwrap();
        assert_eq!(u.shape(), &ituple![1, 4]);
        assert_eq!(u.stride(), &ituple![1, 1]);
        assert_eq!(coalesce(&u).shape(), &IntTuple::st(4));
        assert_eq!(coalesce(&u).stride(), &IntTuple::st(1));
    }

    #[test]
    fn upcast_keeps_broadcast_modes() {
        let l = lay(ituple![4, 3], ituple![1, 0]);
        let u = upcast(&l, 2).unwrap();
        assert_eq!(u.shape(), &ituple![2, 3]);
        assert_eq!(u.stride(), &ituple![1, 0]);
    }

    #[test]
    fn downcast_doubles_the_contiguous_mode() {
        let l = lay(ituple![2, 3], ituple![1, 2]);
        let d = downcast(&l, 2).unwrap();
        assert_eq!(d.shape(), &ituple![4, 3]);
        assert_eq!(d.stride(), &ituple![1, 4]);
    }

    #[test]
    fn recast_round_trips() {
        let l = lay(ituple![2, 3], ituple![1, 2]);
        let narrowed = recast_layout(&l, 4, 2).unwrap();
        assert_eq!(narrowed.shape(), &ituple![4, 3]);
        let back = recast_layout(&narrowed, 2, 4).unwrap();
        assert_eq!(back, l);
    }

    #[test]
    fn recast_rejects_incommensurate_sizes() {
        let l = Layout::from_shape(ituple![4]);
        assert!(matches!(
            recast_layout(&l, 4, 3),
            Err(LayoutError::Recast { old: 4, new: 3 })
        ));
    }

    /* ---------- fragments ---------- */

    #[test]
    fn fragment_layout_is_compact_and_stride_ordered() {
        let l = lay(ituple![4, 8, 2], ituple![2, 16, 1]);
        let f = make_fragment_like(&l);
        assert_eq!(f.shape(), l.shape());
        assert_eq!(f.cosize(), f.size());
        // mode 0 first, then mode 2 (stride 1) before mode 1 (stride 16)
        assert_eq!(f.stride(), &ituple![1, 8, 4]);
    }

    #[test]
    fn fragment_of_dynamic_layout_falls_back_to_col_major() {
        let shape = IntTuple::Tuple(vec![IntTuple::dy(4), IntTuple::dy(3)]);
        let l = Layout::row_major(shape.clone());
        let f = make_fragment_like(&l);
        assert_eq!(f, Layout::from_shape(shape));
    }

    /* ---------- randomized invariants ---------- */

    #[test]
    fn randomized_composition_law() {
        use rand::Rng;
        let mut rng = rand::rng();

        for _ in 0..200 {
            // compact col-major a over a random shape, b tiling its domain
            let s1 = rng.random_range(2..5i64);
            let s2 = rng.random_range(2..5i64);
            let s3 = rng.random_range(2..5i64);
            let a = Layout::from_shape(IntTuple::Tuple(vec![
                IntTuple::st(s1 * s2),
                IntTuple::st(s3),
            ]));
            let b = lay(
                IntTuple::Tuple(vec![IntTuple::st(s1), IntTuple::st(s2)]),
                IntTuple::Tuple(vec![IntTuple::st(1), IntTuple::st(s1)]),
            );
            let c = composition(&a, &b).unwrap();
            for i in 0..b.size().value() {
                assert_eq!(c.index(i), a.index(b.index(i)));
            }
        }
    }
}
