use core::fmt;

use smallvec::SmallVec;

use crate::dim::Dim;

/// Flattened leaf sequence; inline storage covers typical ranks
pub type FlatDims = SmallVec<[Dim; 8]>;

/// Hierarchical integer tuple: a leaf value or an ordered sequence of
/// sub-tuples. Shapes, strides and coordinates are all `IntTuple`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntTuple {
    Int(Dim),
    Tuple(Vec<IntTuple>),
}

/// Builds an `IntTuple` of static leaves; brackets nest:
/// `ituple![2, [1, 6]]` is `(2,(1,6))`.
#[macro_export]
macro_rules! ituple {
    ($($x:tt),+ $(,)?) => {
        $crate::tuple::IntTuple::Tuple(vec![$($crate::ituple!(@e $x)),+])
    };
    (@e [$($x:tt),+ $(,)?]) => {
        $crate::tuple::IntTuple::Tuple(vec![$($crate::ituple!(@e $x)),+])
    };
    (@e $x:expr) => {
        $crate::tuple::IntTuple::Int($crate::dim::Dim::Static($x))
    };
}

impl IntTuple {
    /// Static leaf
    pub fn st(v: i64) -> Self {
        IntTuple::Int(Dim::Static(v))
    }

    /// Dynamic leaf
    pub fn dy(v: i64) -> Self {
        IntTuple::Int(Dim::Dyn(v))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, IntTuple::Int(_))
    }

    pub fn leaf(&self) -> Option<Dim> {
        match self {
            IntTuple::Int(d) => Some(*d),
            IntTuple::Tuple(_) => None,
        }
    }

    /// 0 for a leaf, else the top-level length
    pub fn rank(&self) -> usize {
        match self {
            IntTuple::Int(_) => 0,
            IntTuple::Tuple(v) => v.len(),
        }
    }

    /// 0 for a leaf, else 1 + max depth of children
    pub fn depth(&self) -> usize {
        match self {
            IntTuple::Int(_) => 0,
            IntTuple::Tuple(v) => 1 + v.iter().map(IntTuple::depth).max().unwrap_or(0),
        }
    }

    /// Top-level entries; a leaf is its own single mode
    pub fn modes(&self) -> &[IntTuple] {
        match self {
            IntTuple::Int(_) => core::slice::from_ref(self),
            IntTuple::Tuple(v) => v,
        }
    }

    pub fn at(&self, i: usize) -> &IntTuple {
        &self.modes()[i]
    }

    /// Product of all leaves, staticness joined
    pub fn size(&self) -> Dim {
        match self {
            IntTuple::Int(d) => *d,
            IntTuple::Tuple(v) => v.iter().fold(Dim::ONE, |acc, t| acc * t.size()),
        }
    }

    /// True when every leaf is static
    pub fn is_static(&self) -> bool {
        match self {
            IntTuple::Int(d) => d.is_static(),
            IntTuple::Tuple(v) => v.iter().all(IntTuple::is_static),
        }
    }

    /// Post-order leaf sequence
    pub fn flatten(&self) -> FlatDims {
        fn recur(t: &IntTuple, out: &mut FlatDims) {
            match t {
                IntTuple::Int(d) => out.push(*d),
                IntTuple::Tuple(v) => v.iter().for_each(|c| recur(c, out)),
            }
        }
        let mut out = FlatDims::new();
        recur(self, &mut out);
        out
    }

    /// Identical tree structure, leaf values ignored
    pub fn congruent(&self, other: &IntTuple) -> bool {
        match (self, other) {
            (IntTuple::Int(_), IntTuple::Int(_)) => true,
            (IntTuple::Tuple(a), IntTuple::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.congruent(y))
            }
            _ => false,
        }
    }

    /// True when `self` is congruent to a leaf-restriction of `other`:
    /// every leaf of `self` stands for a whole subtree of `other`
    pub fn weakly_congruent(&self, other: &IntTuple) -> bool {
        match (self, other) {
            (IntTuple::Int(_), _) => true,
            (IntTuple::Tuple(a), IntTuple::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.weakly_congruent(y))
            }
            _ => false,
        }
    }

    /// Tree with `self`'s structure and leaves taken in order from `leaves`
    pub fn from_flat(&self, leaves: &[Dim]) -> IntTuple {
        fn recur(t: &IntTuple, leaves: &[Dim], pos: &mut usize) -> IntTuple {
            match t {
                IntTuple::Int(_) => {
                    let d = leaves[*pos];
                    *pos += 1;
                    IntTuple::Int(d)
                }
                IntTuple::Tuple(v) => {
                    IntTuple::Tuple(v.iter().map(|c| recur(c, leaves, pos)).collect())
                }
            }
        }
        let mut pos = 0;
        let out = recur(self, leaves, &mut pos);
        assert_eq!(pos, leaves.len(), "from_flat: leaf count mismatch");
        out
    }

    /// Tree with `self`'s structure, every leaf replaced by `x`
    pub fn repeat_like(&self, x: Dim) -> IntTuple {
        match self {
            IntTuple::Int(_) => IntTuple::Int(x),
            IntTuple::Tuple(v) => {
                IntTuple::Tuple(v.iter().map(|t| t.repeat_like(x)).collect())
            }
        }
    }

    /* ---------- top-level edits (0-based positions) ---------- */

    pub fn insert(&self, x: IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v.insert(n, x);
        IntTuple::Tuple(v)
    }

    pub fn remove(&self, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v.remove(n);
        IntTuple::Tuple(v)
    }

    pub fn replace(&self, x: IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v[n] = x;
        IntTuple::Tuple(v)
    }

    /// Pad right with copies of `x` until rank `n`
    pub fn append(&self, x: &IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        assert!(v.len() <= n, "append: rank {} exceeds target {}", v.len(), n);
        v.resize(n, x.clone());
        IntTuple::Tuple(v)
    }

    /// Pad left with copies of `x` until rank `n`
    pub fn prepend(&self, x: &IntTuple, n: usize) -> IntTuple {
        let v = self.modes();
        assert!(v.len() <= n, "prepend: rank {} exceeds target {}", v.len(), n);
        let mut out = vec![x.clone(); n - v.len()];
        out.extend_from_slice(v);
        IntTuple::Tuple(out)
    }

    /// Wrap top-level entries `[b, e)` into a nested tuple
    pub fn group(&self, b: usize, e: usize) -> IntTuple {
        let v = self.modes();
        let mut out = Vec::with_capacity(v.len() - (e - b) + 1);
        out.extend_from_slice(&v[..b]);
        out.push(IntTuple::Tuple(v[b..e].to_vec()));
        out.extend_from_slice(&v[e..]);
        IntTuple::Tuple(out)
    }
}

/// Rank-preserving zip of equal-rank tuples: entry `i` of the result
/// gathers entry `i` of every input
pub fn zip(parts: &[&IntTuple]) -> IntTuple {
    let rank = parts[0].rank().max(1);
    assert!(
        parts.iter().all(|p| p.rank().max(1) == rank),
        "zip: rank mismatch"
    );
    IntTuple::Tuple(
        (0..rank)
            .map(|i| IntTuple::Tuple(parts.iter().map(|p| p.at(i).clone()).collect()))
            .collect(),
    )
}

/// Exclusive scan over the top-level entry sizes: entry `k` of the result
/// is `f` folded over entries `0..k`, starting from `init`
pub fn escan(t: &IntTuple, init: Dim, f: impl Fn(Dim, Dim) -> Dim) -> IntTuple {
    let mut acc = init;
    let mut out = Vec::with_capacity(t.rank().max(1));
    for m in t.modes() {
        out.push(IntTuple::Int(acc));
        acc = f(acc, m.size());
    }
    IntTuple::Tuple(out)
}

impl From<Dim> for IntTuple {
    fn from(d: Dim) -> Self {
        IntTuple::Int(d)
    }
}

impl fmt::Display for IntTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntTuple::Int(d) => write!(f, "{}", d),
            IntTuple::Tuple(v) => {
                write!(f, "(")?;
                for (i, t) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_depth_size() {
        let t = ituple![2, [1, 6]];
        assert_eq!(t.rank(), 2);
        assert_eq!(t.depth(), 2);
        assert_eq!(t.size().value(), 12);

        let leaf = IntTuple::st(5);
        assert_eq!(leaf.rank(), 0);
        assert_eq!(leaf.depth(), 0);
        assert_eq!(leaf.size().value(), 5);
    }

    #[test]
    fn flatten_is_postorder() {
        let t = ituple![2, [3, [4, 5]], 6];
        let flat: Vec<i64> = t.flatten().iter().map(|d| d.value()).collect();
        assert_eq!(flat, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn congruence() {
        let a = ituple![2, [3, 4]];
        let b = ituple![7, [8, 9]];
        let c = ituple![[2, 3], 4];
        assert!(a.congruent(&b));
        assert!(!a.congruent(&c));
        assert!(!a.congruent(&IntTuple::st(2)));
    }

    #[test]
    fn weak_congruence_is_one_sided() {
        let coarse = ituple![2, 3];
        let fine = ituple![2, [3, 4]];
        assert!(coarse.weakly_congruent(&fine));
        assert!(!fine.weakly_congruent(&coarse));
        assert!(IntTuple::st(1).weakly_congruent(&fine));
    }

    #[test]
    fn edits() {
        let t = ituple![2, 3, 4];
        assert_eq!(t.insert(IntTuple::st(9), 1), ituple![2, 9, 3, 4]);
        assert_eq!(t.remove(0), ituple![3, 4]);
        assert_eq!(t.replace(IntTuple::st(7), 2), ituple![2, 3, 7]);
        assert_eq!(t.append(&IntTuple::st(1), 5), ituple![2, 3, 4, 1, 1]);
        assert_eq!(t.prepend(&IntTuple::st(1), 4), ituple![1, 2, 3, 4]);
        assert_eq!(t.group(1, 3), ituple![2, [3, 4]]);
    }

    #[test]
    fn zip_is_rank_preserving() {
        let a = ituple![2, 3];
        let b = ituple![4, 5];
        assert_eq!(zip(&[&a, &b]), ituple![[2, 4], [3, 5]]);
    }

    #[test]
    fn escan_products() {
        let t = ituple![2, 3, 4];
        let scanned = escan(&t, Dim::ONE, |a, b| a * b);
        assert_eq!(scanned, ituple![1, 2, 6]);
    }

    #[test]
    fn repeat_like_keeps_structure() {
        let t = ituple![2, [3, 4]];
        let r = t.repeat_like(Dim::ZERO);
        assert!(r.congruent(&t));
        assert!(r.flatten().iter().all(|d| d.value() == 0));
    }

    #[test]
    fn display_matches_notation() {
        let t = ituple![2, [1, 6]];
        assert_eq!(t.to_string(), "(_2,(_1,_6))");
        assert_eq!(IntTuple::dy(7).to_string(), "7");
    }
}
