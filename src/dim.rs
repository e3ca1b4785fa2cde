use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// Integer that is either compile-time static or runtime dynamic.
///
/// Convention:
/// - `Static(v)` → value known at build time
/// - `Dyn(v)` → value known only at runtime
///
/// Arithmetic between two static values yields a static value; anything
/// involving a dynamic value yields a dynamic value.
#[derive(Debug, Clone, Copy)]
pub enum Dim {
    /// Build-time constant
    Static(i64),

    /// Runtime value
    Dyn(i64),
}

impl Dim {
    pub const ZERO: Dim = Dim::Static(0);
    pub const ONE: Dim = Dim::Static(1);

    /// Concrete value of the dimension
    #[inline(always)]
    pub const fn value(self) -> i64 {
        match self {
            Dim::Static(v) => v,
            Dim::Dyn(v) => v,
        }
    }

    /// Returns true if the value is compile-time static
    #[inline(always)]
    pub const fn is_static(self) -> bool {
        matches!(self, Dim::Static(_))
    }

    /// Same value, tagged with the join of both operands' staticness
    #[inline]
    fn tag(self, other: Dim, v: i64) -> Dim {
        if self.is_static() && other.is_static() {
            Dim::Static(v)
        } else {
            Dim::Dyn(v)
        }
    }

    /// Same value, staticness preserved
    #[inline]
    fn retag(self, v: i64) -> Dim {
        match self {
            Dim::Static(_) => Dim::Static(v),
            Dim::Dyn(_) => Dim::Dyn(v),
        }
    }

    pub fn abs(self) -> Dim {
        self.retag(self.value().abs())
    }

    /// -1, 0, or 1, staticness preserved
    pub fn sign(self) -> Dim {
        self.retag(self.value().signum())
    }

    pub fn min(self, other: Dim) -> Dim {
        self.tag(other, self.value().min(other.value()))
    }

    pub fn max(self, other: Dim) -> Dim {
        self.tag(other, self.value().max(other.value()))
    }

    /// Quotient and remainder in one step
    pub fn divrem(self, other: Dim) -> (Dim, Dim) {
        let q = self.value() / other.value();
        let r = self.value() % other.value();
        (self.tag(other, q), self.tag(other, r))
    }
}

impl Default for Dim {
    fn default() -> Self {
        Dim::ZERO
    }
}

/// Value equality; staticness is provenance, not identity
impl PartialEq for Dim {
    fn eq(&self, other: &Dim) -> bool {
        self.value() == other.value()
    }
}

impl Eq for Dim {}

impl PartialOrd for Dim {
    fn partial_cmp(&self, other: &Dim) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dim {
    fn cmp(&self, other: &Dim) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl Add for Dim {
    type Output = Dim;
    fn add(self, rhs: Dim) -> Dim {
        self.tag(rhs, self.value() + rhs.value())
    }
}

impl Sub for Dim {
    type Output = Dim;
    fn sub(self, rhs: Dim) -> Dim {
        self.tag(rhs, self.value() - rhs.value())
    }
}

impl Mul for Dim {
    type Output = Dim;
    fn mul(self, rhs: Dim) -> Dim {
        self.tag(rhs, self.value() * rhs.value())
    }
}

impl Div for Dim {
    type Output = Dim;
    fn div(self, rhs: Dim) -> Dim {
        self.tag(rhs, self.value() / rhs.value())
    }
}

impl Rem for Dim {
    type Output = Dim;
    fn rem(self, rhs: Dim) -> Dim {
        self.tag(rhs, self.value() % rhs.value())
    }
}

impl Neg for Dim {
    type Output = Dim;
    fn neg(self) -> Dim {
        self.retag(-self.value())
    }
}

/// Plain integers convert to dynamic dimensions
impl From<i64> for Dim {
    fn from(v: i64) -> Self {
        Dim::Dyn(v)
    }
}

/// Display format:
/// - Static dimensions are prefixed with `_`
/// - Dynamic dimensions print the value
impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Dim::Static(v) => write!(f, "_{}", v),
            Dim::Dyn(v) => write!(f, "{}", v),
        }
    }
}
