//! Component algebra: atoms, bins and parametric tails, and the pairwise
//! convolution rules between them (spec §4.1).

use crate::error::EvalError;

/// Which half-line a [`Tail`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// The shape a [`Bin`]'s mass takes across its interval. Only `Uniform` is
/// required by core arithmetic; the others are accepted as pass-through
/// metadata on bins produced by non-arithmetic constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinShape {
    Uniform,
    Linear,
    Custom,
}

/// Parametric tail family. Only `Exp` participates in core arithmetic
/// (convolution, mean, variance, ProbGT); the others are carried as
/// pass-through data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailFamily {
    Exp,
    Geom,
    Pareto,
    Lognormal,
}

/// One piece of a [`crate::distribution::Distribution`] mixture.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Atom {
        x: f64,
        p: f64,
    },
    Bin {
        a: f64,
        b: f64,
        p: f64,
        repr: f64,
        shape: BinShape,
    },
    Tail {
        side: Side,
        x0: f64,
        mass: f64,
        family: TailFamily,
        /// Exponential rate; meaningless for non-`Exp` families.
        lambda: f64,
        cap: Option<f64>,
    },
}

impl Component {
    pub fn atom(x: f64, p: f64) -> Self {
        Component::Atom { x, p }
    }

    pub fn bin(a: f64, b: f64, p: f64) -> Result<Self, EvalError> {
        Self::bin_shaped(a, b, p, (a + b) / 2.0, BinShape::Uniform)
    }

    pub fn bin_shaped(a: f64, b: f64, p: f64, repr: f64, shape: BinShape) -> Result<Self, EvalError> {
        if !(a < b) {
            return Err(EvalError::argument(format!(
                "bin requires a < b, got [{}, {}]",
                a, b
            )));
        }
        Ok(Component::Bin { a, b, p, repr, shape })
    }

    pub fn exp_tail(side: Side, x0: f64, mass: f64, lambda: f64) -> Self {
        Component::Tail {
            side,
            x0,
            mass,
            family: TailFamily::Exp,
            lambda,
            cap: None,
        }
    }

    /// The probability mass carried by this component.
    pub fn mass(&self) -> f64 {
        match self {
            Component::Atom { p, .. } => *p,
            Component::Bin { p, .. } => *p,
            Component::Tail { mass, .. } => *mass,
        }
    }

    pub fn with_mass(&self, mass: f64) -> Component {
        let mut c = self.clone();
        match &mut c {
            Component::Atom { p, .. } => *p = mass,
            Component::Bin { p, .. } => *p = mass,
            Component::Tail { mass: m, .. } => *m = mass,
        }
        c
    }

    /// The sort key used to order components within a distribution: a left
    /// tail sorts as `-infinity`, an atom at its `x`, a bin at its `a`, a
    /// right tail at its `x0`.
    pub fn sort_key(&self) -> f64 {
        match self {
            Component::Atom { x, .. } => *x,
            Component::Bin { a, .. } => *a,
            Component::Tail {
                side: Side::Left, ..
            } => f64::NEG_INFINITY,
            Component::Tail {
                side: Side::Right,
                x0,
                ..
            } => *x0,
        }
    }

    /// Start of the component's support, used by the reducer's boundary
    /// predicate. For a left tail this is `-infinity`.
    pub fn start(&self) -> f64 {
        match self {
            Component::Atom { x, .. } => *x,
            Component::Bin { a, .. } => *a,
            Component::Tail { side: Side::Left, .. } => f64::NEG_INFINITY,
            Component::Tail {
                side: Side::Right,
                x0,
                ..
            } => *x0,
        }
    }

    /// End of the component's support. For a right tail this is `+infinity`.
    pub fn end(&self) -> f64 {
        match self {
            Component::Atom { x, .. } => *x,
            Component::Bin { b, .. } => *b,
            Component::Tail { side: Side::Left, x0, .. } => *x0,
            Component::Tail {
                side: Side::Right, ..
            } => f64::INFINITY,
        }
    }

    pub fn is_tail(&self) -> bool {
        matches!(self, Component::Tail { .. })
    }

    /// Representative point, used by the reducer's importance metric and as
    /// the merge centroid.
    pub fn repr(&self) -> f64 {
        match self {
            Component::Atom { x, .. } => *x,
            Component::Bin { repr, .. } => *repr,
            Component::Tail { x0, side, lambda, .. } => match side {
                Side::Right => x0 + 1.0 / lambda.max(1e-12),
                Side::Left => x0 - 1.0 / lambda.max(1e-12),
            },
        }
    }

    pub fn scale_probability(&self, k: f64) -> Component {
        self.with_mass(self.mass() * k)
    }

    /// Shift every point of this component's support by `dx`.
    pub fn shift(&self, dx: f64) -> Component {
        match self.clone() {
            Component::Atom { x, p } => Component::Atom { x: x + dx, p },
            Component::Bin {
                a,
                b,
                p,
                repr,
                shape,
            } => Component::Bin {
                a: a + dx,
                b: b + dx,
                p,
                repr: repr + dx,
                shape,
            },
            Component::Tail {
                side,
                x0,
                mass,
                family,
                lambda,
                cap,
            } => Component::Tail {
                side,
                x0: x0 + dx,
                mass,
                family,
                lambda,
                cap,
            },
        }
    }

    /// Scale every point of this component's support by `k` (arithmetic
    /// scaling, distinct from [`Component::scale_probability`]). Tails are
    /// left unchanged per spec §4.2 "Scale".
    pub fn scale_support(&self, k: f64) -> Component {
        match self.clone() {
            Component::Atom { x, p } => Component::Atom { x: x * k, p },
            Component::Bin {
                a,
                b,
                p,
                repr,
                shape,
            } => {
                let (lo, hi) = (a * k, b * k);
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                Component::Bin {
                    a: lo,
                    b: hi,
                    p,
                    repr: repr * k,
                    shape,
                }
            }
            t @ Component::Tail { .. } => t,
        }
    }
}

/// Pairwise convolution of two non-tail components, per spec §4.1.
/// `Any ⊕ Tail` is dropped (documented mass-lossy approximation) and
/// returns `None`.
pub fn convolve_pair(a: &Component, b: &Component) -> Option<Component> {
    if a.is_tail() || b.is_tail() {
        return None;
    }
    let p = a.mass() * b.mass();
    match (a, b) {
        (Component::Atom { x: x1, .. }, Component::Atom { x: x2, .. }) => {
            Some(Component::Atom { x: x1 + x2, p })
        }
        (Component::Atom { x, .. }, Component::Bin { a: ba, b: bb, repr, shape, .. }) => {
            Some(Component::Bin {
                a: ba + x,
                b: bb + x,
                p,
                repr: repr + x,
                shape: *shape,
            })
        }
        (Component::Bin { a: ba, b: bb, repr, shape, .. }, Component::Atom { x, .. }) => {
            Some(Component::Bin {
                a: ba + x,
                b: bb + x,
                p,
                repr: repr + x,
                shape: *shape,
            })
        }
        (
            Component::Bin {
                a: a1, b: b1, ..
            },
            Component::Bin {
                a: a2, b: b2, ..
            },
        ) => {
            // Uniform-of-uniforms approximation: variance-matched uniform
            // rather than the exact triangular distribution.
            let w1 = b1 - a1;
            let w2 = b2 - a2;
            let v1 = w1 * w1 / 12.0;
            let v2 = w2 * w2 / 12.0;
            let v = v1 + v2;
            let w = (12.0 * v).sqrt();
            let center1 = (a1 + b1) / 2.0;
            let center2 = (a2 + b2) / 2.0;
            let center = center1 + center2;
            let lo = center - w / 2.0;
            let hi = center + w / 2.0;
            if lo < hi {
                Some(Component::Bin {
                    a: lo,
                    b: hi,
                    p,
                    repr: center,
                    shape: BinShape::Uniform,
                })
            } else {
                // Degenerate (zero-width) input bins collapse to an atom.
                Some(Component::Atom { x: center, p })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn atom_convolution_adds_positions() {
        let a = Component::atom(2.0, 0.5);
        let b = Component::atom(3.0, 0.4);
        let c = convolve_pair(&a, &b).unwrap();
        assert_eq!(c, Component::Atom { x: 5.0, p: 0.2 });
    }

    #[test]
    fn atom_bin_convolution_shifts_bin() {
        let a = Component::atom(1.0, 0.5);
        let b = Component::bin(0.0, 2.0, 0.5).unwrap();
        let c = convolve_pair(&a, &b).unwrap();
        match c {
            Component::Bin { a, b, p, repr, .. } => {
                assert_eq!((a, b, p, repr), (1.0, 3.0, 0.25, 2.0));
            }
            _ => panic!("expected bin"),
        }
    }

    #[test]
    fn bin_bin_convolution_matches_variance() {
        let a = Component::bin(0.0, 2.0, 1.0).unwrap();
        let b = Component::bin(0.0, 2.0, 1.0).unwrap();
        let c = convolve_pair(&a, &b).unwrap();
        match c {
            Component::Bin { a, b, repr, .. } => {
                let w = b - a;
                let v = w * w / 12.0;
                assert!((v - (2.0 / 12.0 * 2.0)).abs() < 1e-9);
                assert!((repr - 2.0).abs() < 1e-9);
            }
            _ => panic!("expected bin"),
        }
    }

    #[test]
    fn tail_convolution_is_dropped() {
        let a = Component::atom(1.0, 0.5);
        let t = Component::exp_tail(Side::Right, 0.0, 0.5, 1.0);
        assert!(convolve_pair(&a, &t).is_none());
    }

    #[test]
    fn bin_rejects_degenerate_interval() {
        assert!(Component::bin(1.0, 1.0, 1.0).is_err());
        assert!(Component::bin(2.0, 1.0, 1.0).is_err());
    }
}
