//! The distribution container: an ordered mixture of components with
//! normalization, arithmetic, summary statistics and sampling (spec §4.2).

use crate::alias::AliasTable;
use crate::callbacks::Accelerator;
use crate::component::{convolve_pair, Component, Side, TailFamily};
use crate::error::{EvalError, EvalResult};
use rand::Rng;
use statrs::distribution::{Continuous, ContinuousCDF, Exp, Normal};
use std::fmt;

const MASS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub components: Vec<Component>,
}

impl Distribution {
    pub fn empty() -> Self {
        Distribution { components: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn from_components(components: Vec<Component>) -> Self {
        let mut d = Distribution { components };
        d.sort();
        d
    }

    pub fn atom(x: f64, p: f64) -> Self {
        Self::from_components(vec![Component::atom(x, p)])
    }

    pub fn uniform(min: f64, max: f64) -> EvalResult<Self> {
        Ok(Self::from_components(vec![Component::bin(min, max, 1.0)?]))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    fn sort(&mut self) {
        self.components
            .sort_by(|a, b| a.sort_key().partial_cmp(&b.sort_key()).unwrap_or(std::cmp::Ordering::Equal));
    }

    pub fn total_mass(&self) -> f64 {
        self.components.iter().map(|c| c.mass()).sum()
    }

    /// Rescale every component's mass so the total equals 1, when the total
    /// is strictly positive and meaningfully different from 1.
    pub fn normalize(&self) -> Distribution {
        let total = self.total_mass();
        if total <= 0.0 || (total - 1.0).abs() <= MASS_TOLERANCE {
            return self.clone();
        }
        let components = self
            .components
            .iter()
            .map(|c| c.scale_probability(1.0 / total))
            .collect();
        Distribution { components }
    }

    /// Independent sum: Cartesian product of components via pairwise
    /// convolution (spec §4.1), producing up to `k1*k2` components.
    pub fn add(&self, other: &Distribution) -> Distribution {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut out = Vec::with_capacity(self.components.len() * other.components.len());
        for a in &self.components {
            for b in &other.components {
                if let Some(c) = convolve_pair(a, b) {
                    out.push(c);
                }
                // Any ⊕ Tail is dropped per spec §4.1: mass is lost.
            }
        }
        Distribution::from_components(out)
    }

    pub fn subtract(&self, other: &Distribution) -> Distribution {
        self.add(&other.scale(-1.0))
    }

    /// Scale the support of every component by `k` (atoms' `x`, bin
    /// endpoints and repr); tails are left unchanged (spec §4.2 "Scale").
    pub fn scale(&self, k: f64) -> Distribution {
        let components = self.components.iter().map(|c| c.scale_support(k)).collect();
        Distribution::from_components(components)
    }

    /// Translate every component's support by `dx`. Unlike [`Distribution::add`]
    /// this is an exact deterministic shift with no convolution, so tail
    /// mass is preserved rather than dropped.
    pub fn shift(&self, dx: f64) -> Distribution {
        let components = self.components.iter().map(|c| c.shift(dx)).collect();
        Distribution::from_components(components)
    }

    /// Probabilistic mixture: `(1-p)*self + p*other`.
    pub fn mix(&self, other: &Distribution, p: f64) -> EvalResult<Distribution> {
        if !(0.0..=1.0).contains(&p) {
            return Err(EvalError::argument(format!("mix weight {} not in [0,1]", p)));
        }
        let mut components: Vec<Component> = self
            .components
            .iter()
            .map(|c| c.scale_probability(1.0 - p))
            .collect();
        components.extend(other.components.iter().map(|c| c.scale_probability(p)));
        Ok(Distribution::from_components(components))
    }

    /// Elementwise reciprocal. Bins crossing zero and tails use the coarse,
    /// documented single-atom approximations of spec §4.2.
    pub fn reciprocal(&self) -> EvalResult<Distribution> {
        let mut components = Vec::with_capacity(self.components.len());
        for c in &self.components {
            match c {
                Component::Atom { x, p } => {
                    if *x == 0.0 {
                        return Err(EvalError::argument("division by zero: atom at 0"));
                    }
                    components.push(Component::Atom { x: 1.0 / x, p: *p });
                }
                Component::Bin { a, b, p, shape, .. } => {
                    if *a > 0.0 || *b < 0.0 {
                        let (lo, hi) = (1.0 / b, 1.0 / a);
                        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                        components.push(Component::Bin {
                            a: lo,
                            b: hi,
                            p: *p,
                            repr: (lo + hi) / 2.0,
                            shape: *shape,
                        });
                    } else if *a == 0.0 || *b == 0.0 {
                        return Err(EvalError::argument("division by zero: bin touches 0"));
                    } else {
                        // Bin straddles zero: coarse approximation, split the
                        // mass across two atoms at the mid-reciprocal of each
                        // half, per spec §4.2.
                        let mid_left = *a / 2.0;
                        let mid_right = *b / 2.0;
                        components.push(Component::Atom {
                            x: 1.0 / mid_left,
                            p: p / 2.0,
                        });
                        components.push(Component::Atom {
                            x: 1.0 / mid_right,
                            p: p / 2.0,
                        });
                    }
                }
                Component::Tail {
                    side,
                    x0,
                    mass,
                    family,
                    lambda,
                    ..
                } => {
                    let cond_mean = match (family, side) {
                        (TailFamily::Exp, Side::Right) => x0 + 1.0 / lambda,
                        (TailFamily::Exp, Side::Left) => x0 - 1.0 / lambda,
                        _ => *x0,
                    };
                    if cond_mean == 0.0 {
                        return Err(EvalError::argument("division by zero: tail conditional mean is 0"));
                    }
                    components.push(Component::Atom {
                        x: 1.0 / cond_mean,
                        p: *mass,
                    });
                }
            }
        }
        Ok(Distribution::from_components(components))
    }

    pub fn mean(&self) -> f64 {
        self.components
            .iter()
            .map(|c| match c {
                Component::Atom { x, p } => x * p,
                Component::Bin { a, b, p, .. } => (a + b) / 2.0 * p,
                Component::Tail {
                    side, x0, mass, family, lambda, ..
                } => match family {
                    TailFamily::Exp => match side {
                        Side::Right => (x0 + 1.0 / lambda) * mass,
                        Side::Left => (x0 - 1.0 / lambda) * mass,
                    },
                    _ => x0 * mass,
                },
            })
            .sum()
    }

    fn second_moment(&self) -> f64 {
        self.components
            .iter()
            .map(|c| match c {
                Component::Atom { x, p } => x * x * p,
                Component::Bin { a, b, p, .. } => (a * a + a * b + b * b) / 3.0 * p,
                Component::Tail {
                    side, x0, mass, family, lambda, ..
                } => match family {
                    TailFamily::Exp => {
                        let cond_mean = match side {
                            Side::Right => x0 + 1.0 / lambda,
                            Side::Left => x0 - 1.0 / lambda,
                        };
                        let cond_var = 1.0 / (lambda * lambda);
                        (cond_var + cond_mean * cond_mean) * mass
                    }
                    _ => x0 * x0 * mass,
                },
            })
            .sum()
    }

    pub fn variance(&self) -> f64 {
        let m = self.mean();
        self.second_moment() - m * m
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().max(0.0).sqrt()
    }

    /// Mass strictly above `x`.
    pub fn prob_gt(&self, x: f64) -> f64 {
        self.components
            .iter()
            .map(|c| match c {
                Component::Atom { x: ax, p } => {
                    if *ax > x {
                        *p
                    } else {
                        0.0
                    }
                }
                Component::Bin { a, b, p, .. } => {
                    if x <= *a {
                        *p
                    } else if x >= *b {
                        0.0
                    } else {
                        p * (b - x) / (b - a)
                    }
                }
                Component::Tail {
                    side, x0, mass, family, lambda, ..
                } => match (family, side) {
                    (TailFamily::Exp, Side::Right) => {
                        if x <= *x0 {
                            *mass
                        } else {
                            mass * (-lambda * (x - x0)).exp()
                        }
                    }
                    (TailFamily::Exp, Side::Left) => {
                        if x >= *x0 {
                            0.0
                        } else {
                            mass * (1.0 - (-lambda * (x0 - x)).exp())
                        }
                    }
                    _ => 0.0,
                },
            })
            .sum()
    }

    /// Independent sum via [`Distribution::add`], first offering the host
    /// `accel` a chance to supply the result directly (spec §6
    /// "Accelerated callbacks").
    pub fn add_with(&self, other: &Distribution, accel: &dyn Accelerator) -> Distribution {
        accel.convolve(self, other).unwrap_or_else(|| self.add(other))
    }

    /// Accelerated counterpart of [`Distribution::subtract`]; negation and
    /// the underlying convolution both consult `accel`.
    pub fn subtract_with(&self, other: &Distribution, accel: &dyn Accelerator) -> Distribution {
        self.add_with(&other.scale_with(-1.0, accel), accel)
    }

    /// Accelerated counterpart of [`Distribution::scale`].
    pub fn scale_with(&self, k: f64, accel: &dyn Accelerator) -> Distribution {
        accel.scale(self, k).unwrap_or_else(|| self.scale(k))
    }

    /// Accelerated counterpart of [`Distribution::mix`].
    pub fn mix_with(&self, other: &Distribution, p: f64, accel: &dyn Accelerator) -> EvalResult<Distribution> {
        if let Some(d) = accel.mix(self, other, p) {
            return Ok(d);
        }
        self.mix(other, p)
    }

    /// Accelerated counterpart of [`Distribution::mean`].
    pub fn mean_with(&self, accel: &dyn Accelerator) -> f64 {
        accel.mean(self).unwrap_or_else(|| self.mean())
    }

    /// Accelerated counterpart of [`Distribution::variance`].
    pub fn variance_with(&self, accel: &dyn Accelerator) -> f64 {
        accel.variance(self).unwrap_or_else(|| self.variance())
    }

    /// Accelerated counterpart of [`Distribution::std_dev`].
    pub fn std_dev_with(&self, accel: &dyn Accelerator) -> f64 {
        accel.std_dev(self).unwrap_or_else(|| self.std_dev())
    }

    /// Accelerated counterpart of [`Distribution::prob_gt`].
    pub fn prob_gt_with(&self, x: f64, accel: &dyn Accelerator) -> f64 {
        accel.prob_gt(self, x).unwrap_or_else(|| self.prob_gt(x))
    }

    /// Traverse components in sort order accumulating mass until the 0.5
    /// threshold falls inside a component, interpolating linearly within a
    /// uniform bin or inverting the exponential CDF analytically.
    pub fn median(&self) -> EvalResult<f64> {
        if self.is_empty() {
            return Err(EvalError::argument("median of empty distribution"));
        }
        let total = self.total_mass();
        if total <= 0.0 {
            return Err(EvalError::argument("median of zero-mass distribution"));
        }
        let target = 0.5 * total;
        let mut cum = 0.0;
        let last_idx = self.components.len() - 1;
        for (i, c) in self.components.iter().enumerate() {
            let m = c.mass();
            let next = cum + m;
            if next >= target || i == last_idx {
                let remaining = target - cum;
                return Ok(match c {
                    Component::Atom { x, .. } => *x,
                    Component::Bin { a, b, .. } => {
                        let frac = if m > 0.0 { (remaining / m).clamp(0.0, 1.0) } else { 0.0 };
                        a + frac * (b - a)
                    }
                    Component::Tail {
                        side, x0, mass, family, lambda, ..
                    } => match family {
                        TailFamily::Exp => {
                            let frac = if *mass > 0.0 { (remaining / mass).clamp(0.0, 1.0 - 1e-12) } else { 0.0 };
                            match side {
                                Side::Right => x0 - (1.0 - frac).ln() / lambda,
                                Side::Left => x0 + (1.0 - frac).ln() / lambda,
                            }
                        }
                        _ => *x0,
                    },
                });
            }
            cum = next;
        }
        Ok(self.components[last_idx].repr())
    }

    /// Build a Vose alias table over component masses and draw `n` i.i.d.
    /// samples.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> EvalResult<Vec<f64>> {
        if self.is_empty() {
            return Err(EvalError::argument("cannot sample an empty distribution"));
        }
        let weights: Vec<f64> = self.components.iter().map(|c| c.mass()).collect();
        let table = AliasTable::new(&weights)
            .ok_or_else(|| EvalError::argument("cannot sample a zero-mass distribution"))?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = table.sample(rng);
            out.push(sample_component(&self.components[idx], rng));
        }
        Ok(out)
    }

    /// Empirical distribution from `n` samples: a point-mass cloud,
    /// normalized to sum to 1 (used by RESAMPLE).
    pub fn resample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> EvalResult<Distribution> {
        let draws = self.sample(n, rng)?;
        let p = 1.0 / n as f64;
        Ok(Distribution::from_components(draws.into_iter().map(|x| Component::atom(x, p)).collect()).normalize())
    }

    /// Distribution of the maximum of `n` i.i.d. copies, by discretizing the
    /// support, exponentiating the CDF pointwise and re-binning (spec §4.2).
    pub fn max_of(&self, n: u64) -> EvalResult<Distribution> {
        if self.is_empty() {
            return Err(EvalError::argument("max_of of empty distribution"));
        }
        const RESOLUTION: usize = 200;
        let (lo, hi) = self.finite_bounds();
        if !(lo < hi) {
            // Degenerate point distribution: max of n copies is the same point.
            return Ok(self.clone());
        }
        let step = (hi - lo) / RESOLUTION as f64;
        let mut cdf = Vec::with_capacity(RESOLUTION + 1);
        for i in 0..=RESOLUTION {
            let x = lo + step * i as f64;
            let c = 1.0 - self.prob_gt(x);
            cdf.push(c.clamp(0.0, 1.0).powf(n as f64));
        }
        let mut components = Vec::with_capacity(RESOLUTION);
        let mut prev = cdf[0];
        for i in 0..RESOLUTION {
            let a = lo + step * i as f64;
            let b = a + step;
            let next = cdf[i + 1];
            let p = (next - prev).max(0.0);
            if p > 0.0 {
                components.push(Component::bin(a, b, p)?);
            }
            prev = next;
        }
        Ok(Distribution::from_components(components).normalize())
    }

    /// Partition into `(<= x, > x)`, splitting bins proportionally and
    /// exponential tails analytically. Masses are preserved, not
    /// renormalized.
    pub fn split_at(&self, x: f64) -> (Distribution, Distribution) {
        let mut below = Vec::new();
        let mut above = Vec::new();
        for c in &self.components {
            match c {
                Component::Atom { x: ax, .. } => {
                    if *ax <= x {
                        below.push(c.clone());
                    } else {
                        above.push(c.clone());
                    }
                }
                Component::Bin { a, b, p, shape, .. } => {
                    if x <= *a {
                        above.push(c.clone());
                    } else if x >= *b {
                        below.push(c.clone());
                    } else {
                        let frac_below = (x - a) / (b - a);
                        let p_below = p * frac_below;
                        let p_above = p - p_below;
                        if p_below > 0.0 {
                            below.push(Component::bin_shaped(*a, x, p_below, (a + x) / 2.0, *shape).unwrap());
                        }
                        if p_above > 0.0 {
                            above.push(Component::bin_shaped(x, *b, p_above, (x + b) / 2.0, *shape).unwrap());
                        }
                    }
                }
                Component::Tail {
                    side,
                    x0,
                    mass,
                    family,
                    lambda,
                    cap,
                } => match (family, side) {
                    (TailFamily::Exp, Side::Right) => {
                        if x <= *x0 {
                            above.push(c.clone());
                        } else {
                            let survive = (-lambda * (x - x0)).exp();
                            let mass_above = mass * survive;
                            let mass_below = mass - mass_above;
                            if mass_below > 0.0 {
                                below.push(
                                    Component::bin(*x0, x, mass_below)
                                        .unwrap_or_else(|_| Component::atom((x0 + x) / 2.0, mass_below)),
                                );
                            }
                            if mass_above > 0.0 {
                                above.push(Component::Tail {
                                    side: *side,
                                    x0: x,
                                    mass: mass_above,
                                    family: *family,
                                    lambda: *lambda,
                                    cap: *cap,
                                });
                            }
                        }
                    }
                    (TailFamily::Exp, Side::Left) => {
                        if x >= *x0 {
                            below.push(c.clone());
                        } else {
                            let survive = (-lambda * (x0 - x)).exp();
                            let mass_below = mass * survive;
                            let mass_above = mass - mass_below;
                            if mass_below > 0.0 {
                                below.push(Component::Tail {
                                    side: *side,
                                    x0: x,
                                    mass: mass_below,
                                    family: *family,
                                    lambda: *lambda,
                                    cap: *cap,
                                });
                            }
                            if mass_above > 0.0 {
                                above.push(
                                    Component::bin(x, *x0, mass_above)
                                        .unwrap_or_else(|_| Component::atom((x + x0) / 2.0, mass_above)),
                                );
                            }
                        }
                    }
                    _ => {
                        // Non-exponential tail families are pass-through;
                        // conservatively keep the whole mass on the side of
                        // the tail's anchor.
                        if c.start() <= x {
                            below.push(c.clone());
                        } else {
                            above.push(c.clone());
                        }
                    }
                },
            }
        }
        (Distribution::from_components(below), Distribution::from_components(above))
    }

    /// Finite bounds of the atom/bin portion of the support, used by
    /// [`Distribution::max_of`]. Tails contribute their anchor plus a few
    /// mean-widths so the discretization still covers most of their mass.
    fn finite_bounds(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for c in &self.components {
            match c {
                Component::Atom { x, .. } => {
                    lo = lo.min(*x);
                    hi = hi.max(*x);
                }
                Component::Bin { a, b, .. } => {
                    lo = lo.min(*a);
                    hi = hi.max(*b);
                }
                Component::Tail { side, x0, lambda, .. } => {
                    let reach = x0
                        + match side {
                            Side::Right => 7.0 / lambda.max(1e-9),
                            Side::Left => -7.0 / lambda.max(1e-9),
                        };
                    lo = lo.min(x0.min(reach));
                    hi = hi.max(x0.max(reach));
                }
            }
        }
        if !lo.is_finite() || !hi.is_finite() {
            (0.0, 0.0)
        } else {
            (lo, hi)
        }
    }
}

fn sample_component<R: Rng + ?Sized>(c: &Component, rng: &mut R) -> f64 {
    match c {
        Component::Atom { x, .. } => *x,
        Component::Bin { a, b, .. } => {
            let u: f64 = rng.gen();
            a + u * (b - a)
        }
        Component::Tail { side, x0, lambda, .. } => {
            let u: f64 = rng.gen_range(0.0..1.0f64);
            let d = -(1.0 - u).ln() / lambda;
            match side {
                Side::Right => x0 + d,
                Side::Left => x0 - d,
            }
        }
    }
}

/// `NORMAL(mean, sigma)`: 20 uniform bins across `mean +/- 4*sigma`, masses
/// from the Gaussian PDF at bin midpoints, normalized.
pub fn normal_distribution(mean: f64, sigma: f64) -> EvalResult<Distribution> {
    if sigma <= 0.0 {
        return Err(EvalError::argument("NORMAL requires sigma > 0"));
    }
    let normal = Normal::new(mean, sigma).map_err(|e| EvalError::argument(e.to_string()))?;
    const BINS: usize = 20;
    let lo = mean - 4.0 * sigma;
    let hi = mean + 4.0 * sigma;
    let width = (hi - lo) / BINS as f64;
    let mut components = Vec::with_capacity(BINS);
    for i in 0..BINS {
        let a = lo + width * i as f64;
        let b = a + width;
        let mid = (a + b) / 2.0;
        let p = normal.pdf(mid) * width;
        components.push(Component::bin(a, b, p)?);
    }
    Ok(Distribution::from_components(components).normalize())
}

/// `EXPONENTIAL(lambda)`: 50 bins over `[0, 7/lambda]`, each bin's mass
/// `exp(-lambda*a) - exp(-lambda*b)`, normalized.
pub fn exponential_distribution(lambda: f64) -> EvalResult<Distribution> {
    if lambda <= 0.0 {
        return Err(EvalError::argument("EXPONENTIAL requires lambda > 0"));
    }
    let exp = Exp::new(lambda).map_err(|e| EvalError::argument(e.to_string()))?;
    const BINS: usize = 50;
    let hi = 7.0 / lambda;
    let width = hi / BINS as f64;
    let mut components = Vec::with_capacity(BINS);
    for i in 0..BINS {
        let a = width * i as f64;
        let b = a + width;
        let mass = exp.cdf(b) - exp.cdf(a);
        components.push(Component::bin(a, b, mass)?);
    }
    Ok(Distribution::from_components(components).normalize())
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Distribution({} components, mean={:.4})",
            self.component_count(),
            self.mean()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    #[test]
    fn normalize_rescales_to_one() {
        let d = Distribution::from_components(vec![Component::atom(0.0, 2.0), Component::atom(1.0, 2.0)]);
        let n = d.normalize();
        assert_relative_eq!(n.total_mass(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn add_is_mean_additive() {
        let a = Distribution::uniform(0.0, 10.0).unwrap();
        let b = Distribution::atom(5.0, 1.0);
        let sum = a.add(&b);
        assert_relative_eq!(sum.mean(), a.mean() + b.mean(), epsilon = 1e-9);
        assert_eq!(sum.component_count(), 1);
    }

    #[test]
    fn add_is_variance_additive_for_atoms_and_bins() {
        let a = Distribution::uniform(0.0, 10.0).unwrap();
        let b = Distribution::uniform(0.0, 4.0).unwrap();
        let sum = a.add(&b);
        assert_relative_eq!(sum.variance(), a.variance() + b.variance(), epsilon = 1e-6);
    }

    #[test]
    fn scale_linearity() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let k = 3.0;
        let scaled = d.scale(k);
        assert_relative_eq!(scaled.mean(), k * d.mean(), epsilon = 1e-9);
        assert_relative_eq!(scaled.variance(), k * k * d.variance(), epsilon = 1e-9);
    }

    #[test]
    fn mix_law_holds() {
        let a = Distribution::atom(0.0, 1.0);
        let b = Distribution::atom(100.0, 1.0);
        let mixed = a.mix(&b, 0.1).unwrap();
        assert_relative_eq!(mixed.mean(), 0.1 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn prob_gt_of_uniform() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        assert_relative_eq!(d.prob_gt(8.0), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn uniform_plus_scalar_is_single_shifted_bin() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let shifted = d.add(&Distribution::atom(5.0, 1.0));
        assert_eq!(shifted.component_count(), 1);
        match &shifted.components[0] {
            Component::Bin { a, b, p, .. } => {
                assert_relative_eq!(*a, 5.0, epsilon = 1e-9);
                assert_relative_eq!(*b, 15.0, epsilon = 1e-9);
                assert_relative_eq!(*p, 1.0, epsilon = 1e-9);
            }
            _ => panic!("expected a bin"),
        }
    }

    #[test]
    fn median_of_uniform_is_midpoint() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        assert_relative_eq!(d.median().unwrap(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn sample_mean_converges() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let samples = d.sample(50_000, &mut rng).unwrap();
        let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 5.0).abs() < 0.1);
    }

    #[test]
    fn split_at_preserves_mass() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let (below, above) = d.split_at(4.0);
        assert_relative_eq!(below.total_mass() + above.total_mass(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(below.total_mass(), 0.4, epsilon = 1e-9);
    }

    struct StubAccelerator;
    impl crate::callbacks::Accelerator for StubAccelerator {
        fn mean(&self, _d: &Distribution) -> Option<f64> {
            Some(42.0)
        }
    }

    #[test]
    fn accelerated_path_is_consulted_before_the_reference_implementation() {
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        assert_relative_eq!(d.mean_with(&StubAccelerator), 42.0, epsilon = 1e-9);
        // an operation the stub does not override still falls back to the
        // pure implementation.
        assert_relative_eq!(d.variance_with(&StubAccelerator), d.variance(), epsilon = 1e-9);
    }

    #[test]
    fn accelerated_add_falls_back_without_a_hook() {
        let a = Distribution::uniform(0.0, 10.0).unwrap();
        let b = Distribution::atom(5.0, 1.0);
        let accelerated = a.add_with(&b, &crate::callbacks::NoAccelerator);
        assert_eq!(accelerated, a.add(&b));
    }
}
