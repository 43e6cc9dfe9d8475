//! The pluggable accelerated-callback interface (spec §6 "Accelerated
//! callbacks") and the flattened component encoding it operates on. When a
//! callback is absent the core falls back to the pure reference
//! implementations in [`crate::distribution`] and [`crate::specialized`].

use crate::component::{Component, Side, TailFamily};
use crate::distribution::Distribution;

/// Flattened per-component encoding: atom = `[0, x, p]`; bin = `[1, a, b,
/// p]`; exponential tail = `[2, x0, mass, lambda, side]` with `side in {0,
/// 1}` for `{right, left}`.
pub fn flatten(d: &Distribution) -> Vec<Vec<f64>> {
    d.components
        .iter()
        .map(|c| match c {
            Component::Atom { x, p } => vec![0.0, *x, *p],
            Component::Bin { a, b, p, .. } => vec![1.0, *a, *b, *p],
            Component::Tail {
                side, x0, mass, lambda, ..
            } => vec![
                2.0,
                *x0,
                *mass,
                *lambda,
                match side {
                    Side::Right => 0.0,
                    Side::Left => 1.0,
                },
            ],
        })
        .collect()
}

pub fn unflatten(rows: &[Vec<f64>]) -> Distribution {
    let components = rows
        .iter()
        .filter_map(|row| match row.first()? {
            0.0 => Some(Component::Atom { x: row[1], p: row[2] }),
            1.0 => Some(Component::Bin {
                a: row[1],
                b: row[2],
                p: row[3],
                repr: (row[1] + row[2]) / 2.0,
                shape: crate::component::BinShape::Uniform,
            }),
            2.0 => Some(Component::Tail {
                side: if row[4] == 0.0 { Side::Right } else { Side::Left },
                x0: row[1],
                mass: row[2],
                family: TailFamily::Exp,
                lambda: row[3],
                cap: None,
            }),
            _ => None,
        })
        .collect();
    Distribution::from_components(components)
}

/// Fast-path hooks a host environment may supply, covering every
/// accelerated operation listed in spec §6 "Accelerated callbacks":
/// convolution, mean, variance, std, probGT, scale, mixture and Monte
/// Carlo ruin. Each defaults to `None`, which tells the caller to fall
/// back to the pure reference implementation in [`crate::distribution`];
/// an implementation may override any subset.
pub trait Accelerator {
    fn convolve(&self, a: &Distribution, b: &Distribution) -> Option<Distribution> {
        let _ = (a, b);
        None
    }

    fn mean(&self, d: &Distribution) -> Option<f64> {
        let _ = d;
        None
    }

    fn variance(&self, d: &Distribution) -> Option<f64> {
        let _ = d;
        None
    }

    fn std_dev(&self, d: &Distribution) -> Option<f64> {
        let _ = d;
        None
    }

    fn prob_gt(&self, d: &Distribution, x: f64) -> Option<f64> {
        let _ = (d, x);
        None
    }

    fn scale(&self, d: &Distribution, k: f64) -> Option<Distribution> {
        let _ = (d, k);
        None
    }

    fn mix(&self, a: &Distribution, b: &Distribution, p: f64) -> Option<Distribution> {
        let _ = (a, b, p);
        None
    }

    fn monte_carlo_ruin(&self, step: &Distribution, w0: f64, steps: u64, trials: u64) -> Option<u64> {
        let _ = (step, w0, steps, trials);
        None
    }
}

/// The reference accelerator: always defers to the pure implementation.
pub struct NoAccelerator;
impl Accelerator for NoAccelerator {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component::Component;

    #[test]
    fn flatten_unflatten_round_trips_atom() {
        let d = Distribution::atom(3.0, 1.0);
        let rows = flatten(&d);
        let back = unflatten(&rows);
        assert_eq!(back.components, vec![Component::atom(3.0, 1.0)]);
    }

    #[test]
    fn flatten_unflatten_round_trips_bin() {
        let d = Distribution::uniform(0.0, 1.0).unwrap();
        let rows = flatten(&d);
        let back = unflatten(&rows);
        assert_eq!(back.component_count(), 1);
    }
}
