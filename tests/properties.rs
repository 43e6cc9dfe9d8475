//! Cross-module property and scenario tests for the distribution algebra
//! (spec §8). Graph-level properties (topological correctness, cycle
//! detection, persistence) live in `tests/graph.rs`.

use approx::assert_relative_eq;
use distcalc::alias::AliasTable;
use distcalc::distribution::Distribution;
use distcalc::reducer::{reduce, ReduceParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn mass_is_conserved_through_arithmetic() {
    let a = Distribution::uniform(0.0, 10.0).unwrap();
    let b = Distribution::atom(5.0, 1.0);
    let sum = a.add(&b);
    assert_relative_eq!(sum.total_mass(), 1.0, epsilon = 1e-6);
    let scaled = sum.scale(2.0);
    assert_relative_eq!(scaled.total_mass(), 1.0, epsilon = 1e-6);
}

#[test]
fn convolution_mean_and_variance_are_additive() {
    let a = Distribution::uniform(0.0, 10.0).unwrap();
    let b = Distribution::uniform(20.0, 30.0).unwrap();
    let sum = a.add(&b);
    assert_relative_eq!(sum.mean(), a.mean() + b.mean(), epsilon = 1e-6);
    assert_relative_eq!(sum.variance(), a.variance() + b.variance(), epsilon = 1e-2);
}

#[test]
fn scale_is_linear_in_mean_and_quadratic_in_variance() {
    let d = Distribution::uniform(0.0, 10.0).unwrap();
    let scaled = d.scale(3.0);
    assert_relative_eq!(scaled.mean(), 3.0 * d.mean(), epsilon = 1e-6);
    assert_relative_eq!(scaled.variance(), 9.0 * d.variance(), epsilon = 1e-6);
}

#[test]
fn mixture_mean_is_the_weighted_average() {
    let a = Distribution::atom(0.0, 1.0);
    let b = Distribution::atom(100.0, 1.0);
    let mixed = a.mix(&b, 0.1).unwrap();
    assert_relative_eq!(mixed.mean(), 0.9 * 0.0 + 0.1 * 100.0, epsilon = 1e-6);
}

#[test]
fn mix_matches_the_spec_two_atom_scenario() {
    let a = Distribution::atom(0.0, 1.0);
    let b = Distribution::atom(100.0, 1.0);
    let mixed = a.mix(&b, 0.1).unwrap();
    assert_eq!(mixed.component_count(), 2);
    assert_relative_eq!(mixed.prob_gt(50.0), 0.1, epsilon = 1e-6);
}

#[test]
fn reducer_preserves_mean_under_any_target_size() {
    let d = Distribution::uniform(0.0, 100.0).unwrap();
    for target in [1usize, 5, 20, 200] {
        let reduced = reduce(
            &d,
            &ReduceParams {
                target,
                ..Default::default()
            },
        );
        assert!(reduced.component_count() <= target.max(1));
        assert_relative_eq!(reduced.mean(), d.mean(), epsilon = 1e-6);
    }
}

#[test]
fn reducer_never_merges_across_a_boundary() {
    let d = Distribution::uniform(-10.0, 10.0).unwrap();
    let reduced = reduce(
        &d,
        &ReduceParams {
            target: 2,
            boundaries: vec![0.0],
            ..Default::default()
        },
    );
    for c in &reduced.components {
        let (lo, hi) = (c.start(), c.end());
        assert!(!(lo < 0.0 && hi > 0.0), "component straddled the boundary: {:?}", c);
    }
}

#[test]
fn alias_sampling_is_unbiased_at_scale() {
    let weights = [1.0, 3.0, 6.0];
    let values = [0.0, 10.0, 20.0];
    let analytical_mean: f64 = weights
        .iter()
        .zip(values.iter())
        .map(|(w, v)| w / weights.iter().sum::<f64>() * v)
        .sum();

    let table = AliasTable::new(&weights).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let n = 100_000;
    let sum: f64 = (0..n).map(|_| values[table.sample(&mut rng)]).sum();
    let empirical_mean = sum / n as f64;

    // variance of a 3-point distribution over [0, 20] is well under 100
    let bound = 4.0 * 10.0 / (n as f64).sqrt();
    assert!(
        (empirical_mean - analytical_mean).abs() < bound,
        "empirical mean {} strayed from analytical mean {} by more than {}",
        empirical_mean,
        analytical_mean,
        bound
    );
}

#[test]
fn median_satisfies_the_cdf_law() {
    let d = Distribution::uniform(0.0, 100.0).unwrap();
    let m = d.median().unwrap();
    let tolerance = 1.0 / d.component_count().max(1) as f64;
    assert!((d.prob_gt(m) - 0.5).abs() <= tolerance + 1e-6);
}

#[test]
fn uniform_plus_scalar_matches_the_spec_scenario() {
    let d = Distribution::uniform(0.0, 10.0).unwrap().shift(5.0);
    assert_eq!(d.component_count(), 1);
    assert_relative_eq!(d.total_mass(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(d.components[0].start(), 5.0, epsilon = 1e-9);
    assert_relative_eq!(d.components[0].end(), 15.0, epsilon = 1e-9);
}

#[test]
fn prob_gt_matches_the_spec_scenario() {
    let d = Distribution::uniform(0.0, 10.0).unwrap();
    assert_relative_eq!(d.prob_gt(8.0), 0.2, epsilon = 1e-6);
}
