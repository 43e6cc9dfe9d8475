//! Specialized operators that compose the component algebra, the
//! distribution container and the reducer's safety check: geometric sum,
//! binary-exponentiation repeat-add, and ruin probability (spec §2, §4.4).

use crate::component::Component;
use crate::distribution::Distribution;
use crate::error::{EvalError, EvalResult};
use crate::eval::Evaluator;
use rand::Rng;

fn scale_mass(d: &Distribution, k: f64) -> Distribution {
    Distribution::from_components(d.components.iter().map(|c| c.scale_probability(k)).collect())
}

/// `GEOM_SUM(D, p) = sum_{k=0..inf} (1-p) p^k D^{*k}`, `D^{*0} = delta_0`.
/// Stops once emitted mass exceeds 0.9999 or a safety cap of 2000 terms is
/// reached; the running convolution is safety-checked after every step.
pub fn geom_sum(ev: &Evaluator, d: &Distribution, p: f64) -> EvalResult<Distribution> {
    if !(0.0..1.0).contains(&p) {
        return Err(EvalError::argument(format!("GEOM_SUM probability {} not in [0,1)", p)));
    }
    const CAP: usize = 2000;
    let mut ck = Distribution::atom(0.0, 1.0);
    let mut weight = 1.0 - p;
    let mut emitted = 0.0;
    let mut out: Vec<Component> = Vec::new();
    for _ in 0..CAP {
        out.extend(scale_mass(&ck, weight).components);
        emitted += weight;
        if emitted > 0.9999 {
            break;
        }
        ck = ev.safety_check(ck.add_with(d, ev.ctx.accelerator));
        weight *= p;
    }
    Ok(Distribution::from_components(out))
}

/// `REPEAT_ADD(D, n) = D^{*n}` via binary exponentiation under convolution.
pub fn repeat_add(ev: &Evaluator, d: &Distribution, n: u64) -> Distribution {
    if n == 0 {
        return Distribution::atom(0.0, 1.0);
    }
    let mut result: Option<Distribution> = None;
    let mut base = d.clone();
    let mut n = n;
    while n > 0 {
        if n & 1 == 1 {
            result = Some(match result {
                Some(r) => ev.safety_check(r.add_with(&base, ev.ctx.accelerator)),
                None => base.clone(),
            });
        }
        n >>= 1;
        if n > 0 {
            base = ev.safety_check(base.add_with(&base, ev.ctx.accelerator));
        }
    }
    result.unwrap_or_else(|| Distribution::atom(0.0, 1.0))
}

/// `RUIN_PROB(step, w0, T)`: probability a random walk starting at `w0`
/// with i.i.d. increments drawn from `step` hits `<= 0` within `T` steps.
/// Exact recursion for `T <= 300`; Monte Carlo sampling beyond that, with
/// an accelerator hook a host may substitute for the trial loop.
pub fn ruin_prob(ev: &Evaluator, step: &Distribution, w0: f64, steps: u64) -> EvalResult<Distribution> {
    let p = if steps <= 300 {
        ruin_prob_exact(ev, step, w0, steps)
    } else {
        ruin_prob_monte_carlo(ev, step, w0, steps)?
    };
    Ok(Distribution::atom(p, 1.0))
}

fn ruin_prob_exact(ev: &Evaluator, step: &Distribution, w0: f64, steps: u64) -> f64 {
    let mut surviving = Distribution::atom(w0, 1.0);
    let mut survival = 1.0;
    let mut ruined = 0.0;
    for _ in 0..steps {
        if survival < 1e-9 {
            break;
        }
        let convolved = ev.safety_check(surviving.add_with(step, ev.ctx.accelerator));
        let (failed, survived) = convolved.split_at(0.0);
        let fail_mass = failed.total_mass();
        let survive_mass = survived.total_mass();
        ruined += survival * fail_mass;
        survival *= survive_mass;
        surviving = if survive_mass > 0.0 {
            survived.normalize()
        } else {
            Distribution::empty()
        };
    }
    ruined
}

fn ruin_prob_monte_carlo(ev: &Evaluator, step: &Distribution, w0: f64, steps: u64) -> EvalResult<f64> {
    let trials = ((1.0e7 / steps as f64).floor() as u64).clamp(1000, 10_000);
    if let Some(ruined) = ev.ctx.accelerator.monte_carlo_ruin(step, w0, steps, trials) {
        return Ok(ruined as f64 / trials as f64);
    }
    let mut rng = ev.rng.borrow_mut();
    let mut ruined = 0u64;
    for _ in 0..trials {
        let mut wealth = w0;
        for _ in 0..steps {
            let draw = sample_one(step, &mut *rng)?;
            wealth += draw;
            if wealth <= 0.0 {
                ruined += 1;
                break;
            }
        }
    }
    Ok(ruined as f64 / trials as f64)
}

fn sample_one<R: Rng + ?Sized>(d: &Distribution, rng: &mut R) -> EvalResult<f64> {
    Ok(d.sample(1, rng)?[0])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eval::EvalContext;
    use approx::assert_relative_eq;

    fn ctx_with_limit(limit: usize) -> EvalContext<'static> {
        fn resolver(_: &str) -> Distribution {
            Distribution::empty()
        }
        EvalContext {
            resolver: &resolver,
            limit,
            accelerator: &crate::callbacks::NoAccelerator,
        }
    }

    #[test]
    fn geom_sum_matches_known_masses() {
        let ctx = ctx_with_limit(200);
        let ev = Evaluator::new(&ctx);
        let d = geom_sum(&ev, &Distribution::atom(1.0, 1.0), 0.5).unwrap();
        assert_relative_eq!(d.prob_gt(-0.5) - d.prob_gt(0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn repeat_add_three_times_triples_mean() {
        let ctx = ctx_with_limit(200);
        let ev = Evaluator::new(&ctx);
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let tripled = repeat_add(&ev, &d, 3);
        assert_relative_eq!(tripled.mean(), 3.0 * d.mean(), epsilon = 1e-6);
    }

    #[test]
    fn repeat_add_zero_is_point_mass_at_zero() {
        let ctx = ctx_with_limit(200);
        let ev = Evaluator::new(&ctx);
        let d = Distribution::uniform(0.0, 10.0).unwrap();
        let zero = repeat_add(&ev, &d, 0);
        assert_eq!(zero.components, vec![Component::atom(0.0, 1.0)]);
    }

    #[test]
    fn ruin_prob_is_zero_with_only_positive_steps() {
        let ctx = ctx_with_limit(200);
        let ev = Evaluator::new(&ctx);
        let step = Distribution::atom(1.0, 1.0);
        let result = ruin_prob(&ev, &step, 10.0, 5).unwrap();
        assert_relative_eq!(result.mean(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn ruin_prob_is_one_when_first_step_always_ruins() {
        let ctx = ctx_with_limit(200);
        let ev = Evaluator::new(&ctx);
        let step = Distribution::atom(-100.0, 1.0);
        let result = ruin_prob(&ev, &step, 1.0, 1).unwrap();
        assert_relative_eq!(result.mean(), 1.0, epsilon = 1e-9);
    }
}
