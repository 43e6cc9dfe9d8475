//! The function dispatch table (spec §4.4 "Function dispatch"). Names are
//! matched case-insensitively; each arm evaluates only the argument
//! expressions it actually needs, which is what lets `CONFIG` install its
//! component-limit override before its second argument is evaluated.

use crate::ast::{Arg, Expr};
use crate::callbacks::Accelerator;
use crate::cellref;
use crate::component::Component;
use crate::distribution::{exponential_distribution, normal_distribution, Distribution};
use crate::error::{EvalError, EvalResult};
use crate::eval::{try_as_scalar, Evaluator};
use crate::specialized;
use statrs::distribution::{Binomial, Discrete, Poisson};

pub fn dispatch(ev: &Evaluator, name: &str, args: &[Arg]) -> EvalResult<Distribution> {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "CONST" => {
            require_arity("CONST", args, 1)?;
            let x = ev.eval_scalar(expr_arg(args, 0, "CONST")?)?;
            Ok(Distribution::atom(x, 1.0))
        }
        "UNIFORM" => {
            require_arity("UNIFORM", args, 2)?;
            let min = ev.eval_scalar(expr_arg(args, 0, "UNIFORM")?)?;
            let max = ev.eval_scalar(expr_arg(args, 1, "UNIFORM")?)?;
            Distribution::uniform(min, max)
        }
        "NORMAL" => {
            require_arity("NORMAL", args, 2)?;
            let mean = ev.eval_scalar(expr_arg(args, 0, "NORMAL")?)?;
            let sigma = ev.eval_scalar(expr_arg(args, 1, "NORMAL")?)?;
            normal_distribution(mean, sigma)
        }
        "DISCRETE" => {
            let atoms = pairs_to_atoms(ev, args, "DISCRETE")?;
            let total: f64 = atoms.iter().map(|c| c.mass()).sum();
            if total <= 0.0 {
                return Err(EvalError::argument("DISCRETE requires total weight > 0"));
            }
            Ok(Distribution::from_components(atoms))
        }
        "EXPONENTIAL" => {
            require_arity("EXPONENTIAL", args, 1)?;
            let lambda = ev.eval_scalar(expr_arg(args, 0, "EXPONENTIAL")?)?;
            exponential_distribution(lambda)
        }
        "POISSON" => {
            require_arity("POISSON", args, 1)?;
            let lambda = ev.eval_scalar(expr_arg(args, 0, "POISSON")?)?;
            if lambda <= 0.0 {
                return Err(EvalError::argument("POISSON requires lambda > 0"));
            }
            let dist = Poisson::new(lambda).map_err(|e| EvalError::argument(e.to_string()))?;
            let limit = ev.effective_limit();
            let mut components = Vec::new();
            let mut cumulative = 0.0;
            for k in 0..=(limit as u64) {
                let p = dist.pmf(k);
                components.push(Component::atom(k as f64, p));
                cumulative += p;
                if cumulative > 1.0 - 1e-5 {
                    break;
                }
            }
            Ok(Distribution::from_components(components).normalize())
        }
        "BINOMIAL" => {
            require_arity("BINOMIAL", args, 2)?;
            let n = ev.eval_scalar(expr_arg(args, 0, "BINOMIAL")?)?;
            let p = ev.eval_scalar(expr_arg(args, 1, "BINOMIAL")?)?;
            let n_int = n.round() as u64;
            let limit = ev.effective_limit();
            if n_int as usize > limit {
                return Err(EvalError::argument(format!(
                    "BINOMIAL n={} exceeds component limit {}",
                    n_int, limit
                )));
            }
            let dist = Binomial::new(p, n_int).map_err(|e| EvalError::argument(e.to_string()))?;
            let mut components = Vec::with_capacity(n_int as usize + 1);
            for k in 0..=n_int {
                components.push(Component::atom(k as f64, dist.pmf(k)));
            }
            Ok(Distribution::from_components(components).normalize())
        }
        "ADD" | "CONVOLVE" => {
            require_arity(&upper, args, 2)?;
            let a = ev.eval(expr_arg(args, 0, &upper)?)?;
            let b = ev.eval(expr_arg(args, 1, &upper)?)?;
            Ok(a.add_with(&b, ev.ctx.accelerator))
        }
        "SUB" => {
            require_arity("SUB", args, 2)?;
            let a = ev.eval(expr_arg(args, 0, "SUB")?)?;
            let b = ev.eval(expr_arg(args, 1, "SUB")?)?;
            Ok(a.subtract_with(&b, ev.ctx.accelerator))
        }
        "MUL" => {
            require_arity("MUL", args, 2)?;
            let a = ev.eval(expr_arg(args, 0, "MUL")?)?;
            let b = ev.eval(expr_arg(args, 1, "MUL")?)?;
            mul_dist(&a, &b, ev.ctx.accelerator)
        }
        "DIV" => {
            require_arity("DIV", args, 2)?;
            let a = ev.eval(expr_arg(args, 0, "DIV")?)?;
            let b = ev.eval(expr_arg(args, 1, "DIV")?)?;
            div_dist(&a, &b, ev.ctx.accelerator)
        }
        "POWER" => {
            require_arity("POWER", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "POWER")?)?;
            let n = ev.eval_scalar(expr_arg(args, 1, "POWER")?)?;
            Ok(power_dist(&d, n))
        }
        "MIX" => {
            require_arity("MIX", args, 3)?;
            let p = ev.eval_scalar(expr_arg(args, 0, "MIX")?)?;
            let a = ev.eval(expr_arg(args, 1, "MIX")?)?;
            let b = ev.eval(expr_arg(args, 2, "MIX")?)?;
            a.mix_with(&b, p, ev.ctx.accelerator)
        }
        "SCALE" => {
            require_arity("SCALE", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "SCALE")?)?;
            let k = ev.eval_scalar(expr_arg(args, 1, "SCALE")?)?;
            Ok(d.scale_with(k, ev.ctx.accelerator))
        }
        "SHIFT" => {
            require_arity("SHIFT", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "SHIFT")?)?;
            let dx = ev.eval_scalar(expr_arg(args, 1, "SHIFT")?)?;
            Ok(d.shift(dx))
        }
        "CHOICE" => {
            let atoms = pairs_to_atoms(ev, args, "CHOICE")?;
            Ok(Distribution::from_components(atoms).normalize())
        }
        "BIN" => {
            if args.len() != 2 && args.len() != 3 {
                return Err(EvalError::arity("BIN", "2 or 3", args.len()));
            }
            let a = ev.eval_scalar(expr_arg(args, 0, "BIN")?)?;
            let b = ev.eval_scalar(expr_arg(args, 1, "BIN")?)?;
            let p = if args.len() == 3 {
                ev.eval_scalar(expr_arg(args, 2, "BIN")?)?
            } else {
                1.0
            };
            Ok(Distribution::from_components(vec![Component::bin(a, b, p)?]))
        }
        "RESAMPLE" => {
            require_arity("RESAMPLE", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "RESAMPLE")?)?;
            let n = ev.eval_scalar(expr_arg(args, 1, "RESAMPLE")?)?;
            let mut rng = ev.rng.borrow_mut();
            d.resample(n.round() as usize, &mut *rng)
        }
        "REDUCE" => {
            if args.is_empty() || args.len() > 6 {
                return Err(EvalError::arity("REDUCE", "2-6", args.len()));
            }
            let d = ev.eval(expr_arg(args, 0, "REDUCE")?)?;
            let target = ev.eval_scalar(expr_arg(args, 1, "REDUCE")?)?;
            let center = if args.len() > 2 {
                ev.eval_scalar(expr_arg(args, 2, "REDUCE")?)?
            } else {
                0.0
            };
            let valley_threshold = if args.len() > 3 {
                Some(ev.eval_scalar(expr_arg(args, 3, "REDUCE")?)?)
            } else {
                None
            };
            // args[4] is a reserved, unused placeholder slot.
            let width_weight = if args.len() > 5 {
                ev.eval_scalar(expr_arg(args, 5, "REDUCE")?)?
            } else {
                0.0
            };
            Ok(crate::reducer::reduce(
                &d,
                &crate::reducer::ReduceParams {
                    target: target.round().max(1.0) as usize,
                    center,
                    width_weight,
                    valley_threshold,
                    boundaries: vec![0.0],
                },
            ))
        }
        "MEAN" => {
            require_arity("MEAN", args, 1)?;
            let d = ev.eval(expr_arg(args, 0, "MEAN")?)?;
            Ok(Distribution::atom(d.mean_with(ev.ctx.accelerator), 1.0))
        }
        "VAR" => {
            require_arity("VAR", args, 1)?;
            let d = ev.eval(expr_arg(args, 0, "VAR")?)?;
            Ok(Distribution::atom(d.variance_with(ev.ctx.accelerator), 1.0))
        }
        "STD" => {
            require_arity("STD", args, 1)?;
            let d = ev.eval(expr_arg(args, 0, "STD")?)?;
            Ok(Distribution::atom(d.std_dev_with(ev.ctx.accelerator), 1.0))
        }
        "MEDIAN" => {
            require_arity("MEDIAN", args, 1)?;
            let d = ev.eval(expr_arg(args, 0, "MEDIAN")?)?;
            Ok(Distribution::atom(d.median()?, 1.0))
        }
        "PROB_GT" => {
            require_arity("PROB_GT", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "PROB_GT")?)?;
            let x = ev.eval_scalar(expr_arg(args, 1, "PROB_GT")?)?;
            Ok(Distribution::atom(d.prob_gt_with(x, ev.ctx.accelerator), 1.0))
        }
        "MAX_OF" => {
            require_arity("MAX_OF", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "MAX_OF")?)?;
            let n = ev.eval_scalar(expr_arg(args, 1, "MAX_OF")?)?;
            d.max_of(n.round() as u64)
        }
        "GEOM_SUM" => {
            require_arity("GEOM_SUM", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "GEOM_SUM")?)?;
            let p = ev.eval_scalar(expr_arg(args, 1, "GEOM_SUM")?)?;
            specialized::geom_sum(ev, &d, p)
        }
        "REPEAT_ADD" => {
            require_arity("REPEAT_ADD", args, 2)?;
            let d = ev.eval(expr_arg(args, 0, "REPEAT_ADD")?)?;
            let n = ev.eval_scalar(expr_arg(args, 1, "REPEAT_ADD")?)?;
            Ok(specialized::repeat_add(ev, &d, n.round() as u64))
        }
        "RUIN_PROB" => {
            require_arity("RUIN_PROB", args, 3)?;
            let step = ev.eval(expr_arg(args, 0, "RUIN_PROB")?)?;
            let w0 = ev.eval_scalar(expr_arg(args, 1, "RUIN_PROB")?)?;
            let t = ev.eval_scalar(expr_arg(args, 2, "RUIN_PROB")?)?;
            specialized::ruin_prob(ev, &step, w0, t.round() as u64)
        }
        "REF" => {
            require_arity("REF", args, 1)?;
            ev.eval(expr_arg(args, 0, "REF")?)
        }
        "CONFIG" => {
            require_arity("CONFIG", args, 2)?;
            let limit = ev.eval_scalar(expr_arg(args, 0, "CONFIG")?)?;
            let inner = expr_arg(args, 1, "CONFIG")?;
            ev.with_local_limit(limit.round().max(1.0) as usize, || ev.eval(inner))
        }
        _ => Err(EvalError::unknown_function(name)),
    }
}

/// `MUL`: requires at least one scalar operand, which scales the other.
/// Distribution×distribution multiplication is out of scope.
pub fn mul_dist(a: &Distribution, b: &Distribution, accel: &dyn Accelerator) -> EvalResult<Distribution> {
    if let Some(k) = try_as_scalar(b) {
        return Ok(a.scale_with(k, accel));
    }
    if let Some(k) = try_as_scalar(a) {
        return Ok(b.scale_with(k, accel));
    }
    Err(EvalError::argument(
        "MUL requires at least one scalar operand (distribution x distribution multiplication is unsupported)",
    ))
}

/// `DIV`: `dist/scalar` scales by `1/k`; `scalar/dist` takes the
/// reciprocal then scales.
pub fn div_dist(a: &Distribution, b: &Distribution, accel: &dyn Accelerator) -> EvalResult<Distribution> {
    if let Some(k) = try_as_scalar(b) {
        if k == 0.0 {
            return Err(EvalError::argument("division by zero"));
        }
        return Ok(a.scale_with(1.0 / k, accel));
    }
    if let Some(k) = try_as_scalar(a) {
        return Ok(b.reciprocal()?.scale_with(k, accel));
    }
    Err(EvalError::argument(
        "DIV requires at least one scalar operand (distribution x distribution division is unsupported)",
    ))
}

fn power_dist(d: &Distribution, n: f64) -> Distribution {
    let components = d
        .components
        .iter()
        .map(|c| match c {
            Component::Atom { x, p } => Component::Atom { x: x.powf(n), p: *p },
            Component::Bin { a, b, p, shape, .. } => {
                let (lo, hi) = (a.powf(n), b.powf(n));
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                Component::Bin {
                    a: lo,
                    b: hi,
                    p: *p,
                    repr: (lo + hi) / 2.0,
                    shape: *shape,
                }
            }
            tail => tail.clone(),
        })
        .collect();
    Distribution::from_components(components)
}

/// Evaluate each `(value, weight)` pair from `args` (flattening any range
/// literals row-major first) into atoms.
fn pairs_to_atoms(ev: &Evaluator, args: &[Arg], name: &str) -> EvalResult<Vec<Component>> {
    let exprs = flatten_args(args)?;
    if exprs.len() < 2 || exprs.len() % 2 != 0 {
        return Err(EvalError::arity(name, ">=2 and even", exprs.len()));
    }
    let mut out = Vec::with_capacity(exprs.len() / 2);
    for pair in exprs.chunks(2) {
        let value = ev.eval_scalar(&pair[0])?;
        let weight = ev.eval_scalar(&pair[1])?;
        out.push(Component::atom(value, weight));
    }
    Ok(out)
}

fn flatten_args(args: &[Arg]) -> EvalResult<Vec<Expr>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Arg::Value(e) => out.push(e.clone()),
            Arg::Range(a, b) => {
                for id in cellref::expand_range(a, b)? {
                    out.push(Expr::Ref(id));
                }
            }
        }
    }
    Ok(out)
}

fn require_arity(name: &str, args: &[Arg], n: usize) -> EvalResult<()> {
    if args.len() != n {
        return Err(EvalError::arity(name, &n.to_string(), args.len()));
    }
    Ok(())
}

fn expr_arg<'a>(args: &'a [Arg], i: usize, name: &str) -> EvalResult<&'a Expr> {
    match args.get(i) {
        Some(Arg::Value(e)) => Ok(e),
        Some(Arg::Range(..)) => Err(EvalError::argument(format!(
            "{} does not accept a range literal in this argument position",
            name
        ))),
        None => Err(EvalError::arity(name, &format!("at least {}", i + 1), args.len())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eval::EvalContext;
    use approx::assert_relative_eq;

    fn resolver(_: &str) -> Distribution {
        Distribution::empty()
    }

    fn ctx() -> EvalContext<'static> {
        EvalContext {
            resolver: &resolver,
            limit: 200,
            accelerator: &crate::callbacks::NoAccelerator,
        }
    }

    #[test]
    fn const_is_an_atom() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("CONST(7)").unwrap();
        assert_eq!(d.components, vec![Component::atom(7.0, 1.0)]);
    }

    #[test]
    fn mix_matches_spec_example() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("MIX(0.1, CONST(0), CONST(100))").unwrap();
        assert_relative_eq!(d.mean(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn uniform_plus_scalar_matches_spec_example() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("UNIFORM(0, 10) + 5").unwrap();
        assert_eq!(d.component_count(), 1);
        assert_relative_eq!(d.mean(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn prob_gt_matches_spec_example() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("PROB_GT(UNIFORM(0, 10), 8)").unwrap();
        assert_relative_eq!(as_scalar_for_test(&d), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn geom_sum_composition_matches_spec_example() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("ADD(CONST(1), GEOM_SUM(CONST(1500), 0.81))").unwrap();
        assert!(d.mean() >= 7800.0 && d.mean() <= 8000.0, "mean was {}", d.mean());
    }

    #[test]
    fn config_scopes_resample_component_count() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("CONFIG(50, RESAMPLE(UNIFORM(0,1), 20))").unwrap();
        assert_eq!(d.component_count(), 20);
    }

    #[test]
    fn mul_rejects_distribution_times_distribution() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        assert!(ev.eval_source("UNIFORM(0,1) * UNIFORM(0,1)").is_err());
    }

    #[test]
    fn unknown_function_errors() {
        let ctx = ctx();
        let ev = Evaluator::new(&ctx);
        assert!(ev.eval_source("NOPE(1)").is_err());
    }

    fn as_scalar_for_test(d: &Distribution) -> f64 {
        crate::eval::as_scalar(d).unwrap()
    }
}
