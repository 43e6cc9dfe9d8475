//! The evaluator: ties the lexer, parser, function table and context
//! together (spec §4.4), including the dynamically-scoped component-limit
//! override that `CONFIG` installs around a single inner evaluation.

use crate::ast::Expr;
use crate::callbacks::{Accelerator, NoAccelerator};
use crate::distribution::Distribution;
use crate::error::{EvalError, EvalResult};
use crate::functions;
use crate::parser;
use crate::reducer::{reduce, ReduceParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};

pub const DEFAULT_LIMIT: usize = 200;
pub const DEFAULT_SEED: u64 = 0xD157_CA1C;

/// Resolves a bare identifier to its cell's current distribution. Never
/// fails: an unknown id resolves to the empty distribution (spec §6).
pub trait ValueResolver {
    fn resolve(&self, id: &str) -> Distribution;
}

impl<F: Fn(&str) -> Distribution> ValueResolver for F {
    fn resolve(&self, id: &str) -> Distribution {
        self(id)
    }
}

pub struct EvalContext<'a> {
    pub resolver: &'a dyn ValueResolver,
    pub limit: usize,
    pub accelerator: &'a dyn Accelerator,
}

impl<'a> EvalContext<'a> {
    pub fn new(resolver: &'a dyn ValueResolver) -> Self {
        EvalContext {
            resolver,
            limit: DEFAULT_LIMIT,
            accelerator: &NoAccelerator,
        }
    }
}

pub struct Evaluator<'a> {
    pub ctx: &'a EvalContext<'a>,
    local_limit: Cell<Option<usize>>,
    pub rng: RefCell<StdRng>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a EvalContext<'a>) -> Self {
        Evaluator {
            ctx,
            local_limit: Cell::new(None),
            rng: RefCell::new(StdRng::seed_from_u64(DEFAULT_SEED)),
        }
    }

    pub fn with_seed(ctx: &'a EvalContext<'a>, seed: u64) -> Self {
        Evaluator {
            ctx,
            local_limit: Cell::new(None),
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn effective_limit(&self) -> usize {
        self.local_limit.get().unwrap_or(self.ctx.limit)
    }

    /// Run `f` with the component-limit override set to `limit`, restoring
    /// the previous value when `f` returns (including on error, since this
    /// runs on an owned stack frame rather than relying on unwinding).
    pub fn with_local_limit<R>(&self, limit: usize, f: impl FnOnce() -> R) -> R {
        let previous = self.local_limit.replace(Some(limit));
        let result = f();
        self.local_limit.set(previous);
        result
    }

    /// Invoke the reducer when `d` exceeds the effective component limit.
    /// Called after every add/subtract, every scale, and every function
    /// call that may expand component count (spec §4.4 "Size-bounded
    /// arithmetic").
    pub fn safety_check(&self, d: Distribution) -> Distribution {
        let limit = self.effective_limit();
        if d.component_count() > limit {
            reduce(
                &d,
                &ReduceParams {
                    target: limit,
                    center: 0.0,
                    boundaries: vec![0.0],
                    ..Default::default()
                },
            )
        } else {
            d
        }
    }

    pub fn eval_source(&self, source: &str) -> EvalResult<Distribution> {
        let expr = parser::parse(source)?;
        self.eval(&expr)
    }

    pub fn eval(&self, expr: &Expr) -> EvalResult<Distribution> {
        match expr {
            Expr::Number(n) => Ok(Distribution::atom(*n, 1.0)),
            Expr::Ref(id) => Ok(self.ctx.resolver.resolve(id)),
            Expr::Neg(inner) => {
                let d = self.eval(inner)?;
                Ok(self.safety_check(d.scale_with(-1.0, self.ctx.accelerator)))
            }
            Expr::Add(a, b) => {
                let da = self.eval(a)?;
                let db = self.eval(b)?;
                Ok(self.safety_check(da.add_with(&db, self.ctx.accelerator)))
            }
            Expr::Sub(a, b) => {
                let da = self.eval(a)?;
                let db = self.eval(b)?;
                Ok(self.safety_check(da.subtract_with(&db, self.ctx.accelerator)))
            }
            Expr::Mul(a, b) => {
                let da = self.eval(a)?;
                let db = self.eval(b)?;
                Ok(self.safety_check(functions::mul_dist(&da, &db, self.ctx.accelerator)?))
            }
            Expr::Div(a, b) => {
                let da = self.eval(a)?;
                let db = self.eval(b)?;
                Ok(self.safety_check(functions::div_dist(&da, &db, self.ctx.accelerator)?))
            }
            Expr::Call(name, args) => {
                let d = functions::dispatch(self, name, args)?;
                Ok(self.safety_check(d))
            }
        }
    }

    /// Evaluate `expr` and require the result to be a single-atom
    /// distribution with mass ~1, i.e. a scalar.
    pub fn eval_scalar(&self, expr: &Expr) -> EvalResult<f64> {
        let d = self.eval(expr)?;
        as_scalar(&d)
    }
}

/// Extracts the scalar value from a distribution that is a single atom of
/// mass ~1 (the representation functions like MEAN/CONST/the lexical
/// number literal all produce).
pub fn as_scalar(d: &Distribution) -> EvalResult<f64> {
    try_as_scalar(d).ok_or_else(|| EvalError::argument("expected a scalar, found a distribution"))
}

/// Non-failing variant of [`as_scalar`], used where an operand may
/// legitimately be either a scalar or a full distribution (MUL, DIV).
pub fn try_as_scalar(d: &Distribution) -> Option<f64> {
    if d.components.len() != 1 {
        return None;
    }
    match &d.components[0] {
        crate::component::Component::Atom { x, p } if (p - 1.0).abs() < 1e-6 => Some(*x),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn resolver_const(value: f64) -> impl Fn(&str) -> Distribution {
        move |_| Distribution::atom(value, 1.0)
    }

    #[test]
    fn evaluates_arithmetic() {
        let resolver = resolver_const(10.0);
        let ctx = EvalContext::new(&resolver);
        let ev = Evaluator::new(&ctx);
        let d = ev.eval_source("A1 * 2").unwrap();
        assert_eq!(as_scalar(&d).unwrap(), 20.0);
    }

    #[test]
    fn config_scopes_the_limit_override() {
        let resolver = resolver_const(0.0);
        let ctx = EvalContext::new(&resolver);
        let ev = Evaluator::new(&ctx);
        assert_eq!(ev.effective_limit(), DEFAULT_LIMIT);
        ev.with_local_limit(5, || {
            assert_eq!(ev.effective_limit(), 5);
        });
        assert_eq!(ev.effective_limit(), DEFAULT_LIMIT);
    }
}
