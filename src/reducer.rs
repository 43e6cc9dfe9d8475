//! Boundary-aware size-bounded reduction (spec §4.3): collapses a
//! distribution to at most `N` components under an importance metric,
//! never merging across a caller-supplied boundary and never merging a
//! tail with a neighbor.

use crate::component::{BinShape, Component};
use crate::distribution::Distribution;
use itertools::Itertools;
use log::debug;

#[derive(Debug, Clone)]
pub struct ReduceParams {
    pub target: usize,
    pub center: f64,
    pub width_weight: f64,
    pub valley_threshold: Option<f64>,
    pub boundaries: Vec<f64>,
}

impl Default for ReduceParams {
    fn default() -> Self {
        ReduceParams {
            target: 200,
            center: 0.0,
            width_weight: 0.0,
            valley_threshold: None,
            boundaries: Vec::new(),
        }
    }
}

fn importance(c: &Component, center: f64, width_weight: f64) -> f64 {
    match c {
        Component::Atom { x, p } => p * (x - center).abs(),
        Component::Bin { a, b, p, repr, .. } => p * ((repr - center).abs() + width_weight * (b - a)),
        Component::Tail { .. } => f64::INFINITY,
    }
}

/// `true` when merging the half-open span `[start, end]` would straddle a
/// boundary that must never be crossed.
fn crosses_boundary(start: f64, end: f64, boundaries: &[f64]) -> bool {
    boundaries.iter().any(|&b| start <= b && b <= end)
}

fn merge(components: &[Component]) -> Component {
    debug_assert!(components.len() >= 2);
    debug_assert!(components.iter().all(|c| !c.is_tail()));
    let start = components.iter().map(|c| c.start()).fold(f64::INFINITY, f64::min);
    let end = components.iter().map(|c| c.end()).fold(f64::NEG_INFINITY, f64::max);
    let total_p: f64 = components.iter().map(|c| c.mass()).sum();
    let repr = if total_p > 0.0 {
        components.iter().map(|c| c.repr() * c.mass()).sum::<f64>() / total_p
    } else {
        (start + end) / 2.0
    };
    Component::bin_shaped(start, end, total_p, repr, BinShape::Uniform)
        .unwrap_or(Component::Atom { x: repr, p: total_p })
}

/// Split any bin whose interior strictly contains a boundary point,
/// proportionally by width.
fn boundary_split(components: Vec<Component>, boundaries: &[f64]) -> Vec<Component> {
    let mut out = Vec::with_capacity(components.len());
    for c in components {
        match &c {
            Component::Bin { a, b, p, shape, .. } => {
                let mut cuts: Vec<f64> = boundaries
                    .iter()
                    .copied()
                    .filter(|bnd| a < bnd && bnd < b)
                    .collect();
                if cuts.is_empty() {
                    out.push(c);
                    continue;
                }
                cuts.sort_by(|x, y| x.partial_cmp(y).unwrap());
                let mut prev = *a;
                let width = b - a;
                for cut in cuts {
                    let seg_p = p * (cut - prev) / width;
                    out.push(Component::bin_shaped(prev, cut, seg_p, (prev + cut) / 2.0, *shape).unwrap());
                    prev = cut;
                }
                let seg_p = p * (b - prev) / width;
                out.push(Component::bin_shaped(prev, *b, seg_p, (prev + b) / 2.0, *shape).unwrap());
            }
            _ => out.push(c),
        }
    }
    out
}

/// In sorted order, accumulate consecutive components with importance
/// below `tau` into a buffer, flushing (merging) whenever a boundary would
/// fall inside the span, a tail appears, or a component with importance
/// `>= tau` appears.
fn valley_merge(components: Vec<Component>, tau: f64, center: f64, width_weight: f64, boundaries: &[f64]) -> Vec<Component> {
    let mut out = Vec::with_capacity(components.len());
    let mut buffer: Vec<Component> = Vec::new();

    let flush = |buffer: &mut Vec<Component>, out: &mut Vec<Component>| {
        if buffer.len() == 1 {
            out.push(buffer.remove(0));
        } else if buffer.len() > 1 {
            out.push(merge(buffer));
            buffer.clear();
        }
    };

    for c in components {
        if c.is_tail() {
            flush(&mut buffer, &mut out);
            out.push(c);
            continue;
        }
        let imp = importance(&c, center, width_weight);
        if imp >= tau {
            flush(&mut buffer, &mut out);
            out.push(c);
            continue;
        }
        let span_start = buffer.first().map(|f| f.start()).unwrap_or(c.start());
        let span_end = c.end();
        if !buffer.is_empty() && crosses_boundary(span_start, span_end, boundaries) {
            flush(&mut buffer, &mut out);
        }
        buffer.push(c);
    }
    flush(&mut buffer, &mut out);
    out
}

/// Place non-tail components into `ceil(2*target)` equal-width buckets by
/// center and merge each bucket, used only when `k > max(1000, 4*target)`.
fn fast_bucket_reduce(components: Vec<Component>, target: usize, boundaries: &[f64]) -> Vec<Component> {
    let n_buckets = (2 * target).max(1);
    let (tails, non_tails): (Vec<Component>, Vec<Component>) =
        components.into_iter().partition(|c| c.is_tail());
    if non_tails.is_empty() {
        return tails;
    }
    let lo = non_tails.iter().map(|c| c.repr()).fold(f64::INFINITY, f64::min);
    let hi = non_tails.iter().map(|c| c.repr()).fold(f64::NEG_INFINITY, f64::max);
    let width = if hi > lo { (hi - lo) / n_buckets as f64 } else { 1.0 };

    let mut buckets: Vec<Vec<Component>> = vec![Vec::new(); n_buckets];
    for c in non_tails {
        let idx = if width > 0.0 {
            (((c.repr() - lo) / width) as usize).min(n_buckets - 1)
        } else {
            0
        };
        buckets[idx].push(c);
    }

    let mut out: Vec<Component> = buckets
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|b| if b.len() == 1 { b.into_iter().next().unwrap() } else { merge(&b) })
        .collect();
    out = boundary_split(out, boundaries);
    out.extend(tails);
    out
}

/// Reduce `d` to at most `params.target` components (spec §4.3). If every
/// adjacent pair is blocked by a tail or a boundary, reduction terminates
/// above the target; this is allowed.
pub fn reduce(d: &Distribution, params: &ReduceParams) -> Distribution {
    let mut components = d.normalize().components;

    components = boundary_split(components, &params.boundaries);

    if let Some(tau) = params.valley_threshold {
        components.sort_by(|a, b| a.sort_key().partial_cmp(&b.sort_key()).unwrap());
        components = valley_merge(components, tau, params.center, params.width_weight, &params.boundaries);
    }

    if components.len() > 1000.max(4 * params.target) {
        components.sort_by(|a, b| a.sort_key().partial_cmp(&b.sort_key()).unwrap());
        components = fast_bucket_reduce(components, params.target, &params.boundaries);
    }

    components.sort_by(|a, b| a.sort_key().partial_cmp(&b.sort_key()).unwrap());

    while components.len() > params.target {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..components.len().saturating_sub(1) {
            let a = &components[i];
            let b = &components[i + 1];
            if a.is_tail() || b.is_tail() {
                continue;
            }
            if crosses_boundary(a.start(), b.end(), &params.boundaries) {
                continue;
            }
            let cost = importance(a, params.center, params.width_weight) + importance(b, params.center, params.width_weight);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((i, cost));
            }
        }
        match best {
            Some((i, _)) => {
                let merged = merge(&components[i..=i + 1]);
                components.splice(i..=i + 1, std::iter::once(merged));
            }
            None => {
                debug!(
                    "reducer: stuck above target ({} > {}), every adjacent pair blocked",
                    components.len(),
                    params.target
                );
                break;
            }
        }
    }

    Distribution::from_components(components)
}

#[allow(dead_code)]
fn sorted_positions(components: &[Component]) -> Vec<f64> {
    components.iter().map(|c| c.sort_key()).sorted_by(|a, b| a.partial_cmp(b).unwrap()).collect()
}
