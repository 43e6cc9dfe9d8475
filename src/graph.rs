//! The reactive computation graph: cell table, dependency/dependent edges,
//! cycle-safe topological recalculation, dirty tracking and cooperative
//! yielding (spec §4.5, §5).

use crate::callbacks::NoAccelerator;
use crate::distribution::Distribution;
use crate::error::EvalResult;
use crate::eval::{EvalContext, Evaluator, ValueResolver, DEFAULT_SEED};
use crate::persistence;
use crate::utils::sorted_ids;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Pending,
    Ok,
    Error,
    Circular,
    Evaluating,
}

#[derive(Debug, Clone)]
struct Cell {
    raw_input: String,
    value: Distribution,
    status: CellStatus,
    error: Option<String>,
    dependencies: HashSet<String>,
    dependents: HashSet<String>,
}

impl Cell {
    fn new() -> Self {
        Cell {
            raw_input: String::new(),
            value: Distribution::empty(),
            status: CellStatus::Ok,
            error: None,
            dependencies: HashSet::new(),
            dependents: HashSet::new(),
        }
    }
}

/// A read-only view of a cell published to callers and listeners.
#[derive(Debug, Clone)]
pub struct CellSnapshot {
    pub id: String,
    pub raw_input: String,
    pub value: Distribution,
    pub status: CellStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    pub max_components: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig { max_components: 200 }
    }
}

type Listener = Box<dyn Fn(&[CellSnapshot])>;

pub struct Graph {
    cells: HashMap<String, Cell>,
    config: GraphConfig,
    dirty: HashSet<String>,
    listeners: Vec<Listener>,
    seed: u64,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            cells: HashMap::new(),
            config: GraphConfig::default(),
            dirty: HashSet::new(),
            listeners: Vec::new(),
            seed: DEFAULT_SEED,
        }
    }

    /// Seed the shared RNG used for RESAMPLE and Monte Carlo evaluations,
    /// for reproducible runs (e.g. the REPL's `--seed` flag).
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn ensure_cell(&mut self, id: &str) {
        self.cells.entry(id.to_string()).or_insert_with(Cell::new);
    }

    /// Set a cell's raw formula/number input and recalculate its closure of
    /// dependents, unless the input is unchanged (spec §4.5).
    pub fn set_input(&mut self, id: &str, input: &str) {
        self.ensure_cell(id);
        if self.cells[id].raw_input == input {
            return;
        }
        self.cells.get_mut(id).unwrap().raw_input = input.to_string();
        self.dirty.insert(id.to_string());
        self.update_edges(id);
        self.recalculate(id);
    }

    /// A simple scan for identifier-like tokens (uppercase letters
    /// followed by digits); intentionally coarser than the parser so it
    /// also catches references appearing inside ranges (spec §4.5).
    fn extract_dependencies(input: &str) -> HashSet<String> {
        let chars: Vec<char> = input.chars().collect();
        let mut out = HashSet::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_ascii_uppercase() {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_uppercase() {
                    i += 1;
                }
                let digits_start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i > digits_start {
                    out.insert(chars[start..i].iter().collect());
                }
            } else {
                i += 1;
            }
        }
        out
    }

    fn update_edges(&mut self, id: &str) {
        let new_deps = Self::extract_dependencies(&self.cells[id].raw_input);
        let old_deps = self.cells[id].dependencies.clone();
        for removed in old_deps.difference(&new_deps) {
            if let Some(cell) = self.cells.get_mut(removed) {
                cell.dependents.remove(id);
            }
        }
        for added in new_deps.difference(&old_deps) {
            self.ensure_cell(added);
            self.cells.get_mut(added).unwrap().dependents.insert(id.to_string());
        }
        self.cells.get_mut(id).unwrap().dependencies = new_deps;
    }

    /// Recompute `start` and every cell transitively reachable through the
    /// `dependents` relation, in dependency order, detecting cycles.
    ///
    /// In-degree is counted over each closure cell's *dependencies* that
    /// also lie in the closure (the number of not-yet-evaluated
    /// prerequisites) so that Kahn's algorithm evaluates upstream cells
    /// before their consumers; cells are dequeued for evaluation once that
    /// count reaches zero, and evaluating a cell then decrements the count
    /// for each of its own dependents still in the closure.
    fn recalculate(&mut self, start: &str) {
        let mut closure: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();
        frontier.push_back(start.to_string());
        seen.insert(start.to_string());
        while let Some(cur) = frontier.pop_front() {
            let dependents = self.cells.get(&cur).map(|c| c.dependents.clone()).unwrap_or_default();
            closure.push(cur);
            for dep in dependents {
                if seen.insert(dep.clone()) {
                    frontier.push_back(dep);
                }
            }
        }
        let closure_set: HashSet<String> = closure.iter().cloned().collect();

        for id in &closure {
            if let Some(cell) = self.cells.get_mut(id) {
                if cell.status != CellStatus::Circular {
                    cell.status = CellStatus::Evaluating;
                }
            }
            self.dirty.insert(id.clone());
        }

        let mut in_degree: HashMap<String, usize> = HashMap::new();
        for id in &closure {
            let count = self.cells[id]
                .dependencies
                .iter()
                .filter(|dep| closure_set.contains(*dep))
                .count();
            in_degree.insert(id.clone(), count);
        }

        let mut queue: VecDeque<String> =
            closure.iter().filter(|id| in_degree[*id] == 0).cloned().collect();
        let mut batch: Vec<String> = Vec::new();

        while let Some(id) = queue.pop_front() {
            self.evaluate_cell(&id);
            batch.push(id.clone());

            let dependents = self.cells.get(&id).map(|c| c.dependents.clone()).unwrap_or_default();
            for dep in dependents {
                if !closure_set.contains(&dep) {
                    continue;
                }
                if let Some(d) = in_degree.get_mut(&dep) {
                    if *d > 0 {
                        *d -= 1;
                        if *d == 0 {
                            queue.push_back(dep);
                        }
                    }
                }
            }

            if batch.len() >= 5 {
                self.notify(&batch);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.notify(&batch);
        }

        for id in &closure {
            if in_degree.get(id).copied().unwrap_or(0) > 0 {
                if let Some(cell) = self.cells.get_mut(id) {
                    cell.status = CellStatus::Circular;
                }
                self.dirty.insert(id.clone());
            }
        }
    }

    /// Evaluate one cell's raw input against the current values of its
    /// dependencies (spec §4.5 "Evaluation of a single cell"). On error the
    /// cell's previous value is left in place; only `status` and `error`
    /// change, so dependents fall back to it automatically.
    fn evaluate_cell(&mut self, id: &str) {
        let mut cell = self.cells.remove(id).unwrap_or_else(Cell::new);
        let trimmed = cell.raw_input.trim();
        if trimmed.is_empty() {
            cell.value = Distribution::empty();
            cell.status = CellStatus::Ok;
            cell.error = None;
        } else if let Some(formula) = trimmed.strip_prefix('=') {
            let resolver = GraphResolver { cells: &self.cells };
            let ctx = EvalContext {
                resolver: &resolver,
                limit: self.config.max_components,
                accelerator: &NoAccelerator,
            };
            let evaluator = Evaluator::with_seed(&ctx, self.seed);
            match evaluator.eval_source(formula) {
                Ok(value) => {
                    cell.value = value;
                    cell.status = CellStatus::Ok;
                    cell.error = None;
                }
                Err(e) => {
                    cell.status = CellStatus::Error;
                    cell.error = Some(e.message);
                }
            }
        } else {
            match trimmed.parse::<f64>() {
                Ok(x) => {
                    cell.value = Distribution::atom(x, 1.0);
                    cell.status = CellStatus::Ok;
                    cell.error = None;
                }
                Err(_) => {
                    cell.status = CellStatus::Error;
                    cell.error = Some(format!("'{}' is not a valid number", trimmed));
                }
            }
        }
        self.cells.insert(id.to_string(), cell);
        self.dirty.insert(id.to_string());
    }

    fn notify(&self, ids: &[String]) {
        if self.listeners.is_empty() {
            return;
        }
        let snaps: Vec<CellSnapshot> = ids.iter().map(|id| self.snapshot(id)).collect();
        for listener in &self.listeners {
            listener(&snaps);
        }
    }

    fn snapshot(&self, id: &str) -> CellSnapshot {
        match self.cells.get(id) {
            Some(c) => CellSnapshot {
                id: id.to_string(),
                raw_input: c.raw_input.clone(),
                value: c.value.clone(),
                status: c.status,
                error: c.error.clone(),
            },
            None => CellSnapshot {
                id: id.to_string(),
                raw_input: String::new(),
                value: Distribution::empty(),
                status: CellStatus::Ok,
                error: None,
            },
        }
    }

    /// Read a cell, creating it (empty, `ok`) on first access (spec §3
    /// "Lifecycle").
    pub fn get_cell(&mut self, id: &str) -> CellSnapshot {
        self.ensure_cell(id);
        self.snapshot(id)
    }

    /// All known cell identifiers' snapshots, in stable `(row, column)`
    /// order.
    pub fn iterate_cells(&self) -> Vec<CellSnapshot> {
        sorted_ids(self.cells.keys().cloned()).into_iter().map(|id| self.snapshot(&id)).collect()
    }

    /// Update the component limit; does not itself trigger recomputation.
    pub fn set_global_config(&mut self, max_components: usize) {
        self.config.max_components = max_components;
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Drain and return snapshots of every cell with a pending observable
    /// change.
    pub fn drain_dirty(&mut self) -> Vec<CellSnapshot> {
        let ids: Vec<String> = self.dirty.drain().collect();
        ids.iter().map(|id| self.snapshot(id)).collect()
    }

    pub fn to_json(&self) -> String {
        let cells = self
            .cells
            .iter()
            .filter(|(_, c)| !c.raw_input.is_empty())
            .map(|(id, c)| (id.clone(), c.raw_input.clone()))
            .collect();
        persistence::serialize(self.config.max_components, &cells)
    }

    /// Clear existing cells and replay inputs from a persisted graph,
    /// re-evaluating each (spec §4.5 "Persistence").
    pub fn from_json(&mut self, json: &str) -> EvalResult<()> {
        let (max_components, cells) = persistence::deserialize(json)?;
        self.cells.clear();
        self.dirty.clear();
        self.listeners.clear();
        self.config.max_components = max_components;
        for (id, input) in cells {
            self.set_input(&id, &input);
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

struct GraphResolver<'a> {
    cells: &'a HashMap<String, Cell>,
}

impl<'a> ValueResolver for GraphResolver<'a> {
    fn resolve(&self, id: &str) -> Distribution {
        self.cells.get(id).map(|c| c.value.clone()).unwrap_or_else(Distribution::empty)
    }
}
