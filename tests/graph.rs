//! Integration tests for the reactive graph's public API (spec §4.5, §8).

use approx::assert_relative_eq;
use distcalc::graph::{CellStatus, Graph};

#[test]
fn formula_chain_recomputes_only_after_upstream_change() {
    let mut g = Graph::new();
    g.set_input("A1", "5");
    g.set_input("A2", "=A1 + 1");
    g.set_input("A3", "=A2 * 2");
    assert_relative_eq!(g.get_cell("A3").value.mean(), 12.0, epsilon = 1e-9);

    g.set_input("A1", "10");
    assert_relative_eq!(g.get_cell("A2").value.mean(), 11.0, epsilon = 1e-9);
    assert_relative_eq!(g.get_cell("A3").value.mean(), 22.0, epsilon = 1e-9);
}

#[test]
fn three_cell_cycle_is_fully_marked_circular() {
    let mut g = Graph::new();
    g.set_input("A1", "=A2");
    g.set_input("A2", "=A3");
    g.set_input("A3", "=A1");
    for id in ["A1", "A2", "A3"] {
        assert_eq!(g.get_cell(id).status, CellStatus::Circular);
    }
}

#[test]
fn breaking_a_cycle_recovers_normal_evaluation() {
    let mut g = Graph::new();
    g.set_input("A1", "=A2");
    g.set_input("A2", "=A1");
    assert_eq!(g.get_cell("A1").status, CellStatus::Circular);

    g.set_input("A2", "7");
    assert_eq!(g.get_cell("A1").status, CellStatus::Ok);
    assert_eq!(g.get_cell("A2").status, CellStatus::Ok);
    assert_relative_eq!(g.get_cell("A1").value.mean(), 7.0, epsilon = 1e-9);
}

#[test]
fn distribution_formula_propagates_through_dependents() {
    let mut g = Graph::new();
    g.set_input("A1", "=UNIFORM(0, 10)");
    g.set_input("A2", "=A1 + 5");
    assert_relative_eq!(g.get_cell("A1").value.mean(), 5.0, epsilon = 1e-6);
    assert_relative_eq!(g.get_cell("A2").value.mean(), 10.0, epsilon = 1e-6);
}

#[test]
fn unparseable_input_errors_without_breaking_dependents() {
    let mut g = Graph::new();
    g.set_input("A1", "3");
    g.set_input("A2", "=A1 * 2");
    g.set_input("A1", "not a number");
    assert_eq!(g.get_cell("A1").status, CellStatus::Error);
    assert_eq!(g.get_cell("A2").status, CellStatus::Ok);
    assert_relative_eq!(g.get_cell("A2").value.mean(), 6.0, epsilon = 1e-9);
}

#[test]
fn round_trip_persistence_preserves_a_multi_cell_graph() {
    let mut g = Graph::new();
    g.set_input("A1", "4");
    g.set_input("A2", "=A1 + 1");
    g.set_input("A3", "=A2 * A2");
    let json = g.to_json();

    let mut restored = Graph::new();
    restored.from_json(&json).unwrap();
    assert_relative_eq!(restored.get_cell("A1").value.mean(), 4.0, epsilon = 1e-9);
    assert_relative_eq!(restored.get_cell("A2").value.mean(), 5.0, epsilon = 1e-9);
    assert_eq!(restored.get_cell("A3").status, CellStatus::Ok);
}

#[test]
fn unset_cell_reads_as_empty_distribution() {
    let mut g = Graph::new();
    let snap = g.get_cell("Z99");
    assert_eq!(snap.status, CellStatus::Ok);
    assert_eq!(snap.value.component_count(), 0);
}

#[test]
fn iterate_cells_lists_every_known_identifier_in_order() {
    let mut g = Graph::new();
    g.set_input("B2", "1");
    g.set_input("A1", "2");
    g.set_input("A2", "3");
    g.set_input("B1", "4");
    let ids: Vec<String> = g.iterate_cells().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["A1", "B1", "A2", "B2"]);
}
