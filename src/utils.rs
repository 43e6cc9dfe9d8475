//! Small helpers shared across modules.

use crate::cellref::parse_ref;
use itertools::Itertools;

/// Sort cell identifiers by parsed `(row, column)` rather than lexical
/// order, so `A2` sorts before `A10` and REPL/graph iteration output is
/// deterministic.
pub fn sorted_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    ids.into_iter()
        .sorted_by_key(|id| parse_ref(id).map(|(col, row)| (row, col)).unwrap_or((u32::MAX, u32::MAX)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sorts_by_row_then_column() {
        let ids = vec!["B1".to_string(), "A10".to_string(), "A2".to_string()];
        assert_eq!(sorted_ids(ids), vec!["B1", "A2", "A10"]);
    }
}
