//! Translates parsed CLI arguments into the graph's runtime configuration.
//! Kept as its own module, distinct from `cli.rs`'s argument definitions,
//! the way the teacher's `cli.rs`/`config.rs` pair separates "how options
//! are read" from "what the program does with them".

use crate::cli::Cli;
use crate::graph::GraphConfig;

pub fn graph_config(cli: &Cli) -> GraphConfig {
    GraphConfig {
        max_components: cli.max_components,
    }
}

pub fn rng_seed(cli: &Cli) -> Option<u64> {
    cli.seed
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derives_graph_config_from_cli() {
        let cli = Cli {
            load: None,
            script: None,
            max_components: 75,
            seed: Some(42),
        };
        let config = graph_config(&cli);
        assert_eq!(config.max_components, 75);
        assert_eq!(rng_seed(&cli), Some(42));
    }
}
