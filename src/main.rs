#[macro_use]
extern crate log;
extern crate env_logger;

use colored::Colorize;
use distcalc::graph::{self, CellStatus, Graph};
use distcalc::{cli, config};
use std::fs;
use std::io::{self, BufRead, Write};

fn main() {
    env_logger::init();
    let args = cli::parse();

    let mut graph = Graph::new();
    graph.set_global_config(args.max_components);
    if let Some(seed) = config::rng_seed(&args) {
        graph.set_seed(seed);
    }

    if let Some(path) = &args.load {
        match fs::read_to_string(path) {
            Ok(json) => {
                if let Err(e) = graph.from_json(&json) {
                    eprintln!("{} failed to load {}: {}", "error:".red(), path, e);
                }
            }
            Err(e) => eprintln!("{} cannot read {}: {}", "error:".red(), path, e),
        }
    }

    let lines: Box<dyn Iterator<Item = io::Result<String>>> = match &args.script {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => Box::new(contents.lines().map(|l| Ok(l.to_string())).collect::<Vec<_>>().into_iter()),
            Err(e) => {
                eprintln!("{} cannot read script {}: {}", "error:".red(), path, e);
                return;
            }
        },
        None => Box::new(io::stdin().lock().lines()),
    };

    for line in lines {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("{} {}", "error:".red(), e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !run_command(&mut graph, line) {
            break;
        }
    }
}

/// Execute one REPL line. Returns `false` when the REPL should stop.
fn run_command(graph: &mut Graph, line: &str) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "quit" | "exit" => return false,
        "set" => {
            let mut id_and_rest = rest.splitn(2, char::is_whitespace);
            let id = id_and_rest.next().unwrap_or("");
            let input = id_and_rest.next().unwrap_or("").trim();
            if id.is_empty() {
                eprintln!("{} usage: set <ID> <input>", "error:".red());
            } else {
                graph.set_input(id, input);
            }
        }
        "get" => {
            if rest.is_empty() {
                eprintln!("{} usage: get <ID>", "error:".red());
            } else {
                print_snapshot(&graph.get_cell(rest));
            }
        }
        "iterate" => {
            for snap in graph.iterate_cells() {
                print_snapshot(&snap);
            }
        }
        "save" => {
            if rest.is_empty() {
                eprintln!("{} usage: save <file>", "error:".red());
            } else if let Err(e) = fs::write(rest, graph.to_json()) {
                eprintln!("{} cannot write {}: {}", "error:".red(), rest, e);
            }
        }
        "load" => {
            if rest.is_empty() {
                eprintln!("{} usage: load <file>", "error:".red());
            } else {
                match fs::read_to_string(rest) {
                    Ok(json) => {
                        if let Err(e) = graph.from_json(&json) {
                            eprintln!("{} {}", "error:".red(), e);
                        }
                    }
                    Err(e) => eprintln!("{} cannot read {}: {}", "error:".red(), rest, e),
                }
            }
        }
        "config" => {
            let mut sub = rest.splitn(2, char::is_whitespace);
            match sub.next() {
                Some("max-components") => match sub.next().and_then(|v| v.trim().parse::<usize>().ok()) {
                    Some(n) => {
                        debug!("config max-components {}", n);
                        graph.set_global_config(n);
                    }
                    None => eprintln!("{} usage: config max-components <N>", "error:".red()),
                },
                _ => eprintln!("{} unknown config subcommand", "error:".red()),
            }
        }
        other => eprintln!("{} unknown command '{}'", "error:".red(), other),
    }
    let _ = io::stdout().flush();
    true
}

fn print_snapshot(snap: &graph::CellSnapshot) {
    let status = match snap.status {
        CellStatus::Ok => "ok".green(),
        CellStatus::Error => "error".red(),
        CellStatus::Circular => "circular".yellow(),
        CellStatus::Evaluating => "evaluating".cyan(),
        CellStatus::Pending => "pending".normal(),
    };
    match &snap.error {
        Some(msg) => println!("{} [{}] {}: {}", snap.id, status, snap.raw_input, msg),
        None => println!("{} [{}] {}: {}", snap.id, status, snap.raw_input, snap.value),
    }
}
