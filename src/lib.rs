use std::path::Path;

use log::info;
use thiserror::Error;

pub use crate::dfa::{CharCondition, NodeId, ParsedDfa, Symbol, Transition};
pub use crate::dfa::acquire::{AcquireError, Re2cConfig};
pub use crate::dfa::automaton::{Automaton, BuildError, StateId};
pub use crate::dfa::equiv::{EquivError, Verdict, Witness};
pub use crate::dfa::parse::{decode_char_ranges, parse_graphs, RangeError};

mod dfa;

#[derive(Debug, Error)]
pub enum EquivCheckError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Equiv(#[from] EquivError),
}

/// Reads (or generates) the graph text for `path` and parses every block in it.
pub fn load_graphs(path: &Path) -> Result<Vec<ParsedDfa>, EquivCheckError> {
    let config = Re2cConfig::for_path(path);
    let text = dfa::acquire::graph_text(path, &config)?;
    let dfas = parse_graphs(&text);
    info!("=> parsed {} graph(s) from {}", dfas.len(), path.display());

    Ok(dfas)
}

/// Builds both automata and compares their languages.
pub fn compare_graphs(first: &ParsedDfa, second: &ParsedDfa) -> Result<Verdict, EquivCheckError> {
    let a = Automaton::from_parsed(first)?;
    let z = Automaton::from_parsed(second)?;
    let verdict = dfa::equiv::compare(&a, &z)?;

    Ok(verdict)
}
