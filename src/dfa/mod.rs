pub(crate) mod acquire;
pub(crate) mod automaton;
pub(crate) mod equiv;
pub(crate) mod parse;

use std::collections::BTreeSet;
use std::fmt;

/// Node identifier as written in the graph text
pub type NodeId = usize;

/// Character code read by an automaton
pub type Symbol = u32;

/// Number of codes shown per transition when dumping a block
const DUMP_CODES_LIMIT: usize = 10;

/// What an edge fires on.
#[derive(Debug, Clone, PartialEq)]
pub enum CharCondition {
    /// fires on exactly these codes
    OnSymbols(BTreeSet<Symbol>),
    /// an unlabelled edge: fires on every symbol of the alphabet
    Unconditional,
}

impl CharCondition {
    pub(crate) fn from_set(chars: BTreeSet<Symbol>) -> Self {
        if chars.is_empty() {
            CharCondition::Unconditional
        } else {
            CharCondition::OnSymbols(chars)
        }
    }

    /// Codes listed explicitly on the edge; empty for an unconditional edge.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        let set = match self {
            CharCondition::OnSymbols(s) => Some(s),
            CharCondition::Unconditional => None,
        };
        set.into_iter().flat_map(|s| s.iter())
    }

    pub fn len(&self) -> usize {
        match self {
            CharCondition::OnSymbols(s) => s.len(),
            CharCondition::Unconditional => 0,
        }
    }
}

/// An edge of a parsed graph block
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub src: NodeId,
    pub dst: NodeId,
    pub cond: CharCondition,
}

impl Transition {
    pub(crate) fn new(src: NodeId, dst: NodeId, cond: CharCondition) -> Self {
        Self {
            src,
            dst,
            cond,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "From {} to {}: {} characters", self.src, self.dst, self.cond.len())?;
        let codes: Vec<String> = self.cond
            .symbols()
            .take(DUMP_CODES_LIMIT)
            .map(|c| match char::from_u32(*c) {
                Some(ch) if (32..=126).contains(c) => format!("{} ('{}')", c, ch),
                _ => c.to_string(),
            })
            .collect();
        let mut s = codes.join(", ");
        if self.cond.len() > DUMP_CODES_LIMIT {
            s = format!("{}, ... ({} more)", s, self.cond.len() - DUMP_CODES_LIMIT);
        }
        write!(f, "  Characters: {}", s)
    }
}

/// One `digraph { ... }` block of the generator output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDfa {
    /// edges, in the order they were read
    pub transitions: Vec<Transition>,
    /// accepting nodes with their labels
    pub final_nodes: Vec<(NodeId, String)>,
}

impl ParsedDfa {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for ParsedDfa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Final Nodes:")?;
        for (node_id, label) in &self.final_nodes {
            writeln!(f, "\tNode {}: {}", node_id, label)?;
        }
        writeln!(f, "\nTransitions:")?;
        for t in &self.transitions {
            for line in t.to_string().lines() {
                writeln!(f, "\t{}", line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_unconditional() {
        assert_eq!(CharCondition::from_set(BTreeSet::new()), CharCondition::Unconditional);
        let cond = CharCondition::from_set(vec![97, 98].into_iter().collect());
        assert_eq!(cond.len(), 2);
    }

    #[test]
    fn test_dump_truncates_codes() {
        let chars: BTreeSet<Symbol> = (0..=255).collect();
        let t = Transition::new(1, 2, CharCondition::from_set(chars));
        let s = t.to_string();
        assert!(s.starts_with("From 1 to 2: 256 characters"));
        assert!(s.ends_with("... (246 more)"));

        let t = Transition::new(0, 1, CharCondition::from_set(vec![97].into_iter().collect()));
        assert!(t.to_string().ends_with("Characters: 97 ('a')"));
    }

    #[test]
    fn test_dump_block() {
        let mut dfa = ParsedDfa::new();
        dfa.transitions.push(Transition::new(0, 1, CharCondition::Unconditional));
        dfa.final_nodes.push((1, "a".to_owned()));
        let s = dfa.to_string();
        assert!(s.contains("\tNode 1: a"));
        assert!(s.contains("\tFrom 0 to 1: 0 characters"));
    }
}
