use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::dfa::{CharCondition, NodeId, ParsedDfa, Symbol};

pub type StateId = usize;

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("parsed DFA has no start state: every node has an incoming edge")]
    NoStartState,
    #[error("parsed DFA had multiple potential start states: {0:?}")]
    AmbiguousStartState(Vec<NodeId>),
}

/// A complete DFA: every state has a successor for every alphabet symbol.
#[derive(Debug, Clone)]
pub struct Automaton {
    states: BTreeSet<StateId>,
    alphabet: BTreeSet<Symbol>,
    transitions: HashMap<(StateId, Symbol), StateId>,
    start: StateId,
    finals: BTreeSet<StateId>,
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} states, {} symbols, start {}, finals {:?}",
               self.states.len(), self.alphabet.len(), self.start, self.finals)
    }
}

impl Automaton {
    /// The single node without incoming edges.
    fn start_state(states: &BTreeSet<StateId>, targets: &HashSet<StateId>) -> Result<StateId, BuildError> {
        let starters: Vec<StateId> = states
            .iter()
            .filter(|s| !targets.contains(*s))
            .copied()
            .collect();
        match starters.as_slice() {
            [start] => Ok(*start),
            [] => Err(BuildError::NoStartState),
            _ => Err(BuildError::AmbiguousStartState(starters)),
        }
    }

    /// Builds the automaton for a parsed block:
    /// 1. accepting states loop to themselves on every symbol
    /// 2. edges are applied in the order they were read, the last write
    ///    for a (state, symbol) pair wins; an unconditional edge writes every
    ///    alphabet symbol
    ///
    /// Pairs still undefined afterwards go to a fresh non-accepting sink.
    pub fn from_parsed(pdfa: &ParsedDfa) -> Result<Self, BuildError> {
        let mut states = BTreeSet::new();
        let mut targets = HashSet::new();
        let mut alphabet = BTreeSet::new();
        for t in &pdfa.transitions {
            states.insert(t.src);
            states.insert(t.dst);
            targets.insert(t.dst);
            alphabet.extend(t.cond.symbols());
        }
        let start = Self::start_state(&states, &targets)?;
        let finals: BTreeSet<StateId> = pdfa.final_nodes
            .iter()
            .map(|(n, _)| *n)
            .filter(|n| states.contains(n))
            .collect();

        let mut transitions = HashMap::new();
        for &fs in &finals {
            for &sym in &alphabet {
                transitions.insert((fs, sym), fs);
            }
        }

        for t in &pdfa.transitions {
            match &t.cond {
                CharCondition::OnSymbols(chars) => {
                    for &sym in chars {
                        transitions.insert((t.src, sym), t.dst);
                    }
                }
                CharCondition::Unconditional => {
                    for &sym in &alphabet {
                        transitions.insert((t.src, sym), t.dst);
                    }
                }
            }
        }

        let mut automaton = Self {
            states,
            alphabet,
            transitions,
            start,
            finals,
        };
        automaton.complete();
        debug!("built automaton: {}", automaton);

        Ok(automaton)
    }

    /// Routes every undefined (state, symbol) pair to a sink state.
    fn complete(&mut self) {
        let missing: Vec<(StateId, Symbol)> = self.states
            .iter()
            .flat_map(|&s| self.alphabet.iter().map(move |&sym| (s, sym)))
            .filter(|k| !self.transitions.contains_key(k))
            .collect();
        if missing.is_empty() {
            return;
        }

        let sink = self.states.iter().next_back().map_or(0, |s| s + 1);
        self.states.insert(sink);
        for key in missing {
            self.transitions.insert(key, sink);
        }
        for &sym in &self.alphabet {
            self.transitions.insert((sink, sym), sink);
        }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    /// Successor of `state` on `sym`; `None` stands for the implicit sink
    /// reached on a symbol outside this automaton's alphabet.
    pub fn step(&self, state: Option<StateId>, sym: Symbol) -> Option<StateId> {
        state.and_then(|s| self.transitions.get(&(s, sym)).copied())
    }

    fn accepts_state(&self, state: Option<StateId>) -> bool {
        state.map_or(false, |s| self.is_final(s))
    }

    /// Runs the automaton over `input`.
    pub fn accepts(&self, input: &[Symbol]) -> bool {
        let end = input.iter().fold(Some(self.start), |s, &sym| self.step(s, sym));
        self.accepts_state(end)
    }

    // ALGEBRA

    /// Product automaton over the union of both alphabets; a pair is
    /// accepting when `combine` says so.
    fn product(&self, other: &Automaton, combine: Combine) -> Automaton {
        let alphabet: BTreeSet<Symbol> = self.alphabet.union(&other.alphabet).copied().collect();
        let mut ids: HashMap<(Option<StateId>, Option<StateId>), StateId> = HashMap::new();
        let mut transitions = HashMap::new();
        let mut finals = BTreeSet::new();
        let mut queue = VecDeque::new();

        let start_pair = (Some(self.start), Some(other.start));
        ids.insert(start_pair, 0);
        queue.push_back(start_pair);
        while let Some(pair) = queue.pop_front() {
            let id = ids[&pair];
            if combine.accepts(self.accepts_state(pair.0), other.accepts_state(pair.1)) {
                finals.insert(id);
            }
            for &sym in &alphabet {
                let next = (self.step(pair.0, sym), other.step(pair.1, sym));
                let next_id = match ids.get(&next) {
                    Some(n) => *n,
                    None => {
                        let n = ids.len();
                        ids.insert(next, n);
                        queue.push_back(next);
                        n
                    }
                };
                transitions.insert((id, sym), next_id);
            }
        }

        Automaton {
            states: (0..ids.len()).collect(),
            alphabet,
            transitions,
            start: 0,
            finals,
        }
    }

    /// Strings accepted by either automaton.
    pub fn union(&self, other: &Automaton) -> Automaton {
        self.product(other, Combine::Union)
    }

    /// Strings accepted by `self` but not by `other`.
    pub fn difference(&self, other: &Automaton) -> Automaton {
        self.product(other, Combine::Difference)
    }

    /// True when no string, the empty one included, is accepted.
    pub fn is_empty(&self) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(self.start);
        queue.push_back(self.start);
        while let Some(s) = queue.pop_front() {
            if self.is_final(s) {
                return false;
            }
            for &sym in &self.alphabet {
                if let Some(next) = self.step(Some(s), sym) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        true
    }

    /// Shortest non-empty accepted string, smallest codes first among
    /// strings of equal length.
    pub fn shortest_accepted(&self) -> Option<Vec<Symbol>> {
        let mut parent: HashMap<StateId, (StateId, Symbol)> = HashMap::new();
        let mut queue = VecDeque::new();
        // the start state itself is only visited once reached by a non-empty path
        queue.push_back(self.start);
        while let Some(s) = queue.pop_front() {
            for &sym in &self.alphabet {
                let next = match self.step(Some(s), sym) {
                    Some(n) => n,
                    None => continue,
                };
                if parent.contains_key(&next) {
                    continue;
                }
                parent.insert(next, (s, sym));
                if self.is_final(next) {
                    return Some(Self::trace(&parent, self.start, next));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn trace(parent: &HashMap<StateId, (StateId, Symbol)>, start: StateId, end: StateId) -> Vec<Symbol> {
        let mut path = vec![];
        let mut s = end;
        loop {
            let (prev, sym) = parent[&s];
            path.push(sym);
            if prev == start {
                break;
            }
            s = prev;
        }
        path.reverse();
        path
    }

    /// Language equality by merging equivalent state pairs (Hopcroft-Karp),
    /// independent of the product construction.
    pub fn same_language(&self, other: &Automaton) -> bool {
        let alphabet: BTreeSet<Symbol> = self.alphabet.union(&other.alphabet).copied().collect();
        let mut classes = UnionFind::new();
        let mut queue = VecDeque::new();

        let start = (Some(self.start), Some(other.start));
        classes.union((Side::Left, start.0), (Side::Right, start.1));
        queue.push_back(start);
        while let Some((p, q)) = queue.pop_front() {
            if self.accepts_state(p) != other.accepts_state(q) {
                return false;
            }
            for &sym in &alphabet {
                let (p2, q2) = (self.step(p, sym), other.step(q, sym));
                if classes.union((Side::Left, p2), (Side::Right, q2)) {
                    queue.push_back((p2, q2));
                }
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy)]
enum Combine {
    Union,
    Difference,
}

impl Combine {
    fn accepts(self, a: bool, b: bool) -> bool {
        match self {
            Combine::Union => a || b,
            Combine::Difference => a && !b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Left,
    Right,
}

type UfKey = (Side, Option<StateId>);

struct UnionFind {
    index: HashMap<UfKey, usize>,
    parent: Vec<usize>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            parent: vec![],
        }
    }

    fn find(&mut self, key: UfKey) -> usize {
        let mut i = match self.index.get(&key) {
            Some(i) => *i,
            None => {
                let i = self.parent.len();
                self.index.insert(key, i);
                self.parent.push(i);
                i
            }
        };
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merges both classes; false if they already were one.
    fn union(&mut self, a: UfKey, b: UfKey) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::parse::parse_graphs;

    fn build(text: &str) -> Automaton {
        let dfas = parse_graphs(text);
        Automaton::from_parsed(&dfas[0]).expect("Unable to build automaton")
    }

    fn codes(s: &str) -> Vec<Symbol> {
        s.chars().map(|c| c as Symbol).collect()
    }

    // accepts `ab`
    const AB: &str = "digraph re2c {\n0 -> 1 [label=\"[a]\"]\n1 -> 2 [label=\"[b]\"]\n2 [label=\"ab\"]\n}";

    #[test]
    fn test_transitions_total() {
        let a = build(AB);
        for &s in a.states() {
            for &sym in a.alphabet() {
                assert!(a.step(Some(s), sym).is_some(), "missing ({}, {})", s, sym);
            }
        }
        assert_eq!(a.states().len(), 4);
        assert_eq!(a.start(), 0);
    }

    #[test]
    fn test_final_states_absorb() {
        let a = build(AB);
        assert!(a.accepts(&codes("ab")));
        assert!(a.accepts(&codes("abba")));
        assert!(!a.accepts(&codes("a")));
        assert!(!a.accepts(&codes("ba")));
        assert!(!a.accepts(&codes("az")));
    }

    #[test]
    fn test_unconditional_after_labelled_wins() {
        let a = build("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n0 -> 2 [label=\"[b]\"]\n0 -> 3\n3 [label=\"x\"]\n}");
        assert_eq!(a.step(Some(0), 'a' as Symbol), Some(3));
        assert_eq!(a.step(Some(0), 'b' as Symbol), Some(3));
        assert!(a.accepts(&codes("a")));
    }

    #[test]
    fn test_labelled_after_unconditional_wins() {
        let a = build("digraph re2c {\n0 -> 2\n0 -> 1 [label=\"[a]\"]\n1 -> 2 [label=\"[b]\"]\n2 [label=\"x\"]\n}");
        assert_eq!(a.step(Some(0), 'a' as Symbol), Some(1));
        assert_eq!(a.step(Some(0), 'b' as Symbol), Some(2));
    }

    #[test]
    fn test_unconditional_overrides_final_loop() {
        let a = build("digraph re2c {\n0 -> 1 [label=\"[a-b]\"]\n1 -> 2\n1 [label=\"a\"]\n}");
        assert_eq!(a.step(Some(1), 'a' as Symbol), Some(2));
        assert!(a.accepts(&codes("a")));
        assert!(!a.accepts(&codes("ab")));
    }

    #[test]
    fn test_ambiguous_start() {
        let dfas = parse_graphs("digraph re2c {\n0 -> 2 [label=\"[a]\"]\n1 -> 2 [label=\"[b]\"]\n}");
        assert_eq!(Automaton::from_parsed(&dfas[0]).unwrap_err(),
                   BuildError::AmbiguousStartState(vec![0, 1]));
    }

    #[test]
    fn test_missing_start() {
        let dfas = parse_graphs("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n1 -> 0 [label=\"[b]\"]\n}");
        assert_eq!(Automaton::from_parsed(&dfas[0]).unwrap_err(), BuildError::NoStartState);
        let dfas = parse_graphs("digraph re2c {\n0 [label=\"x\"]\n}");
        assert_eq!(Automaton::from_parsed(&dfas[0]).unwrap_err(), BuildError::NoStartState);
    }

    #[test]
    fn test_difference_and_emptiness() {
        let ab = build(AB);
        let abc = build("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n1 -> 2 [label=\"[b-c]\"]\n2 [label=\"ab\"]\n}");
        assert!(ab.difference(&abc).is_empty());
        let d = abc.difference(&ab);
        assert!(!d.is_empty());
        assert_eq!(d.shortest_accepted(), Some(codes("ac")));
        assert!(abc.union(&ab).same_language(&abc));
        assert!(!ab.union(&abc).same_language(&ab));
    }

    #[test]
    fn test_shortest_prefers_short_then_small() {
        // accepts `b` and `aa`
        let a = build("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n0 -> 2 [label=\"[b]\"]\n1 -> 2 [label=\"[a]\"]\n2 [label=\"x\"]\n}");
        assert_eq!(a.shortest_accepted(), Some(codes("b")));
        let empty = build("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n}");
        assert!(empty.is_empty());
        assert_eq!(empty.shortest_accepted(), None);
    }

    #[test]
    fn test_shortest_skips_empty_string() {
        // accepting start loops to itself on `b`
        let a = build("digraph re2c {\n0 -> 1 [label=\"[a]\"]\n1 -> 2 [label=\"[b]\"]\n0 [label=\"e\"]\n2 [label=\"ab\"]\n}");
        assert!(a.accepts(&[]));
        assert!(!a.is_empty());
        assert_eq!(a.shortest_accepted(), Some(codes("b")));
        assert!(a.accepts(&codes("ab")));
    }

    #[test]
    fn test_same_language_renumbered() {
        let ab = build(AB);
        let other = build("digraph re2c {\n5 -> 6 [label=\"[a]\"]\n6 -> 7 [label=\"[b]\"]\n5 -> 8 [label=\"[b]\"]\n7 [label=\"ab\"]\n}");
        assert!(ab.same_language(&other));
        assert!(ab.difference(&other).is_empty());
        assert!(other.difference(&ab).is_empty());
    }

    #[test]
    fn test_alphabet_mismatch() {
        let ab = build(AB);
        // also reads `z`, which the absorbing final state keeps accepting
        let other = build("digraph re2c {\n5 -> 6 [label=\"[a]\"]\n6 -> 7 [label=\"[b]\"]\n6 -> 8 [label=\"[z]\"]\n7 [label=\"ab\"]\n}");
        assert!(!ab.same_language(&other));
        assert!(ab.difference(&other).is_empty());
        assert_eq!(other.difference(&ab).shortest_accepted(), Some(codes("abz")));
    }
}
