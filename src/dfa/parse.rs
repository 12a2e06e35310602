use std::collections::BTreeSet;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::dfa::{CharCondition, NodeId, ParsedDfa, Symbol, Transition};

const BLOCK_END_MARKER: &str = "}";
const ACCEPT_ANNOTATION_PREFIX: &str = "yyaccept=";
const GROUP_SEPARATOR: &str = "][";
const HEX_PREFIX: &str = "0x";
const HEX_DIGITS: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("empty endpoint in range group '{0}'")]
    EmptyEndpoint(String),
    #[error("invalid hex endpoint '{0}'")]
    BadHex(String),
    #[error("endpoint '{0}' is neither a hex code nor a single character")]
    BadEndpoint(String),
}

fn endpoint(s: &str, group: &str) -> Result<Symbol, RangeError> {
    if s.is_empty() {
        return Err(RangeError::EmptyEndpoint(group.to_owned()));
    }
    if let Some(hex) = s.strip_prefix(HEX_PREFIX) {
        if hex.len() != HEX_DIGITS {
            return Err(RangeError::BadHex(s.to_owned()));
        }
        return Symbol::from_str_radix(hex, 16)
            .map_err(|_| RangeError::BadHex(s.to_owned()));
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c as Symbol),
        _ => Err(RangeError::BadEndpoint(s.to_owned())),
    }
}

/// Splits a group on its range separator. A leading `-` is a literal
/// endpoint, so the search starts after the first character.
fn split_group(group: &str) -> Option<(&str, &str)> {
    let first = group.chars().next()?;
    let rest = &group[first.len_utf8()..];
    let i = rest.find('-')?;
    let at = first.len_utf8() + i;
    Some((&group[..at], &group[at + 1..]))
}

/// Decodes a range token such as `[0x00-0x03][a-c]` into the codes it covers.
/// Bounds are sorted, so `[c-a]` and `[a-c]` cover the same codes.
pub fn decode_char_ranges(range_s: &str) -> Result<BTreeSet<Symbol>, RangeError> {
    let inner = range_s.trim_matches(&['[', ']'][..]);
    let mut chars = BTreeSet::new();
    for group in inner.split(GROUP_SEPARATOR) {
        match split_group(group) {
            Some((a, b)) => {
                let (a, b) = (endpoint(a, group)?, endpoint(b, group)?);
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                chars.extend(lo..=hi);
            }
            None => {
                chars.insert(endpoint(group, group)?);
            }
        }
    }

    Ok(chars)
}

/// Parses the `label` of an edge; tokens other than bracketed ranges are ignored.
/// Fails when the label has range tokens but none of them decodes, so a
/// broken label never turns into an unconditional edge.
fn label_chars(label: &str) -> Result<BTreeSet<Symbol>, RangeError> {
    let mut chars = BTreeSet::new();
    let mut last_err = None;
    for tok in label.split_whitespace() {
        if tok.starts_with(ACCEPT_ANNOTATION_PREFIX) || !tok.contains('[') {
            continue;
        }
        match decode_char_ranges(tok) {
            Ok(codes) => chars.extend(codes),
            Err(e) => {
                warn!("skipping malformed range token '{}': {}", tok, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) if chars.is_empty() => Err(e),
        _ => Ok(chars),
    }
}

pub(crate) struct GraphParser<'a> {
    lines: Vec<&'a str>,
}

impl<'a> GraphParser<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.trim().lines().collect(),
        }
    }

    // LINES

    fn skippable(line: &str) -> bool {
        line.is_empty()
            || line.starts_with("digraph")
            || line.starts_with("//")
            || line.starts_with("/*")
    }

    /// `1 -> 2 [label="[0x61-0x7A]"]`, the label is optional.
    /// `Some(Err(_))` is an edge whose label could not be decoded.
    fn edge_regex(line: &str) -> Option<Result<Transition, RangeError>> {
        lazy_static! {
            static ref RE_EDGE: Regex = Regex::new(
                r#"^(?P<src>\d+)\s*->\s*(?P<dst>\d+)(?:\s*\[label="(?P<label>[^"]+)"\])?"#
            ).expect("Unable to create regex for parsing an edge");
        }

        let cap = RE_EDGE.captures(line)?;
        let src: NodeId = cap.name("src")?.as_str().parse().ok()?;
        let dst: NodeId = cap.name("dst")?.as_str().parse().ok()?;
        let chars = match cap.name("label") {
            Some(label) => label_chars(label.as_str()),
            None => Ok(BTreeSet::new()),
        };

        Some(chars.map(|chars| Transition::new(src, dst, CharCondition::from_set(chars))))
    }

    /// `3 [label="lex.re:4"]`
    fn node_regex(line: &str) -> Option<(NodeId, String)> {
        lazy_static! {
            static ref RE_NODE: Regex = Regex::new(
                r#"^(?P<node>\d+)\s*\[label="(?P<label>[^"]+)"\]"#
            ).expect("Unable to create regex for parsing a node");
        }

        let cap = RE_NODE.captures(line)?;
        let node: NodeId = cap.name("node")?.as_str().parse().ok()?;
        let label = cap.name("label")?.as_str();

        Some((node, label.to_owned()))
    }

    // BLOCKS

    /// Reads one block starting at line `i`. Returns the index just past
    /// the closing brace and the block, or `None` when input ends first.
    /// Unrecognised lines are skipped: the generator output is trusted.
    fn block(&self, i: usize) -> Option<(usize, ParsedDfa)> {
        let mut dfa = ParsedDfa::new();
        let mut j = i;
        while j < self.lines.len() {
            let line = self.lines.get(j)?.trim();
            j += 1;
            if line == BLOCK_END_MARKER {
                return Some((j, dfa));
            }
            if Self::skippable(line) {
                continue;
            }
            match Self::edge_regex(line) {
                Some(Ok(t)) => {
                    dfa.transitions.push(t);
                    continue;
                }
                Some(Err(e)) => {
                    warn!("dropping edge '{}': {}", line, e);
                    continue;
                }
                None => {}
            }
            if let Some(node) = Self::node_regex(line) {
                dfa.final_nodes.push(node);
            }
        }

        None
    }

    pub(crate) fn run(&self) -> Vec<ParsedDfa> {
        let mut dfas: Vec<ParsedDfa> = vec![];
        let mut i = 0;
        while let Some((j, dfa)) = self.block(i) {
            debug!("block {}: {} transitions, {} final nodes",
                   dfas.len(), dfa.transitions.len(), dfa.final_nodes.len());
            dfas.push(dfa);
            i = j;
        }

        dfas
    }
}

/// Parses every graph block of `text`, in order.
pub fn parse_graphs(text: &str) -> Vec<ParsedDfa> {
    GraphParser::new(text).run()
}
