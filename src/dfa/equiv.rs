use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::dfa::automaton::Automaton;
use crate::dfa::Symbol;

#[derive(Debug, Error, PartialEq)]
pub enum EquivError {
    #[error("equivalence checks disagree: difference emptiness says {by_difference}, union identity says {by_union}")]
    Inconsistent {
        by_difference: bool,
        by_union: bool,
    },
}

/// A string accepted by exactly one of two automata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Witness(pub Vec<Symbol>);

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &c in &self.0 {
            match char::from_u32(c) {
                Some(ch) => write!(f, "{}", ch)?,
                None => write!(f, "\\u{{{:X}}}", c)?,
            }
        }
        Ok(())
    }
}

/// Outcome of comparing a first automaton `A` with a second one `Z`.
/// A difference made of the empty string alone leaves `equivalent` false
/// with no witness on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub equivalent: bool,
    /// smallest string in `A` minus `Z`
    pub only_first: Option<Witness>,
    /// smallest string in `Z` minus `A`
    pub only_second: Option<Witness>,
}

/// Smallest non-empty string of `diff`. `None` when the language is empty
/// or holds only the empty string.
fn witness(diff: &Automaton) -> Option<Witness> {
    diff.shortest_accepted().map(Witness)
}

fn reconcile(by_difference: bool, by_union: bool) -> Result<bool, EquivError> {
    if by_difference != by_union {
        return Err(EquivError::Inconsistent {
            by_difference,
            by_union,
        });
    }
    Ok(by_difference)
}

/// Decides whether `a` and `z` accept the same language over the union of
/// their alphabets, checked both by difference emptiness and by union
/// identity.
pub fn compare(a: &Automaton, z: &Automaton) -> Result<Verdict, EquivError> {
    let zad = z.difference(a);
    let adz = a.difference(z);
    debug!("Z - A: {}", zad);
    debug!("A - Z: {}", adz);

    let by_difference = zad.is_empty() && adz.is_empty();
    let by_union = a.union(z).same_language(a) && z.union(a).same_language(z);
    let equivalent = reconcile(by_difference, by_union)?;
    info!("automata equivalent: {}", equivalent);

    Ok(Verdict {
        equivalent,
        only_first: witness(&adz),
        only_second: witness(&zad),
    })
}
