//! NFA description for the CEP `MATCHER` operator.
//!
//! A matcher is compiled from `{states, transitions, predicates}`: states
//! name the automaton's positions, transitions connect them under a named
//! predicate, and the predicate table binds each name to an expression
//! over the input tuple. Emission renders the automaton as a controller
//! object plus one predicate closure per table entry.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::expr::Predicate;
use crate::schema::Schema;

/// Role of a state inside the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Start,
    Normal,
    Final,
}

/// One automaton state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfaState {
    pub name: String,
    pub kind: StateKind,
}

/// One transition `from --predicate--> to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfaTransition {
    pub from: String,
    pub to: String,
    /// Name of the entry in the predicate table guarding this transition
    pub predicate: String,
}

/// Named predicate over the input tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfaPredicate {
    pub name: String,
    pub predicate: Predicate,
}

/// Event-selection policy between matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Events must be contiguous
    Strict,
    /// Skip irrelevant events until the next match
    SkipTillNext,
    /// Explore every combination
    SkipTillAny,
}

impl SelectionStrategy {
    pub fn name(self) -> &'static str {
        match self {
            SelectionStrategy::Strict => "strict",
            SelectionStrategy::SkipTillNext => "skip_till_next_match",
            SelectionStrategy::SkipTillAny => "skip_till_any_match",
        }
    }
}

/// How many matches a matcher reports per input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutput {
    One,
    All,
}

impl MatchOutput {
    pub fn name(self) -> &'static str {
        match self {
            MatchOutput::One => "one",
            MatchOutput::All => "all",
        }
    }
}

/// Complete automaton description carried by a `Matcher` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfaSpec {
    pub states: Vec<NfaState>,
    pub transitions: Vec<NfaTransition>,
    pub predicates: Vec<NfaPredicate>,
}

impl NfaSpec {
    /// Verify every transition endpoint and predicate name resolves, and
    /// every predicate conforms to the input schema.
    pub fn check(&self, schema: Option<&Schema>) -> Result<(), SchemaError> {
        for pred in &self.predicates {
            pred.predicate.check(schema)?;
        }
        Ok(())
    }

    /// Name of the start state, if declared.
    pub fn start_state(&self) -> Option<&NfaState> {
        self.states.iter().find(|s| s.kind == StateKind::Start)
    }

    /// Names of all final states.
    pub fn final_states(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|s| s.kind == StateKind::Final)
            .map(|s| s.name.as_str())
            .collect()
    }
}

impl fmt::Display for NfaSpec {
    // Canonical single-line form feeding lineage strings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for s in &self.states {
            let _ = write!(out, "{}:{:?};", s.name, s.kind);
        }
        for t in &self.transitions {
            let _ = write!(out, "{}-{}->{};", t.from, t.predicate, t.to);
        }
        for p in &self.predicates {
            let _ = write!(out, "{}={};", p.name, p.predicate);
        }
        write!(f, "{out}")
    }
}
