//! Declarative rootfs checklist.
//!
//! Checks are static data describing WHAT must be present; the evaluator
//! interprets them against an extracted tree.
//!
//! ```text
//! Check Definition (DATA)              →     Evaluator (LOGIC)
//! ─────────────────────────────              ─────────────────
//! CheckDef {                                 for def in REQUIRED_CHECKS {
//!   name: "busybox_executable",                results.push(evaluate(root, def));
//!   groups: &[&["bin/busybox"], ...],        }
//!   kind: CheckKind::AnyExecutable,
//! }
//! ```
//!
//! A definition lists alternative path groups. A group is satisfied when
//! every path in it exists; the check passes when any group is satisfied.
//! The [`CheckKind`] decides how executability refines that verdict.

pub mod definitions;
pub mod evaluate;

pub use definitions::{OPTIONAL_PRESENCE, REQUIRED_CHECKS};
pub use evaluate::{evaluate, evaluate_all, optional_presence, ChecklistReport};

use serde::Serialize;
use serde_json::{Map, Value};

/// How a check turns path existence into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Passes when any alternative group is fully present.
    AnyOf,
    /// Like [`CheckKind::AnyOf`], and `path` must also be executable.
    MustBeExecutable { path: &'static str },
    /// Passes when at least one existing candidate is executable.
    /// Candidates are the first path of each group.
    AnyExecutable,
}

/// A named, immutable check.
#[derive(Debug, Clone, Copy)]
pub struct CheckDef {
    pub name: &'static str,
    pub groups: &'static [&'static [&'static str]],
    pub kind: CheckKind,
}

impl CheckDef {
    /// The representative path of each alternative.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.iter().filter_map(|g| g.first().copied())
    }
}

/// Outcome of one check. Built once by the evaluator, never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check: String,
    pub ok: bool,
    pub hits: Vec<String>,
    pub extra: Map<String, Value>,
}
