//! Canonical fields and the literal headers that resolve to them.

use std::fmt;

/// Number of canonical fields.
pub const FIELD_COUNT: usize = 5;

/// Canonical column identities, independent of the literal header text
/// any particular sheet uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Component,
    Status,
    Owner,
    TargetDate,
    Notes,
}

impl Field {
    /// Fixed iteration order. Alias resolution and report rendering
    /// both follow it, which keeps collision handling deterministic.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Component,
        Field::Status,
        Field::Owner,
        Field::TargetDate,
        Field::Notes,
    ];

    /// Header text used in rendered reports and exports.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Field::Component => "Component",
            Field::Status => "Status",
            Field::Owner => "Owner",
            Field::TargetDate => "Target Date",
            Field::Notes => "Notes",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Accepted literal headers per canonical field.
///
/// Static configuration, fixed at compile time. Matching is against the
/// trimmed literal, case-sensitive. Table order is the collision
/// tiebreak: when two fields accept the same literal, the later entry
/// claims it.
pub const ALIASES: [(Field, &[&str]); FIELD_COUNT] = [
    (
        Field::Component,
        &["Component", "Item", "Deliverable", "Workstream", "Feature"],
    ),
    (
        Field::Status,
        &["Status", "State", "Readiness", "RAG", "RAG Status"],
    ),
    (
        Field::Owner,
        &["Owner", "Assignee", "Responsible", "DRI", "Point of Contact", "POC"],
    ),
    (
        Field::TargetDate,
        &["Target Date", "TargetDate", "Due Date", "Due", "ETA", "Deadline"],
    ),
    (
        Field::Notes,
        &["Notes", "Comments", "Remarks", "Commentary"],
    ),
];

/// Aliases accepted for one field.
pub fn aliases_for(field: Field) -> &'static [&'static str] {
    ALIASES[field.index()].1
}

/// Whether trimmed text equals any field's alias. Used by the
/// header-block scanner to spot header rows.
pub fn is_known_alias(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    ALIASES
        .iter()
        .any(|(_, aliases)| aliases.contains(&trimmed))
}
