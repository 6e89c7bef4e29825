//! Built-in allocation templates.
//!
//! A template maps budget category names to percentages. Names are matched
//! against the family's active categories case-insensitively when the
//! template is applied.

use serde::Serialize;

use crate::Percentage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateShares {
    /// Fixed `(category name, basis points)` pairs.
    Fixed(&'static [(&'static str, i64)]),
    /// Every active category receives the same share.
    EvenSplit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AllocationTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub shares: TemplateShares,
}

impl AllocationTemplate {
    /// The `(name, percentage)` pairs for fixed templates.
    pub fn fixed_shares(&self) -> Option<Vec<(&'static str, Percentage)>> {
        match self.shares {
            TemplateShares::Fixed(pairs) => Some(
                pairs
                    .iter()
                    .map(|(name, bp)| (*name, Percentage::from_basis_points(*bp)))
                    .collect(),
            ),
            TemplateShares::EvenSplit => None,
        }
    }
}

pub const ALLOCATION_TEMPLATES: &[AllocationTemplate] = &[
    AllocationTemplate {
        id: "fifty_thirty_twenty",
        name: "50/30/20",
        description: "Needs 50%, Wants 30%, Savings 20%",
        shares: TemplateShares::Fixed(&[("Needs", 5_000), ("Wants", 3_000), ("Savings", 2_000)]),
    },
    AllocationTemplate {
        id: "seventy_twenty_ten",
        name: "70/20/10",
        description: "Living 70%, Savings 20%, Giving 10%",
        shares: TemplateShares::Fixed(&[("Living", 7_000), ("Savings", 2_000), ("Giving", 1_000)]),
    },
    AllocationTemplate {
        id: "even_split",
        name: "Even split",
        description: "Equal share for every active budget category",
        shares: TemplateShares::EvenSplit,
    },
];

pub fn find_template(id: &str) -> Option<&'static AllocationTemplate> {
    ALLOCATION_TEMPLATES.iter().find(|t| t.id == id.trim())
}
