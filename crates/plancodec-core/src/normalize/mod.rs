//! Module: normalize
//! Responsibility: canonical, literal-free plan text and its digest.
//! Does not own: operator info vocabulary (see `explain`).
//! Boundary: tree and flat normalization agree on text and digest.

mod digest;
mod relabel;

#[cfg(test)]
mod tests;

use crate::{
    explain::{InfoStyle, write_info},
    flat::{FlatOrigin, FlatPhysicalPlan},
    normalize::relabel::Relabel,
    obs::sink::{self, MetricsEvent, Surface},
    plan::{CteDefinition, DriverSide, PhysicalPlan, PlanNode, TaskType},
};
use std::fmt::Write;

// re-exports
pub use digest::PlanDigest;

///
/// NormalizedPlan
///
/// Canonical text plus digest. `digest` is `None` exactly when no plan was
/// available to normalize.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizedPlan {
    pub text: String,
    pub digest: Option<PlanDigest>,
}

impl NormalizedPlan {
    fn unavailable(surface: Surface) -> Self {
        sink::record(MetricsEvent::PlanUnavailable { surface });

        Self {
            text: String::new(),
            digest: None,
        }
    }

    fn finish(text: String, relabel: &Relabel, surface: Surface) -> Self {
        sink::record(MetricsEvent::PlanNormalized {
            surface,
            nodes: relabel.len() as u64,
        });
        let digest = PlanDigest::of_text(&text);

        Self {
            text,
            digest: Some(digest),
        }
    }

    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        self.digest.is_none()
    }
}

/// Normalize by walking the operator tree directly.
#[must_use]
pub fn normalize_tree(plan: Option<&PhysicalPlan>) -> NormalizedPlan {
    let Some(plan) = plan else {
        return NormalizedPlan::unavailable(Surface::Tree);
    };
    let ctes = plan.referenced_ctes();

    let mut relabel = Relabel::default();
    register_subtree(&mut relabel, &plan.root);
    for cte in &ctes {
        relabel.register_cte(cte.id);
        for (part, _) in cte.parts() {
            register_subtree(&mut relabel, part);
        }
    }

    let mut walk = TreeWalk {
        out: String::new(),
        relabel: &relabel,
        ordinal: 0,
    };
    walk.node(&plan.root, 0, DriverSide::None);
    for cte in &ctes {
        walk.cte(cte);
    }

    let text = walk.out;
    NormalizedPlan::finish(text, &relabel, Surface::Tree)
}

/// Normalize from flattened entries.
#[must_use]
pub fn normalize_flat(flat: &FlatPhysicalPlan<'_>) -> NormalizedPlan {
    if flat.is_empty() {
        return NormalizedPlan::unavailable(Surface::Flat);
    }

    let mut relabel = Relabel::default();
    for entry in flat.entries() {
        match entry.origin {
            FlatOrigin::Node(node) => relabel.register_node(node),
            FlatOrigin::Cte(cte) => relabel.register_cte(cte.id),
        }
    }

    let mut out = String::new();
    for (ordinal, entry) in flat.entries().enumerate() {
        match entry.origin {
            FlatOrigin::Node(node) => {
                push_node_line(&mut out, &relabel, node, entry.depth, ordinal, entry.position);
            }
            FlatOrigin::Cte(cte) => push_cte_line(&mut out, &relabel, cte),
        }
    }

    NormalizedPlan::finish(out, &relabel, Surface::Flat)
}

fn register_subtree(relabel: &mut Relabel, node: &PlanNode) {
    relabel.register_node(node);
    for child in &node.children {
        register_subtree(relabel, child);
    }
}

// Direct recursive walk; `ordinal` advances exactly as registration did.
struct TreeWalk<'r> {
    out: String,
    relabel: &'r Relabel,
    ordinal: usize,
}

impl TreeWalk<'_> {
    fn node(&mut self, node: &PlanNode, depth: usize, position: DriverSide) {
        push_node_line(&mut self.out, self.relabel, node, depth, self.ordinal, position);
        self.ordinal += 1;

        for (child, side) in node.labelled_children() {
            self.node(child, depth + 1, side);
        }
    }

    fn cte(&mut self, cte: &CteDefinition) {
        push_cte_line(&mut self.out, self.relabel, cte);
        self.ordinal += 1;

        for (part, side) in cte.parts() {
            self.node(part, 1, side);
        }
    }
}

fn push_node_line(
    out: &mut String,
    relabel: &Relabel,
    node: &PlanNode,
    depth: usize,
    ordinal: usize,
    position: DriverSide,
) {
    start_line(out);
    let _ = write!(out, "{depth}\t{}_{ordinal}", node.name());
    if let Some(label) = position.label() {
        let _ = write!(out, "({label})");
    }
    let _ = write!(out, "\t{}\t", node.task);
    write_info(out, node, relabel);
}

fn push_cte_line(out: &mut String, relabel: &Relabel, cte: &CteDefinition) {
    start_line(out);
    out.push_str("0\t");
    relabel.cte(out, cte.id);
    let _ = write!(out, "\t{}\t{}", TaskType::ROOT, cte.info());
}

fn start_line(out: &mut String) {
    if !out.is_empty() {
        out.push('\n');
    }
}
