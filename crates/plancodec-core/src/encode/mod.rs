//! Module: encode
//! Responsibility: display encoding of plans, from the tree or its flat form.
//! Does not own: operator info text (see `explain`) or flattening.
//! Boundary: both entry points emit byte-identical text for the same plan.

mod line;


use crate::{
    explain::{DisplayStyle, write_info},
    flat::{FlatOrigin, FlatPhysicalPlan},
    obs::sink::{self, MetricsEvent, Surface},
    plan::{
        CteDefinition, DriverSide, PhysicalPlan, PlanNode, TaskType, stats::RuntimeStatsColl,
    },
};
use serde::{Deserialize, Serialize};

pub(crate) use line::{
    EncodedLine, TREE_BRANCH, TREE_LAST, TREE_PIPE, TREE_SPACE, child_continuation, tree_indent,
};

///
/// EncodeOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
    /// Render the execution-info column when statistics were collected.
    pub include_runtime_stats: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            include_runtime_stats: true,
        }
    }
}

///
/// PlanEncoder
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanEncoder {
    options: EncodeOptions,
}

impl PlanEncoder {
    #[must_use]
    pub const fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> EncodeOptions {
        self.options
    }

    /// Encode by walking the operator tree directly.
    #[must_use]
    pub fn encode_tree(&self, plan: Option<&PhysicalPlan>) -> String {
        let Some(plan) = plan else {
            sink::record(MetricsEvent::PlanUnavailable {
                surface: Surface::Tree,
            });
            return String::new();
        };

        let stats = plan
            .runtime_stats
            .as_ref()
            .filter(|_| self.options.include_runtime_stats);
        let mut walk = TreeWalk {
            out: String::new(),
            lines: 0,
            with_stats: false,
            stats,
        };

        walk.node(&plan.root, 0, true, "", DriverSide::None);
        for cte in plan.referenced_ctes() {
            walk.cte(cte);
        }

        sink::record(MetricsEvent::PlanEncoded {
            surface: Surface::Tree,
            lines: walk.lines,
            with_stats: walk.with_stats,
        });

        walk.out
    }

    /// Encode from flattened entries.
    #[must_use]
    pub fn encode_flat(&self, flat: &FlatPhysicalPlan<'_>) -> String {
        if flat.is_empty() {
            sink::record(MetricsEvent::PlanUnavailable {
                surface: Surface::Flat,
            });
            return String::new();
        }

        let mut out = String::new();
        let mut lines = 0;
        let mut with_stats = false;

        for entry in flat.entries() {
            let stats = entry
                .stats
                .filter(|_| entry.include_stats && self.options.include_runtime_stats);
            with_stats |= stats.is_some();

            let mut info = String::new();
            match entry.origin {
                FlatOrigin::Node(node) => write_info(&mut info, node, &DisplayStyle),
                FlatOrigin::Cte(cte) => info.push_str(cte.info()),
            }

            let line = EncodedLine {
                indent: &entry.tree_indent,
                name: entry.origin.name(),
                id: entry.origin.raw_id(),
                position: entry.position,
                est_rows: entry.origin.est_rows(),
                task: entry.origin.task(),
                info: &info,
                stats,
            };
            push_line(&mut out, &line);
            lines += 1;
        }

        sink::record(MetricsEvent::PlanEncoded {
            surface: Surface::Flat,
            lines,
            with_stats,
        });

        out
    }
}

/// Encode `plan` with default options by walking the tree.
#[must_use]
pub fn encode_tree(plan: Option<&PhysicalPlan>) -> String {
    PlanEncoder::default().encode_tree(plan)
}

/// Encode a flattened plan with default options.
#[must_use]
pub fn encode_flat(flat: &FlatPhysicalPlan<'_>) -> String {
    PlanEncoder::default().encode_flat(flat)
}

fn push_line(out: &mut String, line: &EncodedLine<'_>) {
    if !out.is_empty() {
        out.push('\n');
    }
    line.write_to(out);
}

// Direct recursive walk.
struct TreeWalk<'p> {
    out: String,
    lines: u64,
    with_stats: bool,
    stats: Option<&'p RuntimeStatsColl>,
}

impl TreeWalk<'_> {
    fn node(
        &mut self,
        node: &PlanNode,
        depth: usize,
        is_last: bool,
        continuation: &str,
        position: DriverSide,
    ) {
        let indent = tree_indent(depth, is_last, continuation);
        let mut info = String::new();
        write_info(&mut info, node, &DisplayStyle);

        self.push(&EncodedLine {
            indent: &indent,
            name: node.name(),
            id: node.id.0,
            position,
            est_rows: node.est_rows,
            task: node.task,
            info: &info,
            stats: self.stats.and_then(|stats| stats.plan(node.id)),
        });

        let continuation = child_continuation(depth, is_last, continuation);
        let count = node.children.len();
        for (i, (child, side)) in node.labelled_children().enumerate() {
            self.node(child, depth + 1, i + 1 == count, &continuation, side);
        }
    }

    fn cte(&mut self, cte: &CteDefinition) {
        self.push(&EncodedLine {
            indent: "",
            name: "CTE",
            id: cte.id.0,
            position: DriverSide::None,
            est_rows: cte.est_rows,
            task: TaskType::ROOT,
            info: cte.info(),
            stats: self.stats.and_then(|stats| stats.cte(cte.id)),
        });

        let count = cte.parts().count();
        for (i, (part, side)) in cte.parts().enumerate() {
            self.node(part, 1, i + 1 == count, "", side);
        }
    }

    fn push(&mut self, line: &EncodedLine<'_>) {
        push_line(&mut self.out, line);
        self.lines += 1;
        self.with_stats |= line.stats.is_some();
    }
}
