//! Module: decode
//! Responsibility: reconstruct a display tree from encoded plan text.
//! Does not own: the operator model; decoded nodes carry rendered text only.
//! Boundary: accepts exactly the encoder's grammar and rejects everything else.

mod line;


use crate::{
    decode::line::{Glyph, ParsedLine, parse_line},
    encode::{EncodedLine, child_continuation, tree_indent},
    error::CodecError,
    obs::sink::{self, MetricsEvent},
    plan::{DriverSide, RuntimeStats, TaskType},
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// DecodeOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    pub max_depth: usize,
    pub max_lines: usize,
}

impl DecodeOptions {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
    pub const DEFAULT_MAX_LINES: usize = 1_000_000;
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_lines: Self::DEFAULT_MAX_LINES,
        }
    }
}

///
/// DecodedNode
///
/// One decoded line and its children. Fields hold exactly what the line
/// rendered; nothing is re-derived from an operator model.
///

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedNode {
    pub name: String,
    pub id: u64,
    pub label: DriverSide,
    pub est_rows: f64,
    pub task: TaskType,
    pub info: String,
    pub stats: Option<RuntimeStats>,
    pub children: Vec<Self>,
}

impl DecodedNode {
    /// Ident as rendered: `Name_id` plus the optional position label.
    #[must_use]
    pub fn ident(&self) -> String {
        match self.label.label() {
            Some(label) => format!("{}_{}({label})", self.name, self.id),
            None => format!("{}_{}", self.name, self.id),
        }
    }

    fn from_line(line: &ParsedLine<'_>) -> Self {
        Self {
            name: line.name.to_string(),
            id: line.id,
            label: line.label,
            est_rows: line.est_rows,
            task: line.task,
            info: line.info.to_string(),
            stats: line.stats,
            children: Vec::new(),
        }
    }
}

///
/// ExplainRow
/// Tabular EXPLAIN row derived from a decoded node.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainRow {
    pub id: String,
    pub est_rows: String,
    pub task: String,
    pub operator_info: String,
    pub execution_info: String,
}

///
/// DecodedPlan
///
/// Top-level trees in text order: the main plan first, then one tree per
/// CTE definition.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedPlan {
    pub roots: Vec<DecodedNode>,
}

impl DecodedPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of decoded nodes (equal to the number of lines).
    #[must_use]
    pub fn len(&self) -> usize {
        fn count(node: &DecodedNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }

    /// Visit nodes in pre-order with their rendered tree prefix.
    pub fn walk(&self, mut visit: impl FnMut(&str, &DecodedNode)) {
        fn walk_node(
            node: &DecodedNode,
            depth: usize,
            is_last: bool,
            continuation: &str,
            visit: &mut impl FnMut(&str, &DecodedNode),
        ) {
            visit(&tree_indent(depth, is_last, continuation), node);

            let continuation = child_continuation(depth, is_last, continuation);
            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate() {
                walk_node(child, depth + 1, i + 1 == count, &continuation, visit);
            }
        }

        for root in &self.roots {
            walk_node(root, 0, true, "", &mut visit);
        }
    }

    /// Rows for tabular display.
    #[must_use]
    pub fn explain_rows(&self) -> Vec<ExplainRow> {
        let mut rows = Vec::with_capacity(self.len());
        self.walk(|indent, node| {
            rows.push(ExplainRow {
                id: format!("{indent}{}", node.ident()),
                est_rows: format!("{:.2}", node.est_rows),
                task: node.task.to_string(),
                operator_info: node.info.clone(),
                execution_info: node
                    .stats
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        });

        rows
    }
}

/// Re-renders the exact text the plan was decoded from.
impl fmt::Display for DecodedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.walk(|indent, node| {
            if !out.is_empty() {
                out.push('\n');
            }
            EncodedLine {
                indent,
                name: &node.name,
                id: node.id,
                position: node.label,
                est_rows: node.est_rows,
                task: node.task,
                info: &node.info,
                stats: node.stats.as_ref(),
            }
            .write_to(&mut out);
        });

        f.write_str(&out)
    }
}

///
/// PlanDecoder
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanDecoder {
    options: DecodeOptions,
}

impl PlanDecoder {
    #[must_use]
    pub const fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> DecodeOptions {
        self.options
    }

    pub fn decode(&self, text: &str) -> Result<DecodedPlan, CodecError> {
        let result = self.decode_text(text);
        match &result {
            Ok(plan) => sink::record(MetricsEvent::PlanDecoded {
                lines: plan.len() as u64,
            }),
            Err(err) => sink::record(MetricsEvent::DecodeRejected {
                line: err.line().unwrap_or_default() as u64,
            }),
        }

        result
    }

    fn decode_text(&self, text: &str) -> Result<DecodedPlan, CodecError> {
        // A single trailing newline is tolerated; anything more is an
        // empty line and rejected below.
        let body = text.strip_suffix('\n').unwrap_or(text);
        if body.is_empty() {
            return Ok(DecodedPlan::default());
        }

        let mut builder = TreeBuilder::default();
        for (index, raw) in body.split('\n').enumerate() {
            let number = index + 1;
            if number > self.options.max_lines {
                return Err(CodecError::limit_exceeded(
                    number,
                    format!("max_lines {}", self.options.max_lines),
                ));
            }
            if raw.is_empty() {
                return Err(CodecError::malformed_text(number, "empty line"));
            }

            let line = parse_line(number, raw)?;
            if line.depth() > self.options.max_depth {
                return Err(CodecError::limit_exceeded(
                    number,
                    format!("max_depth {}", self.options.max_depth),
                ));
            }

            builder.push(number, &line)?;
        }

        builder.finish()
    }
}

/// Decode `text` with default options.
pub fn decode(text: &str) -> Result<DecodedPlan, CodecError> {
    PlanDecoder::default().decode(text)
}

///
/// Level
/// Sibling state of the most recent node at one depth.
///

#[derive(Clone, Copy, Debug)]
struct Level {
    line: usize,

    /// The node was drawn with `├─`, so a later sibling is still owed.
    open: bool,
}

#[derive(Debug, Default)]
struct TreeBuilder {
    roots: Vec<DecodedNode>,

    /// Path from the current root to the most recent node.
    path: Vec<DecodedNode>,

    /// Sibling state per depth along `path`; index 0 is unused.
    levels: Vec<Level>,
}

impl TreeBuilder {
    fn push(&mut self, number: usize, line: &ParsedLine<'_>) -> Result<(), CodecError> {
        let depth = line.depth();

        if depth > self.path.len() {
            let current = self.path.len().saturating_sub(1);
            return Err(CodecError::malformed_text(
                number,
                format!("depth jumps from {current} to {depth}"),
            ));
        }

        // Levels deeper than this line are finished and must have ended
        // with `└─`.
        self.close_levels(depth + 1)?;

        if depth > 0 {
            if let Some(previous) = self.levels.get(depth)
                && !previous.open
            {
                return Err(CodecError::malformed_text(
                    number,
                    format!("sibling follows a `└─` node at line {}", previous.line),
                ));
            }

            for (level, glyph) in line.continuations.iter().enumerate() {
                let expected = if self.levels[level + 1].open {
                    Glyph::Pipe
                } else {
                    Glyph::Space
                };
                if *glyph != expected {
                    return Err(CodecError::malformed_text(
                        number,
                        "continuation glyph is inconsistent with sibling structure",
                    ));
                }
            }

            self.levels.truncate(depth);
            self.levels.push(Level {
                line: number,
                open: line.connector == Some(Glyph::Branch),
            });
        } else {
            self.levels.clear();
            self.levels.push(Level {
                line: number,
                open: false,
            });
        }

        self.unwind_to(depth);
        self.path.push(DecodedNode::from_line(line));

        Ok(())
    }

    fn finish(mut self) -> Result<DecodedPlan, CodecError> {
        self.close_levels(1)?;
        self.unwind_to(0);

        Ok(DecodedPlan { roots: self.roots })
    }

    // Every level from `from` down must have ended with `└─`.
    fn close_levels(&self, from: usize) -> Result<(), CodecError> {
        match self.levels.iter().skip(from).find(|level| level.open) {
            Some(level) => Err(CodecError::malformed_text(
                level.line,
                "`├─` node has no following sibling",
            )),
            None => Ok(()),
        }
    }

    // Attach finished nodes until `path` holds exactly `depth` ancestors.
    fn unwind_to(&mut self, depth: usize) {
        while self.path.len() > depth {
            let Some(node) = self.path.pop() else {
                break;
            };
            match self.path.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.roots.push(node),
            }
        }
    }
}
