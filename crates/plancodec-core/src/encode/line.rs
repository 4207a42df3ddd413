use crate::plan::{DriverSide, RuntimeStats, TaskType};
use std::fmt::Write;

// Tree glyphs. Each is two characters wide so nesting depth is recoverable
// from the prefix alone.
pub(crate) const TREE_BRANCH: &str = "├─";
pub(crate) const TREE_LAST: &str = "└─";
pub(crate) const TREE_PIPE: &str = "│ ";
pub(crate) const TREE_SPACE: &str = "  ";

///
/// EncodedLine
///
/// Field values of one encoded line:
/// `prefix ident \t est_rows \t task \t info \t stats`.
///

pub(crate) struct EncodedLine<'a> {
    pub(crate) indent: &'a str,
    pub(crate) name: &'a str,
    pub(crate) id: u64,
    pub(crate) position: DriverSide,
    pub(crate) est_rows: f64,
    pub(crate) task: TaskType,
    pub(crate) info: &'a str,
    pub(crate) stats: Option<&'a RuntimeStats>,
}

impl EncodedLine<'_> {
    pub(crate) fn write_to(&self, out: &mut String) {
        let _ = write!(out, "{}{}_{}", self.indent, self.name, self.id);
        if let Some(label) = self.position.label() {
            let _ = write!(out, "({label})");
        }
        let _ = write!(out, "\t{:.2}\t{}\t{}\t", self.est_rows, self.task, self.info);
        if let Some(stats) = self.stats {
            let _ = write!(out, "{stats}");
        }
    }
}

/// Prefix drawn before the ident of a node at `depth`.
pub(crate) fn tree_indent(depth: usize, is_last: bool, continuation: &str) -> String {
    if depth == 0 {
        return String::new();
    }
    let connector = if is_last { TREE_LAST } else { TREE_BRANCH };
    format!("{continuation}{connector}")
}

/// Continuation handed down to the children of a node at `depth`.
pub(crate) fn child_continuation(depth: usize, is_last: bool, continuation: &str) -> String {
    if depth == 0 {
        return String::new();
    }
    let bar = if is_last { TREE_SPACE } else { TREE_PIPE };
    format!("{continuation}{bar}")
}
