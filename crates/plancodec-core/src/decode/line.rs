//! Grammar of a single encoded line.

use crate::{
    encode::{TREE_BRANCH, TREE_LAST, TREE_PIPE, TREE_SPACE},
    error::CodecError,
    plan::{DriverSide, RuntimeStats, TaskType, stats::parse_duration},
};

///
/// Glyph
/// Two-character prefix unit.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Glyph {
    Pipe,
    Space,
    Branch,
    Last,
}

///
/// ParsedLine
///

#[derive(Debug)]
pub(super) struct ParsedLine<'t> {
    pub(super) continuations: Vec<Glyph>,
    pub(super) connector: Option<Glyph>,
    pub(super) name: &'t str,
    pub(super) id: u64,
    pub(super) label: DriverSide,
    pub(super) est_rows: f64,
    pub(super) task: TaskType,
    pub(super) info: &'t str,
    pub(super) stats: Option<RuntimeStats>,
}

impl ParsedLine<'_> {
    pub(super) const fn depth(&self) -> usize {
        match self.connector {
            Some(_) => self.continuations.len() + 1,
            None => 0,
        }
    }
}

pub(super) fn parse_line(number: usize, text: &str) -> Result<ParsedLine<'_>, CodecError> {
    let (continuations, connector, rest) = parse_prefix(number, text)?;

    let fields: Vec<&str> = rest.split('\t').collect();
    let [ident, est_rows, task, info, stats] = fields[..] else {
        return Err(CodecError::malformed_text(
            number,
            format!("expected 5 tab-separated fields, found {}", fields.len()),
        ));
    };

    let (name, id, label) = parse_ident(number, ident)?;

    Ok(ParsedLine {
        continuations,
        connector,
        name,
        id,
        label,
        est_rows: parse_est_rows(number, est_rows)?,
        task: TaskType::parse(task)
            .ok_or_else(|| CodecError::malformed_text(number, format!("unknown task '{task}'")))?,
        info,
        stats: parse_stats(number, stats)?,
    })
}

fn parse_prefix(
    number: usize,
    text: &str,
) -> Result<(Vec<Glyph>, Option<Glyph>, &str), CodecError> {
    const GLYPHS: [(&str, Glyph); 4] = [
        (TREE_PIPE, Glyph::Pipe),
        (TREE_SPACE, Glyph::Space),
        (TREE_BRANCH, Glyph::Branch),
        (TREE_LAST, Glyph::Last),
    ];

    let mut continuations = Vec::new();
    let mut rest = text;

    loop {
        if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            if continuations.is_empty() {
                return Ok((continuations, None, rest));
            }
            return Err(CodecError::malformed_text(
                number,
                "tree prefix has no connector before the ident",
            ));
        }

        let Some((tail, glyph)) = GLYPHS
            .iter()
            .find_map(|(prefix, glyph)| rest.strip_prefix(*prefix).map(|tail| (tail, *glyph)))
        else {
            return Err(CodecError::malformed_text(number, "invalid tree prefix glyph"));
        };
        rest = tail;

        match glyph {
            Glyph::Pipe | Glyph::Space => continuations.push(glyph),
            Glyph::Branch | Glyph::Last => return Ok((continuations, Some(glyph), rest)),
        }
    }
}

fn parse_ident(number: usize, ident: &str) -> Result<(&str, u64, DriverSide), CodecError> {
    let (base, label) = match ident.strip_suffix(')') {
        Some(open) => {
            let (base, label) = open.rsplit_once('(').ok_or_else(|| {
                CodecError::malformed_text(number, "unbalanced position label")
            })?;
            let label = DriverSide::from_label(label).ok_or_else(|| {
                CodecError::malformed_text(number, format!("unknown position label '{label}'"))
            })?;
            (base, label)
        }
        None => (ident, DriverSide::None),
    };

    let (name, id) = base
        .rsplit_once('_')
        .ok_or_else(|| CodecError::malformed_text(number, format!("ident '{ident}' has no id")))?;

    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(CodecError::malformed_text(
            number,
            format!("invalid operator name '{name}'"),
        ));
    }

    let parsed = parse_canonical_u64(id)
        .ok_or_else(|| CodecError::malformed_text(number, format!("invalid id '{id}'")))?;

    Ok((name, parsed, label))
}

fn parse_est_rows(number: usize, text: &str) -> Result<f64, CodecError> {
    let value: f64 = text.parse().map_err(|_| {
        CodecError::malformed_text(number, format!("invalid row estimate '{text}'"))
    })?;

    // Only the encoder's own two-digit rendering is accepted.
    if format!("{value:.2}") != text {
        return Err(CodecError::malformed_text(
            number,
            format!("row estimate '{text}' is not rendered with two fractional digits"),
        ));
    }

    Ok(value)
}

fn parse_stats(number: usize, text: &str) -> Result<Option<RuntimeStats>, CodecError> {
    if text.is_empty() {
        return Ok(None);
    }

    let invalid = || CodecError::malformed_text(number, format!("invalid stats fragment '{text}'"));

    let mut parts = text.split(", ");
    let wall_time = parts
        .next()
        .and_then(|part| part.strip_prefix("time:"))
        .and_then(parse_duration)
        .ok_or_else(invalid)?;
    let loops = parts
        .next()
        .and_then(|part| part.strip_prefix("loops:"))
        .and_then(parse_canonical_u64)
        .ok_or_else(invalid)?;
    let act_rows = parts
        .next()
        .and_then(|part| part.strip_prefix("rows:"))
        .and_then(parse_canonical_u64)
        .ok_or_else(invalid)?;

    let mut stats = RuntimeStats::new(wall_time, loops, act_rows);
    for part in parts {
        if let Some(bytes) = part.strip_prefix("memory:").and_then(parse_bytes) {
            stats = stats.with_memory(bytes);
        } else if let Some(bytes) = part.strip_prefix("disk:").and_then(parse_bytes) {
            stats = stats.with_disk(bytes);
        } else {
            return Err(invalid());
        }
    }

    // Reject reordered or repeated counters.
    if stats.to_string() != text {
        return Err(invalid());
    }

    Ok(Some(stats))
}

fn parse_bytes(text: &str) -> Option<u64> {
    text.strip_suffix(" Bytes").and_then(parse_canonical_u64)
}

fn parse_canonical_u64(text: &str) -> Option<u64> {
    let value: u64 = text.parse().ok()?;
    (value.to_string() == text).then_some(value)
}
