//! Runtime execution statistics side table.
//!
//! Statistics exist only when a plan was executed with collection enabled.
//! They are keyed by node identity and never contribute to structure.

use crate::plan::{CteId, PlanId};
use std::{collections::HashMap, fmt, time::Duration};

///
/// RuntimeStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RuntimeStats {
    pub wall_time: Duration,
    pub loops: u64,
    pub act_rows: u64,
    pub memory: Option<u64>,
    pub disk: Option<u64>,
}

impl RuntimeStats {
    #[must_use]
    pub const fn new(wall_time: Duration, loops: u64, act_rows: u64) -> Self {
        Self {
            wall_time,
            loops,
            act_rows,
            memory: None,
            disk: None,
        }
    }

    #[must_use]
    pub const fn with_memory(mut self, bytes: u64) -> Self {
        self.memory = Some(bytes);
        self
    }

    #[must_use]
    pub const fn with_disk(mut self, bytes: u64) -> Self {
        self.disk = Some(bytes);
        self
    }
}

/// Renders the execution-info fragment of an encoded line.
impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time:{}, loops:{}, rows:{}",
            DisplayDuration(self.wall_time),
            self.loops,
            self.act_rows
        )?;
        if let Some(memory) = self.memory {
            write!(f, ", memory:{memory} Bytes")?;
        }
        if let Some(disk) = self.disk {
            write!(f, ", disk:{disk} Bytes")?;
        }
        Ok(())
    }
}

///
/// RuntimeStatsColl
///
/// Per-plan statistics collected by the executor.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RuntimeStatsColl {
    plans: HashMap<PlanId, RuntimeStats>,
    ctes: HashMap<CteId, RuntimeStats>,
}

impl RuntimeStatsColl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_plan(&mut self, id: PlanId, stats: RuntimeStats) {
        self.plans.insert(id, stats);
    }

    pub fn record_cte(&mut self, id: CteId, stats: RuntimeStats) {
        self.ctes.insert(id, stats);
    }

    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<&RuntimeStats> {
        self.plans.get(&id)
    }

    #[must_use]
    pub fn cte(&self, id: CteId) -> Option<&RuntimeStats> {
        self.ctes.get(&id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty() && self.ctes.is_empty()
    }
}

///
/// DisplayDuration
///
/// Exact duration rendering: the unit is chosen by magnitude and the
/// fraction is written without rounding, so parsing recovers the value.
///

pub(crate) struct DisplayDuration(pub Duration);

impl fmt::Display for DisplayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        let (scale, digits, unit) = match nanos {
            0..1_000 => return write!(f, "{nanos}ns"),
            1_000..1_000_000 => (1_000, 3, "µs"),
            1_000_000..1_000_000_000 => (1_000_000, 6, "ms"),
            _ => (1_000_000_000, 9, "s"),
        };

        let whole = nanos / scale;
        let frac = nanos % scale;
        if frac == 0 {
            return write!(f, "{whole}{unit}");
        }

        let frac = format!("{frac:0digits$}");
        write!(f, "{whole}.{}{unit}", frac.trim_end_matches('0'))
    }
}

/// Parse a duration rendered by [`DisplayDuration`].
pub(crate) fn parse_duration(text: &str) -> Option<Duration> {
    let (number, scale, digits) = if let Some(number) = text.strip_suffix("ns") {
        (number, 1, 0)
    } else if let Some(number) = text.strip_suffix("µs") {
        (number, 1_000, 3)
    } else if let Some(number) = text.strip_suffix("ms") {
        (number, 1_000_000, 6)
    } else if let Some(number) = text.strip_suffix('s') {
        (number, 1_000_000_000, 9)
    } else {
        return None;
    };

    let (whole, frac) = match number.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (number, ""),
    };
    if whole.is_empty() || !is_ascii_digits(whole) || frac.len() > digits {
        return None;
    }
    if number.contains('.') && (frac.is_empty() || !is_ascii_digits(frac)) {
        return None;
    }

    let whole: u128 = whole.parse().ok()?;
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<digits$}");
        padded.parse().ok()?
    };

    let nanos = whole.checked_mul(scale)?.checked_add(frac)?;
    let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
    let subsec = u32::try_from(nanos % 1_000_000_000).ok()?;

    Some(Duration::new(secs, subsec))
}

fn is_ascii_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

///
/// TESTS
///
