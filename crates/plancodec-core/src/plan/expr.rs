//! Expression vocabulary carried in operator payloads.
//!
//! Expressions are descriptive only: the engine renders them, it never
//! evaluates them.

use std::fmt;

///
/// Escaped
///
/// Free text embedded in a plan line. Plain text is written bare; text that
/// could break the line grammar or run into a neighbouring separator is
/// quoted with string escapes, the same form string literals use.
///

#[derive(Clone, Copy, Debug)]
pub struct Escaped<'a> {
    text: &'a str,
    separators: &'static [char],
}

impl<'a> Escaped<'a> {
    const NAME_SEPARATORS: &'static [char] = &['.', ',', ':', '(', ')', '[', ']'];

    /// Identifier: schema, table, column, index, partition, CTE, or function name.
    #[must_use]
    pub const fn name(text: &'a str) -> Self {
        Self {
            text,
            separators: Self::NAME_SEPARATORS,
        }
    }

    /// Unquoted value text such as a decimal literal.
    #[must_use]
    pub const fn value(text: &'a str) -> Self {
        Self {
            text,
            separators: &[],
        }
    }

    fn needs_quotes(&self) -> bool {
        self.text.is_empty()
            || self.text.chars().any(|c| {
                c.is_control() || c == '"' || c == '\\' || self.separators.contains(&c)
            })
    }
}

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.needs_quotes() {
            write!(f, "{:?}", self.text)
        } else {
            f.write_str(self.text)
        }
    }
}

///
/// Literal
///
/// Constant operand. Literals are rendered verbatim for display and erased
/// entirely during normalization.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Decimal(String),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(value) => write!(f, "{}", u8::from(*value)),
            Self::Int(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{}", Escaped::value(value)),
            // Debug escaping keeps tabs and newlines out of the line format.
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

///
/// ColumnRef
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ColumnRef {
    /// Base-table column; structural.
    Named {
        schema: String,
        table: String,
        column: String,
    },

    /// Column synthesized during compilation (`Column#<id>`); the id is
    /// allocated in compilation order and therefore volatile.
    Generated(u64),
}

impl ColumnRef {
    pub fn named(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::Named {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                schema,
                table,
                column,
            } => write!(
                f,
                "{}.{}.{}",
                Escaped::name(schema),
                Escaped::name(table),
                Escaped::name(column)
            ),
            Self::Generated(id) => write!(f, "Column#{id}"),
        }
    }
}

///
/// Expr
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Constant(Literal),
    Func { name: String, args: Vec<Self> },
}

impl Expr {
    #[must_use]
    pub fn col(schema: &str, table: &str, column: &str) -> Self {
        Self::Column(ColumnRef::named(schema, table, column))
    }

    #[must_use]
    pub const fn generated(id: u64) -> Self {
        Self::Column(ColumnRef::Generated(id))
    }

    #[must_use]
    pub const fn lit(value: Literal) -> Self {
        Self::Constant(value)
    }

    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Constant(Literal::Int(value))
    }

    pub fn func(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Func {
            name: name.into(),
            args,
        }
    }

    /// Whether this expression is the `in(...)` membership function.
    #[must_use]
    pub fn is_in_list(&self) -> bool {
        matches!(self, Self::Func { name, .. } if name == "in" || name == "not in")
    }

    /// Visit every column reference in pre-order.
    pub fn for_each_column(&self, f: &mut impl FnMut(&ColumnRef)) {
        match self {
            Self::Column(column) => f(column),
            Self::Constant(_) => {}
            Self::Func { args, .. } => {
                for arg in args {
                    arg.for_each_column(f);
                }
            }
        }
    }
}

///
/// ByItem
/// One ORDER BY / TopN / window ordering key.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ByItem {
    pub expr: Expr,
    pub desc: bool,
}

impl ByItem {
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self { expr, desc: false }
    }

    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self { expr, desc: true }
    }
}

///
/// RangePoint
///

#[derive(Clone, Debug, PartialEq)]
pub enum RangePoint {
    NegInf,
    PosInf,
    Values(Vec<Literal>),
}

///
/// ScanRange
///
/// One key range of a table or index scan, rendered `[low,high)` style.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ScanRange {
    pub low: RangePoint,
    pub low_exclusive: bool,
    pub high: RangePoint,
    pub high_exclusive: bool,
}

impl ScanRange {
    /// Single-point range `[v,v]`.
    #[must_use]
    pub fn point(values: Vec<Literal>) -> Self {
        Self {
            low: RangePoint::Values(values.clone()),
            low_exclusive: false,
            high: RangePoint::Values(values),
            high_exclusive: false,
        }
    }

    /// Open-below range `[-inf,v)`.
    #[must_use]
    pub fn less_than(value: Literal) -> Self {
        Self {
            low: RangePoint::NegInf,
            low_exclusive: false,
            high: RangePoint::Values(vec![value]),
            high_exclusive: true,
        }
    }

    /// Open-above range `(v,+inf]`.
    #[must_use]
    pub fn greater_than(value: Literal) -> Self {
        Self {
            low: RangePoint::Values(vec![value]),
            low_exclusive: true,
            high: RangePoint::PosInf,
            high_exclusive: false,
        }
    }

    #[must_use]
    pub const fn full() -> Self {
        Self {
            low: RangePoint::NegInf,
            low_exclusive: false,
            high: RangePoint::PosInf,
            high_exclusive: false,
        }
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.low_exclusive { "(" } else { "[" })?;
        write_range_point(f, &self.low)?;
        f.write_str(",")?;
        write_range_point(f, &self.high)?;
        f.write_str(if self.high_exclusive { ")" } else { "]" })
    }
}

fn write_range_point(f: &mut fmt::Formatter<'_>, point: &RangePoint) -> fmt::Result {
    match point {
        RangePoint::NegInf => f.write_str("-inf"),
        RangePoint::PosInf => f.write_str("+inf"),
        RangePoint::Values(values) => {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{value}")?;
            }
            Ok(())
        }
    }
}

///
/// TableRef
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

/// Schema-qualified name.
impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Escaped::name(&self.schema), Escaped::name(&self.name))
    }
}

///
/// IndexRef
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexRef {
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexRef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", Escaped::name(&self.name))?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", Escaped::name(column))?;
        }
        f.write_str(")")
    }
}

///
/// TESTS
///
