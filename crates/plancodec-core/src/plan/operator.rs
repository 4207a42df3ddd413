//! Operator kinds and their per-kind payloads.

use crate::plan::{
    CteId, DriverSide, PlanId,
    expr::{ByItem, ColumnRef, Expr, IndexRef, Literal, ScanRange, TableRef},
};

///
/// Operator
///
/// Closed set of physical operator kinds. Every variant owns exactly the
/// descriptive payload the encoder and normalizer need; shared attributes
/// live on [`PlanNode`](crate::plan::PlanNode).
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    // scans
    TableFullScan(TableScan),
    TableRangeScan(TableScan),
    TableRowIdScan(TableScan),
    IndexFullScan(IndexScan),
    IndexRangeScan(IndexScan),

    // readers
    TableReader,
    IndexReader,
    IndexLookUp,

    // point access
    PointGet(PointGet),
    BatchPointGet(PointGet),
    TableDual { rows: u64 },

    // unary relational
    Selection { conditions: Vec<Expr> },
    Projection { items: Vec<ProjectionItem> },
    Sort { by_items: Vec<ByItem> },
    TopN { by_items: Vec<ByItem>, offset: u64, count: u64 },
    Limit { offset: u64, count: u64 },
    StreamAgg(Aggregation),
    HashAgg(Aggregation),
    Window(Window),

    // binary
    HashJoin(Join),
    MergeJoin(Join),
    IndexJoin(Join),
    Apply(Join),

    // n-ary
    Union,
    PartitionUnion,

    // data movement
    Shuffle(Shuffle),
    ShuffleReceiver,
    ExchangeSender { exchange: ExchangeType },
    ExchangeReceiver,

    // mutation
    Insert { table: TableRef },
    Update { table: TableRef },
    Delete { table: TableRef },

    // common table expressions
    CteFullScan(CteRef),
    CteTable { cte: CteId },
}

impl Operator {
    /// Stable operator name used in both display and normalized text.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TableFullScan(_) => "TableFullScan",
            Self::TableRangeScan(_) => "TableRangeScan",
            Self::TableRowIdScan(_) => "TableRowIDScan",
            Self::IndexFullScan(_) => "IndexFullScan",
            Self::IndexRangeScan(_) => "IndexRangeScan",
            Self::TableReader => "TableReader",
            Self::IndexReader => "IndexReader",
            Self::IndexLookUp => "IndexLookUp",
            Self::PointGet(_) => "PointGet",
            Self::BatchPointGet(_) => "BatchPointGet",
            Self::TableDual { .. } => "TableDual",
            Self::Selection { .. } => "Selection",
            Self::Projection { .. } => "Projection",
            Self::Sort { .. } => "Sort",
            Self::TopN { .. } => "TopN",
            Self::Limit { .. } => "Limit",
            Self::StreamAgg(_) => "StreamAgg",
            Self::HashAgg(_) => "HashAgg",
            Self::Window(_) => "Window",
            Self::HashJoin(_) => "HashJoin",
            Self::MergeJoin(_) => "MergeJoin",
            Self::IndexJoin(_) => "IndexJoin",
            Self::Apply(_) => "Apply",
            Self::Union => "Union",
            Self::PartitionUnion => "PartitionUnion",
            Self::Shuffle(_) => "Shuffle",
            Self::ShuffleReceiver => "ShuffleReceiver",
            Self::ExchangeSender { .. } => "ExchangeSender",
            Self::ExchangeReceiver => "ExchangeReceiver",
            Self::Insert { .. } => "Insert",
            Self::Update { .. } => "Update",
            Self::Delete { .. } => "Delete",
            Self::CteFullScan(_) => "CTEFullScan",
            Self::CteTable { .. } => "CTETable",
        }
    }

    /// Position label of child `index` under this operator.
    ///
    /// Only two-input operators label their children; the label follows the
    /// declared build side, never the child's position alone.
    #[must_use]
    pub const fn child_label(&self, index: usize) -> DriverSide {
        match self {
            Self::HashJoin(join)
            | Self::MergeJoin(join)
            | Self::IndexJoin(join)
            | Self::Apply(join) => {
                let build_index = match join.build_side {
                    BuildSide::Left => 0,
                    BuildSide::Right => 1,
                };
                if index == build_index {
                    DriverSide::Build
                } else {
                    DriverSide::Probe
                }
            }
            Self::IndexLookUp => {
                if index == 0 {
                    DriverSide::Build
                } else {
                    DriverSide::Probe
                }
            }
            _ => DriverSide::None,
        }
    }

    /// CTE definition referenced by this operator, if any.
    #[must_use]
    pub const fn cte_reference(&self) -> Option<CteId> {
        match self {
            Self::CteFullScan(cte_ref) => Some(cte_ref.cte),
            Self::CteTable { cte } => Some(*cte),
            _ => None,
        }
    }

    /// Generated columns this operator defines, with their output position.
    #[must_use]
    pub fn defined_columns(&self) -> Vec<(usize, u64)> {
        match self {
            Self::Projection { items } => {
                generated_positions(items.iter().map(|item| item.output.as_ref()))
            }
            Self::StreamAgg(agg) | Self::HashAgg(agg) => {
                generated_positions(agg.funcs.iter().map(|func| Some(&func.output)))
            }
            Self::Window(window) => {
                generated_positions(window.funcs.iter().map(|func| Some(&func.output)))
            }
            _ => Vec::new(),
        }
    }

    /// Other plan nodes referenced by id from this operator's payload.
    #[must_use]
    pub fn plan_references(&self) -> &[PlanRef] {
        match self {
            Self::Shuffle(shuffle) => &shuffle.data_sources,
            _ => &[],
        }
    }
}

fn generated_positions<'a>(
    outputs: impl Iterator<Item = Option<&'a ColumnRef>>,
) -> Vec<(usize, u64)> {
    outputs
        .enumerate()
        .filter_map(|(pos, column)| match column {
            Some(ColumnRef::Generated(id)) => Some((pos, *id)),
            _ => None,
        })
        .collect()
}

///
/// TableScan
///

#[derive(Clone, Debug, PartialEq)]
pub struct TableScan {
    pub table: TableRef,
    pub partition: Option<String>,
    pub ranges: Vec<ScanRange>,
    pub keep_order: bool,
    pub desc: bool,
}

impl TableScan {
    #[must_use]
    pub const fn new(table: TableRef) -> Self {
        Self {
            table,
            partition: None,
            ranges: Vec::new(),
            keep_order: false,
            desc: false,
        }
    }

    #[must_use]
    pub fn with_ranges(mut self, ranges: Vec<ScanRange>) -> Self {
        self.ranges = ranges;
        self
    }

    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    #[must_use]
    pub const fn keep_order(mut self, keep_order: bool) -> Self {
        self.keep_order = keep_order;
        self
    }
}

///
/// IndexScan
///

#[derive(Clone, Debug, PartialEq)]
pub struct IndexScan {
    pub table: TableRef,
    pub partition: Option<String>,
    pub index: IndexRef,
    pub ranges: Vec<ScanRange>,
    pub keep_order: bool,
    pub desc: bool,
}

impl IndexScan {
    #[must_use]
    pub const fn new(table: TableRef, index: IndexRef) -> Self {
        Self {
            table,
            partition: None,
            index,
            ranges: Vec::new(),
            keep_order: false,
            desc: false,
        }
    }

    #[must_use]
    pub fn with_ranges(mut self, ranges: Vec<ScanRange>) -> Self {
        self.ranges = ranges;
        self
    }

    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }
}

///
/// PointGet
///
/// Single-key (`PointGet`) or multi-key (`BatchPointGet`) lookup by handle
/// or unique index.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PointGet {
    pub table: TableRef,
    pub partition: Option<String>,
    pub index: Option<IndexRef>,
    pub handles: Vec<Literal>,
    pub lock: bool,
}

impl PointGet {
    #[must_use]
    pub fn by_handle(table: TableRef, handle: Literal) -> Self {
        Self {
            table,
            partition: None,
            index: None,
            handles: vec![handle],
            lock: false,
        }
    }

    #[must_use]
    pub const fn by_handles(table: TableRef, handles: Vec<Literal>) -> Self {
        Self {
            table,
            partition: None,
            index: None,
            handles,
            lock: false,
        }
    }

    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: IndexRef) -> Self {
        self.index = Some(index);
        self
    }
}

///
/// ProjectionItem
/// `output` is `None` for a pass-through column.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub output: Option<ColumnRef>,
}

impl ProjectionItem {
    #[must_use]
    pub const fn pass(expr: Expr) -> Self {
        Self { expr, output: None }
    }

    #[must_use]
    pub const fn to_column(expr: Expr, unique_id: u64) -> Self {
        Self {
            expr,
            output: Some(ColumnRef::Generated(unique_id)),
        }
    }
}

///
/// JoinType
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    Semi,
    AntiSemi,
    LeftOuterSemi,
    AntiLeftOuterSemi,
}

impl JoinType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner join",
            Self::LeftOuter => "left outer join",
            Self::RightOuter => "right outer join",
            Self::Semi => "semi join",
            Self::AntiSemi => "anti semi join",
            Self::LeftOuterSemi => "left outer semi join",
            Self::AntiLeftOuterSemi => "anti left outer semi join",
        }
    }
}

///
/// BuildSide
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildSide {
    Left,
    Right,
}

///
/// Join
///
/// Shared payload of the join algorithms. `equal` holds `(left, right)` key
/// pairs; the algorithm is the operator variant itself.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub build_side: BuildSide,
    pub equal: Vec<(Expr, Expr)>,
    pub other: Vec<Expr>,
}

impl Join {
    #[must_use]
    pub const fn new(join_type: JoinType, build_side: BuildSide) -> Self {
        Self {
            join_type,
            build_side,
            equal: Vec::new(),
            other: Vec::new(),
        }
    }

    #[must_use]
    pub fn on(mut self, left: Expr, right: Expr) -> Self {
        self.equal.push((left, right));
        self
    }

    #[must_use]
    pub fn with_other(mut self, cond: Expr) -> Self {
        self.other.push(cond);
        self
    }
}

///
/// AggMode
/// Phase of a split aggregation; structural.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggMode {
    Partial,
    Final,
    Complete,
}

impl AggMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Partial => "partial",
            Self::Final => "final",
            Self::Complete => "complete",
        }
    }
}

///
/// AggFunc
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggFunc {
    pub name: String,
    pub distinct: bool,
    pub args: Vec<Expr>,
    pub output: ColumnRef,
}

impl AggFunc {
    pub fn new(name: impl Into<String>, args: Vec<Expr>, output: ColumnRef) -> Self {
        Self {
            name: name.into(),
            distinct: false,
            args,
            output,
        }
    }
}

///
/// Aggregation
///

#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    pub group_by: Vec<Expr>,
    pub funcs: Vec<AggFunc>,
    pub mode: AggMode,
}

///
/// WindowFunc
///

#[derive(Clone, Debug, PartialEq)]
pub struct WindowFunc {
    pub name: String,
    pub args: Vec<Expr>,
    pub output: ColumnRef,
}

///
/// FrameBound
///

#[derive(Clone, Debug, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Literal),
    CurrentRow,
    Following(Literal),
    UnboundedFollowing,
}

///
/// WindowFrame
///

#[derive(Clone, Debug, PartialEq)]
pub struct WindowFrame {
    pub rows: bool,
    pub start: FrameBound,
    pub end: FrameBound,
}

///
/// Window
///

#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub funcs: Vec<WindowFunc>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<ByItem>,
    pub frame: Option<WindowFrame>,
}

///
/// PlanRef
/// Non-owning reference to another node of the same plan.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanRef {
    pub name: &'static str,
    pub id: PlanId,
}

///
/// Shuffle
///

#[derive(Clone, Debug, PartialEq)]
pub struct Shuffle {
    pub concurrency: u32,
    pub split_by: Vec<Expr>,
    pub data_sources: Vec<PlanRef>,
}

///
/// ExchangeType
///

#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeType {
    PassThrough,
    Broadcast,
    HashPartition(Vec<Expr>),
}

///
/// CteRef
/// Anchor of a CTE consumer; the definition lives in the plan's arena.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CteRef {
    pub cte: CteId,
    pub name: String,
}

///
/// TESTS
///
