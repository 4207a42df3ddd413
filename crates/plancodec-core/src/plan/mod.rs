//! Module: plan
//! Responsibility: read-only physical plan model consumed by the codec.
//! Does not own: plan construction or optimization.
//! Boundary: every encoder, flattener, and normalizer walk starts here.

pub mod expr;
pub mod operator;
pub mod stats;

use crate::plan::{operator::Operator, stats::RuntimeStatsColl};
use std::{cell::Cell, collections::BTreeMap, fmt};

// re-exports
pub use expr::{
    ByItem, ColumnRef, Escaped, Expr, IndexRef, Literal, RangePoint, ScanRange, TableRef,
};
pub use operator::{
    AggFunc, AggMode, Aggregation, BuildSide, CteRef, ExchangeType, FrameBound, IndexScan, Join,
    JoinType, PlanRef, PointGet, ProjectionItem, Shuffle, TableScan, Window, WindowFrame,
    WindowFunc,
};
pub use stats::RuntimeStats;

///
/// PlanId
///
/// Session-scoped sequential node identity. Volatile: it is rendered for
/// display but never part of a plan's structural identity.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PlanId(pub u64);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// CteId
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CteId(pub u64);

impl fmt::Display for CteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// PlanIdAllocator
///
/// Explicit identity source handed to whoever builds plans. The codec itself
/// never allocates identities.
///

#[derive(Debug, Default)]
pub struct PlanIdAllocator {
    next: Cell<u64>,
}

impl PlanIdAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: Cell::new(0) }
    }

    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: Cell::new(first),
        }
    }

    pub fn next_id(&self) -> PlanId {
        let id = self.next.get();
        self.next.set(id + 1);
        PlanId(id)
    }

    pub fn reset(&self) {
        self.next.set(0);
    }
}

///
/// TaskKind
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TaskKind {
    #[default]
    Root,
    /// Pushed down to the storage layer.
    Cop,
    /// Pushed down to the columnar engine.
    Mpp,
}

///
/// StoreKind
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StoreKind {
    #[default]
    Row,
    Columnar,
}

///
/// TaskType
/// Rendered task column: `root`, `cop[row]`, `mpp[columnar]`, ...
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TaskType {
    pub task: TaskKind,
    pub store: StoreKind,
}

impl TaskType {
    pub const ROOT: Self = Self {
        task: TaskKind::Root,
        store: StoreKind::Row,
    };

    /// Parse a rendered task column.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text == "root" {
            return Some(Self::ROOT);
        }

        let (task, rest) = if let Some(rest) = text.strip_prefix("cop[") {
            (TaskKind::Cop, rest)
        } else if let Some(rest) = text.strip_prefix("mpp[") {
            (TaskKind::Mpp, rest)
        } else {
            return None;
        };

        let store = match rest {
            "row]" => StoreKind::Row,
            "columnar]" => StoreKind::Columnar,
            _ => return None,
        };

        Some(Self { task, store })
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = match self.task {
            TaskKind::Root => return f.write_str("root"),
            TaskKind::Cop => "cop",
            TaskKind::Mpp => "mpp",
        };
        let store = match self.store {
            StoreKind::Row => "row",
            StoreKind::Columnar => "columnar",
        };
        write!(f, "{task}[{store}]")
    }
}

///
/// DriverSide
///
/// Position tag of a node under its parent, rendered as an ident suffix.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DriverSide {
    #[default]
    None,
    Build,
    Probe,
    SeedPart,
    RecursivePart,
}

impl DriverSide {
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Build => Some("Build"),
            Self::Probe => Some("Probe"),
            Self::SeedPart => Some("Seed Part"),
            Self::RecursivePart => Some("Recursive Part"),
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Build" => Some(Self::Build),
            "Probe" => Some(Self::Probe),
            "Seed Part" => Some(Self::SeedPart),
            "Recursive Part" => Some(Self::RecursivePart),
            _ => None,
        }
    }
}

///
/// PlanNode
///
/// One operator instance: shared fields plus a per-kind payload. Children
/// are exclusively owned and kept in declared order.
///
/// `schema` lists the node's output columns in position order. It is never
/// rendered; it only lets references to those columns be traced back here.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PlanNode {
    pub id: PlanId,
    pub est_rows: f64,
    pub task: TaskType,
    pub op: Operator,
    pub schema: Vec<ColumnRef>,
    pub children: Vec<Self>,
}

impl PlanNode {
    #[must_use]
    pub const fn new(id: PlanId, op: Operator) -> Self {
        Self {
            id,
            est_rows: 0.0,
            task: TaskType::ROOT,
            op,
            schema: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn rows(mut self, est_rows: f64) -> Self {
        self.est_rows = est_rows;
        self
    }

    #[must_use]
    pub const fn cop(mut self) -> Self {
        self.task = TaskType {
            task: TaskKind::Cop,
            store: StoreKind::Row,
        };
        self
    }

    #[must_use]
    pub const fn task(mut self, task: TaskType) -> Self {
        self.task = task;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Vec<ColumnRef>) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.op.name()
    }

    /// Children in declared order with their position labels.
    pub fn labelled_children(&self) -> impl Iterator<Item = (&Self, DriverSide)> {
        self.children
            .iter()
            .enumerate()
            .map(|(index, child)| (child, self.op.child_label(index)))
    }

    /// Generated columns listed in this node's output schema, with their
    /// output position.
    #[must_use]
    pub fn schema_columns(&self) -> Vec<(usize, u64)> {
        self.schema
            .iter()
            .enumerate()
            .filter_map(|(pos, column)| match column {
                ColumnRef::Generated(id) => Some((pos, *id)),
                ColumnRef::Named { .. } => None,
            })
            .collect()
    }

    /// Number of nodes in this subtree.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

///
/// CteDefinition
///
/// Definition subtree of a common table expression. Owned once by the
/// plan's arena and referenced by id from any number of consumers.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CteDefinition {
    pub id: CteId,
    pub est_rows: f64,
    pub seed: PlanNode,
    pub recursive: Option<PlanNode>,
}

impl CteDefinition {
    #[must_use]
    pub const fn new(id: CteId, seed: PlanNode) -> Self {
        Self {
            id,
            est_rows: 0.0,
            seed,
            recursive: None,
        }
    }

    #[must_use]
    pub fn with_recursive(mut self, recursive: PlanNode) -> Self {
        self.recursive = Some(recursive);
        self
    }

    #[must_use]
    pub const fn rows(mut self, est_rows: f64) -> Self {
        self.est_rows = est_rows;
        self
    }

    /// Children in declared order with their position labels.
    pub fn parts(&self) -> impl Iterator<Item = (&PlanNode, DriverSide)> {
        std::iter::once((&self.seed, DriverSide::SeedPart)).chain(
            self.recursive
                .as_ref()
                .map(|recursive| (recursive, DriverSide::RecursivePart)),
        )
    }

    #[must_use]
    pub const fn info(&self) -> &'static str {
        if self.recursive.is_some() {
            "Recursive CTE"
        } else {
            "Non-Recursive CTE"
        }
    }
}

///
/// CteArena
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CteArena {
    definitions: BTreeMap<CteId, CteDefinition>,
}

impl CteArena {
    pub fn insert(&mut self, definition: CteDefinition) {
        self.definitions.insert(definition.id, definition);
    }

    #[must_use]
    pub fn get(&self, id: CteId) -> Option<&CteDefinition> {
        self.definitions.get(&id)
    }

    /// Resolve a reference; an unresolvable id is an upstream contract
    /// violation.
    #[must_use]
    pub fn resolve(&self, id: CteId) -> &CteDefinition {
        self.definitions
            .get(&id)
            .unwrap_or_else(|| panic!("plan references CTE_{id} but the arena has no definition"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

///
/// CteQueue
///
/// First-encounter queue of referenced CTE definitions. Each id is queued
/// once, so every definition is visited exactly once.
///

#[derive(Debug, Default)]
pub(crate) struct CteQueue {
    order: Vec<CteId>,
    next: usize,
}

impl CteQueue {
    pub(crate) fn note(&mut self, op: &Operator) {
        if let Some(id) = op.cte_reference()
            && !self.order.contains(&id)
        {
            self.order.push(id);
        }
    }

    pub(crate) fn pop(&mut self) -> Option<CteId> {
        let id = self.order.get(self.next).copied()?;
        self.next += 1;
        Some(id)
    }
}

///
/// PhysicalPlan
///
/// Plan snapshot handed to the codec: the operator tree, its CTE arena,
/// and the optional runtime statistics side table.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalPlan {
    pub root: PlanNode,
    pub ctes: CteArena,
    pub runtime_stats: Option<RuntimeStatsColl>,
}

impl PhysicalPlan {
    #[must_use]
    pub fn new(root: PlanNode) -> Self {
        Self {
            root,
            ctes: CteArena::default(),
            runtime_stats: None,
        }
    }

    #[must_use]
    pub fn with_cte(mut self, definition: CteDefinition) -> Self {
        self.ctes.insert(definition);
        self
    }

    #[must_use]
    pub fn with_runtime_stats(mut self, stats: RuntimeStatsColl) -> Self {
        self.runtime_stats = Some(stats);
        self
    }

    /// CTE definitions in visitation order: first encounter in the main
    /// tree, then first encounter inside already-queued definitions.
    #[must_use]
    pub fn referenced_ctes(&self) -> Vec<&CteDefinition> {
        let mut queue = CteQueue::default();
        note_ctes(&self.root, &mut queue);

        let mut out = Vec::new();
        while let Some(id) = queue.pop() {
            let definition = self.ctes.resolve(id);
            for (part, _) in definition.parts() {
                note_ctes(part, &mut queue);
            }
            out.push(definition);
        }

        out
    }
}

fn note_ctes(node: &PlanNode, queue: &mut CteQueue) {
    queue.note(&node.op);
    for child in &node.children {
        note_ctes(child, queue);
    }
}

///
/// TESTS
///
