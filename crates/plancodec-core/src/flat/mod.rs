//! Module: flat
//! Responsibility: linearize a plan into pre-order entries with explicit structure.
//! Does not own: rendering or normalization of entries.
//! Boundary: entry order is exactly the direct recursive walk's visitation order.


use crate::{
    encode::{child_continuation, tree_indent},
    plan::{
        CteDefinition, DriverSide, PhysicalPlan, PlanNode, RuntimeStats, TaskType,
        stats::RuntimeStatsColl,
    },
};
use derive_more::{Deref, IntoIterator};

///
/// FlatOrigin
///
/// What a flat entry stands for: an operator node, or the header of a CTE
/// definition tree.
///

#[derive(Clone, Copy, Debug)]
pub enum FlatOrigin<'a> {
    Node(&'a PlanNode),
    Cte(&'a CteDefinition),
}

impl FlatOrigin<'_> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Node(node) => node.name(),
            Self::Cte(_) => "CTE",
        }
    }

    /// Raw (volatile) identity rendered after the name.
    #[must_use]
    pub const fn raw_id(&self) -> u64 {
        match self {
            Self::Node(node) => node.id.0,
            Self::Cte(cte) => cte.id.0,
        }
    }

    #[must_use]
    pub const fn est_rows(&self) -> f64 {
        match self {
            Self::Node(node) => node.est_rows,
            Self::Cte(cte) => cte.est_rows,
        }
    }

    #[must_use]
    pub const fn task(&self) -> TaskType {
        match self {
            Self::Node(node) => node.task,
            Self::Cte(_) => TaskType::ROOT,
        }
    }
}

///
/// FlatPlanEntry
///
/// One linearized tree position. Everything needed to render or normalize
/// the entry is recorded locally.
///

#[derive(Clone, Debug)]
pub struct FlatPlanEntry<'a> {
    pub origin: FlatOrigin<'a>,
    pub depth: usize,
    pub parent_index: Option<usize>,
    pub child_indices: Vec<usize>,

    /// One past the last entry of this subtree.
    pub children_end: usize,
    pub position: DriverSide,
    pub is_last_child: bool,

    /// Box-drawing prefix preceding the ident on an encoded line.
    pub tree_indent: String,
    pub include_stats: bool,
    pub stats: Option<&'a RuntimeStats>,
}

///
/// FlatPlanTree
///

#[derive(Clone, Debug, Default, Deref, IntoIterator)]
#[into_iterator(owned, ref)]
pub struct FlatPlanTree<'a>(Vec<FlatPlanEntry<'a>>);

///
/// FlatPhysicalPlan
///
/// Main operator tree followed by one tree per referenced CTE definition,
/// in first-encounter order.
///

#[derive(Clone, Debug, Default)]
pub struct FlatPhysicalPlan<'a> {
    pub main: FlatPlanTree<'a>,
    pub ctes: Vec<FlatPlanTree<'a>>,
}

impl<'a> FlatPhysicalPlan<'a> {
    /// All entries in visitation order: main tree, then each CTE tree.
    pub fn entries(&self) -> impl Iterator<Item = &FlatPlanEntry<'a>> {
        self.main.iter().chain(self.ctes.iter().flat_map(|tree| tree.iter()))
    }

    /// Trees in visitation order.
    pub fn trees(&self) -> impl Iterator<Item = &FlatPlanTree<'a>> {
        std::iter::once(&self.main).chain(self.ctes.iter())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.main.len() + self.ctes.iter().map(|tree| tree.len()).sum::<usize>()
    }
}

/// Flatten `plan` into pre-order entries. An unavailable plan flattens to
/// an empty flat plan.
#[must_use]
pub fn flatten(plan: Option<&PhysicalPlan>, include_stats: bool) -> FlatPhysicalPlan<'_> {
    let Some(plan) = plan else {
        return FlatPhysicalPlan::default();
    };

    let flattener = Flattener {
        stats: plan.runtime_stats.as_ref().filter(|_| include_stats),
        include_stats,
    };

    let mut main = Vec::with_capacity(plan.root.subtree_len());
    flattener.push_node(&mut main, &plan.root, Slot::ROOT);

    let ctes = plan
        .referenced_ctes()
        .into_iter()
        .map(|cte| {
            let mut entries = Vec::new();
            flattener.push_cte(&mut entries, cte);
            FlatPlanTree(entries)
        })
        .collect();

    FlatPhysicalPlan {
        main: FlatPlanTree(main),
        ctes,
    }
}

// Placement of one entry relative to its parent.
struct Slot<'p> {
    depth: usize,
    parent_index: Option<usize>,
    position: DriverSide,
    is_last_child: bool,
    continuation: &'p str,
}

impl Slot<'_> {
    const ROOT: Self = Self {
        depth: 0,
        parent_index: None,
        position: DriverSide::None,
        is_last_child: true,
        continuation: "",
    };

    fn tree_indent(&self) -> String {
        tree_indent(self.depth, self.is_last_child, self.continuation)
    }

    fn child_continuation(&self) -> String {
        child_continuation(self.depth, self.is_last_child, self.continuation)
    }
}

struct Flattener<'a> {
    stats: Option<&'a RuntimeStatsColl>,
    include_stats: bool,
}

impl<'a> Flattener<'a> {
    fn push_entry(
        &self,
        entries: &mut Vec<FlatPlanEntry<'a>>,
        origin: FlatOrigin<'a>,
        stats: Option<&'a RuntimeStats>,
        slot: &Slot<'_>,
    ) -> usize {
        let index = entries.len();
        entries.push(FlatPlanEntry {
            origin,
            depth: slot.depth,
            parent_index: slot.parent_index,
            child_indices: Vec::new(),
            children_end: index + 1,
            position: slot.position,
            is_last_child: slot.is_last_child,
            tree_indent: slot.tree_indent(),
            include_stats: self.include_stats,
            stats,
        });
        if let Some(parent) = slot.parent_index {
            entries[parent].child_indices.push(index);
        }

        index
    }

    fn push_node(&self, entries: &mut Vec<FlatPlanEntry<'a>>, node: &'a PlanNode, slot: Slot<'_>) {
        let stats = self.stats.and_then(|stats| stats.plan(node.id));
        let index = self.push_entry(entries, FlatOrigin::Node(node), stats, &slot);
        self.push_children(entries, index, node.labelled_children(), node.children.len(), &slot);
    }

    fn push_cte(&self, entries: &mut Vec<FlatPlanEntry<'a>>, cte: &'a CteDefinition) {
        let slot = Slot::ROOT;
        let stats = self.stats.and_then(|stats| stats.cte(cte.id));
        let index = self.push_entry(entries, FlatOrigin::Cte(cte), stats, &slot);
        let count = cte.parts().count();
        self.push_children(entries, index, cte.parts(), count, &slot);
    }

    fn push_children(
        &self,
        entries: &mut Vec<FlatPlanEntry<'a>>,
        index: usize,
        children: impl Iterator<Item = (&'a PlanNode, DriverSide)>,
        count: usize,
        slot: &Slot<'_>,
    ) {
        let continuation = slot.child_continuation();
        for (i, (child, position)) in children.enumerate() {
            let child_slot = Slot {
                depth: slot.depth + 1,
                parent_index: Some(index),
                position,
                is_last_child: i + 1 == count,
                continuation: &continuation,
            };
            self.push_node(entries, child, child_slot);
        }
        entries[index].children_end = entries.len();
    }
}
