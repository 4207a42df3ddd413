//! Core engine for plancodec: the physical plan model, flattening, display
//! encoding and decoding, normalization with digests, and the log envelope.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod decode;
pub mod encode;
pub mod envelope;
pub mod error;
pub mod flat;
pub mod normalize;
pub mod obs;
pub mod plan;

pub(crate) mod explain;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only plan vocabulary and the codec entry points.
/// Errors, options, and metrics are reached through their modules.
///

pub mod prelude {
    pub use crate::{
        decode::{DecodedPlan, decode},
        encode::{encode_flat, encode_tree},
        flat::{FlatPhysicalPlan, flatten},
        normalize::{NormalizedPlan, PlanDigest, normalize_flat, normalize_tree},
        plan::{
            CteDefinition, CteId, Expr, PhysicalPlan, PlanId, PlanIdAllocator, PlanNode,
            TaskType, operator::Operator,
        },
    };
}
