//! ## Crate layout
//! - `core`: plan model, flattening, encoding, decoding, normalization,
//!   digests, the log envelope, errors, and observability.
//! - `config`: TOML configuration that builds configured encoders and decoders.
//!
//! The `prelude` module carries the plan vocabulary and the codec entry
//! points most callers need.

pub use plancodec_config as config;
pub use plancodec_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Errors
//

pub use crate::{config::ConfigError, core::error::CodecError};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::PlanCodecConfig,
        core::{
            decode::{DecodeOptions, PlanDecoder},
            encode::{EncodeOptions, PlanEncoder},
            envelope::{decode_from_log, encode_for_log},
            prelude::*,
        },
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_covers_a_full_round_trip() {
        let alloc = PlanIdAllocator::new();
        let plan = PhysicalPlan::new(PlanNode::new(
            alloc.next_id(),
            Operator::TableDual { rows: 1 },
        ));

        let config = PlanCodecConfig::default();
        let text = config.encoder().encode_tree(Some(&plan));
        let decoded = config.decoder().decode(&text).expect("decodes");
        assert_eq!(decoded.to_string(), text);

        let wrapped = encode_for_log(&text).expect("wrap");
        let logged = decode_from_log(&wrapped).expect("unwrap");
        assert_eq!(logged, text);

        let normalized = normalize_tree(Some(&plan));
        assert_eq!(normalized.text, "0\tTableDual_0\troot\trows:?");
        assert_eq!(
            normalized.digest,
            Some(PlanDigest::of_text("0\tTableDual_0\troot\trows:?"))
        );
    }

    #[test]
    fn version_is_the_workspace_version() {
        assert_eq!(super::VERSION, "0.4.0");
    }
}
