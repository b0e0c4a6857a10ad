use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-fatal problems found during a render pass.
///
/// None of these abort rendering; each one is recovered where it happens and
/// the affected region renders empty or inert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderWarning {
    #[error("missing block {block_id}")]
    MissingNode { block_id: String },

    #[error("block {block_id} is its own ancestor (cyclic content)")]
    CyclicReference { block_id: String },

    #[error("block {block_id} is nested deeper than {max_depth} levels")]
    DepthLimit { block_id: String, max_depth: usize },

    #[error(
        "Error using empty component: {capability}\nYou should override this in the renderer components"
    )]
    UnregisteredCapability { capability: &'static str },

    #[error("unsupported block type `{block_type}` (block {block_id})")]
    UnsupportedBlockType {
        block_id: String,
        block_type: String,
    },

    #[error("no asset url for {block_type} block {block_id}")]
    MissingAsset {
        block_id: String,
        block_type: String,
    },
}

impl RenderWarning {
    /// The block the warning is about, when there is one.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            RenderWarning::MissingNode { block_id }
            | RenderWarning::CyclicReference { block_id }
            | RenderWarning::DepthLimit { block_id, .. }
            | RenderWarning::UnsupportedBlockType { block_id, .. }
            | RenderWarning::MissingAsset { block_id, .. } => Some(block_id),
            RenderWarning::UnregisteredCapability { .. } => None,
        }
    }
}

/// Whether diagnostics are reported. Production builds stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl Default for BuildMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }
}

/// Per-pass warning sink. Logs through `tracing` and keeps a copy for the
/// caller, unless the pass runs in production mode.
#[derive(Debug)]
pub struct Diagnostics {
    mode: BuildMode,
    warnings: Vec<RenderWarning>,
}

impl Diagnostics {
    pub fn new(mode: BuildMode) -> Self {
        Diagnostics {
            mode,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: RenderWarning) {
        if self.mode == BuildMode::Production {
            return;
        }
        tracing::warn!(block_id = warning.block_id(), "{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<RenderWarning> {
        self.warnings
    }
}
