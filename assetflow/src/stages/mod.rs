//! Stage transforms.
//!
//! A [`Transform`] turns one stage's resolved inputs into its output. The
//! runner looks transforms up by [`StageKind`] in a [`TransformRegistry`];
//! the default registry covers every kind.

mod compress;
mod concat;
mod copy;
mod external;
mod minify;

pub use compress::{gzip, CompressTransform};
pub use concat::ConcatTransform;
pub use copy::CopyTransform;
pub use external::{run_tool, ExternalTransform};
pub use minify::{minify_css, MinifyStyleTransform};

use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::AssetflowError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// Trait for stage transforms.
#[async_trait]
pub trait Transform: Send + Sync + Debug {
    /// The kind of stage this transform implements.
    fn kind(&self) -> StageKind;

    /// Runs the transform.
    ///
    /// # Returns
    ///
    /// The files (or, for sub-builds, the directory) written, as resolved
    /// paths.
    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError>;
}

/// Maps stage kinds to transforms.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<StageKind, Arc<dyn Transform>>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
            .with(ExternalTransform::new(StageKind::CompileStyle))
            .with(ExternalTransform::new(StageKind::CompileScript))
            .with(ExternalTransform::new(StageKind::MinifyScript))
            .with(ExternalTransform::new(StageKind::SubBuild))
            .with(ConcatTransform)
            .with(MinifyStyleTransform)
            .with(CopyTransform)
            .with(CompressTransform)
    }
}

impl TransformRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Registers a transform, replacing any previous one for its kind.
    #[must_use]
    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.insert(transform.kind(), Arc::new(transform));
        self
    }

    /// Returns the transform for a kind.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> Option<Arc<dyn Transform>> {
        self.transforms.get(&kind).cloned()
    }
}
