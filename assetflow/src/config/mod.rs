//! Pipeline definitions stored as TOML.
//!
//! A file deserializes into a [`PipelineConfig`], which is turned into a
//! [`PipelineBuilder`] and validated like any hand-built pipeline.
//!
//! ```toml
//! name = "exmatrikulator"
//! scratch_dir = "build"
//! output_dir = "../webapp"
//! clean = ["css", "js"]
//!
//! [toolchain.compile-style]
//! program = "sass"
//! args = ["{input}", "{output}"]
//!
//! [[stages]]
//! name = "sass-app"
//! kind = "compile-style"
//! inputs = ["sass/exmatrikulator.sass"]
//! output = "build/exmatrikulator.css"
//! ```

use crate::core::StageKind;
use crate::errors::AssetflowError;
use crate::pipeline::{
    Pipeline, PipelineBuilder, StageOptions, StageSpec, DEFAULT_OUTPUT_DIR, DEFAULT_SCRATCH_DIR,
};
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// File looked up in the project root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "assetflow.toml";

/// A pipeline as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name.
    pub name: String,
    /// Scratch directory relative to the project root.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
    /// Output directory relative to the project root.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Output subdirectories removed before a run. Empty cleans everything.
    #[serde(default)]
    pub clean: Vec<String>,
    /// Remove the scratch directory once no stage needs it.
    #[serde(default = "default_finalize")]
    pub finalize: bool,
    /// Default tool per stage kind, keyed by kind name.
    #[serde(default)]
    pub toolchain: BTreeMap<String, ToolSpec>,
    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

fn default_scratch_dir() -> String {
    DEFAULT_SCRATCH_DIR.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_finalize() -> bool {
    true
}

/// One `[[stages]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Input patterns.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Skip the stage in dev mode.
    #[serde(default)]
    pub build_only: bool,
    /// Inline tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolSpec>,
    /// Named boolean options passed to the tool.
    #[serde(default)]
    pub options: BTreeMap<String, bool>,
    /// Copy: flatten matched files into the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
    /// Concat: separator between inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Compress: extensions to compress.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Compress: suffix of compressed siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl From<StageConfig> for StageSpec {
    fn from(config: StageConfig) -> Self {
        let mut options = StageOptions {
            flags: config.options,
            separator: config.separator,
            extensions: config.extensions,
            suffix: config.suffix,
            ..StageOptions::default()
        };
        if let Some(flatten) = config.flatten {
            options.flatten = flatten;
        }
        Self {
            name: config.name,
            kind: config.kind,
            inputs: config.inputs,
            output: config.output,
            build_only: config.build_only,
            tool: config.tool,
            options,
        }
    }
}

impl PipelineConfig {
    /// Parses a config from TOML text.
    ///
    /// `origin` names the source in error messages.
    pub fn from_toml_str(text: &str, origin: impl AsRef<Path>) -> Result<Self, AssetflowError> {
        toml::from_str(text).map_err(|err| AssetflowError::config(origin, err.to_string()))
    }

    /// Reads and parses a config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AssetflowError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| AssetflowError::config(path, err.to_string()))?;
        let config = Self::from_toml_str(&text, path)?;
        debug!(path = %path.display(), stages = config.stages.len(), "Loaded pipeline config");
        Ok(config)
    }

    /// Converts the config into an unvalidated builder.
    ///
    /// # Errors
    ///
    /// Returns a config error if a toolchain key is not a stage kind.
    pub fn into_builder(self, origin: impl AsRef<Path>) -> Result<PipelineBuilder, AssetflowError> {
        let mut builder = PipelineBuilder::new(self.name)
            .scratch_dir(self.scratch_dir)
            .output_dir(self.output_dir)
            .clean(self.clean)
            .finalize(self.finalize);

        for (key, tool) in self.toolchain {
            let kind = StageKind::from_str(&key)
                .map_err(|err| AssetflowError::config(origin.as_ref(), format!("toolchain: {err}")))?;
            builder = builder.tool(kind, tool);
        }
        for stage in self.stages {
            builder.add_stage(stage.into());
        }
        Ok(builder)
    }

    /// Converts and validates the config.
    pub fn into_pipeline(self, origin: impl AsRef<Path>) -> Result<Pipeline, AssetflowError> {
        Ok(self.into_builder(origin)?.build()?)
    }
}

/// Loads and validates the pipeline defined in `path`.
pub async fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline, AssetflowError> {
    let path = path.as_ref();
    PipelineConfig::load(path).await?.into_pipeline(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::errors::codes;
    use pretty_assertions::assert_eq;

    const BUNDLED: &str = include_str!("../../pipelines/exmatrikulator.toml");

    #[test]
    fn test_minimal_config_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            name = "site"

            [[stages]]
            name = "fonts"
            kind = "copy"
            inputs = ["fonts/*"]
            output = "dist/fonts"
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.scratch_dir, "build");
        assert_eq!(config.output_dir, "dist");
        assert!(config.finalize);
        assert!(config.clean.is_empty());

        let spec: StageSpec = config.stages[0].clone().into();
        assert!(spec.options.flatten);
        assert_eq!(spec.kind, StageKind::Copy);
    }

    #[test]
    fn test_stage_level_options_are_mapped() {
        let config = PipelineConfig::from_toml_str(
            r#"
            name = "site"

            [[stages]]
            name = "media"
            kind = "copy"
            inputs = ["img/**/*"]
            output = "dist/img"
            flatten = false

            [[stages]]
            name = "gzip"
            kind = "compress"
            inputs = ["dist/**/*"]
            build_only = true
            extensions = [".CSS"]
            suffix = ".gzip"
            "#,
            "inline",
        )
        .unwrap();

        let media: StageSpec = config.stages[0].clone().into();
        let gzip: StageSpec = config.stages[1].clone().into();
        assert!(!media.options.flatten);
        assert!(gzip.build_only);
        assert_eq!(gzip.options.extensions(), vec!["css"]);
        assert_eq!(gzip.options.suffix(), ".gzip");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
            name = "site"

            [[stages]]
            name = "a"
            kind = "copy"
            inputs = ["x/*"]
            output = "dist"
            flaten = false
            "#,
            "assetflow.toml",
        )
        .unwrap_err();

        assert_eq!(err.category(), "config");
        assert!(err.to_string().contains("assetflow.toml"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let text = r#"
            name = "site"

            [[stages]]
            name = "a"
            kind = "transpile"
            inputs = ["x/*"]
            output = "dist/a.js"
        "#;
        assert!(PipelineConfig::from_toml_str(text, "inline").is_err());
    }

    #[test]
    fn test_unknown_toolchain_key() {
        let config = PipelineConfig::from_toml_str(
            r#"
            name = "site"

            [toolchain.compile-css]
            program = "sass"

            [[stages]]
            name = "a"
            kind = "copy"
            inputs = ["x/*"]
            output = "dist/x"
            "#,
            "inline",
        )
        .unwrap();

        let err = config.into_builder("inline").unwrap_err();
        assert!(err.to_string().contains("compile-css"));
    }

    #[test]
    fn test_validation_errors_pass_through() {
        let config = PipelineConfig::from_toml_str(
            r#"
            name = "site"
            scratch_dir = "dist/tmp"
            output_dir = "dist"

            [[stages]]
            name = "a"
            kind = "copy"
            inputs = ["x/*"]
            output = "dist/x"
            "#,
            "inline",
        )
        .unwrap();

        match config.into_pipeline("inline").unwrap_err() {
            AssetflowError::Validation(err) => assert_eq!(err.code(), Some(codes::LAYOUT)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bundled_pipeline_is_valid() {
        let pipeline = PipelineConfig::from_toml_str(BUNDLED, "exmatrikulator.toml")
            .unwrap()
            .into_pipeline("exmatrikulator.toml")
            .unwrap();

        assert_eq!(pipeline.name(), "exmatrikulator");
        assert_eq!(pipeline.stage_count(), 14);
        assert_eq!(pipeline.clean_targets(), ["fonts", "css", "js", "img", "video"]);

        let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"bootstrap"));
        assert_eq!(names.last(), Some(&"gzip"));

        let index = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert_eq!(
            pipeline.dependency_names(index("concat-vendor-css")),
            vec!["bootstrap", "sass-roboto", "sass-font-awesome"]
        );
        assert_eq!(pipeline.dependency_names(index("cssmin-app")), vec!["sass-app"]);
        assert_eq!(
            pipeline.dependency_names(index("gzip")),
            vec!["concat-vendor-js", "cssmin-vendors", "cssmin-app", "uglify"]
        );
        assert_eq!(pipeline.scratch_release_index(BuildMode::Build), Some(index("uglify")));
        assert_eq!(pipeline.stages_for(BuildMode::Dev).len(), 13);
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let err = load_pipeline(&path).await.unwrap_err();
        assert_eq!(err.category(), "config");

        tokio::fs::write(&path, BUNDLED).await.unwrap();
        assert_eq!(load_pipeline(&path).await.unwrap().stage_count(), 14);
    }
}
