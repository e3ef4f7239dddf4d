//! Temporary project trees and a harness for running single transforms.

use crate::context::{RunContext, RunIdentity, StageContext};
use crate::core::BuildMode;
use crate::errors::AssetflowError;
use crate::events::NoOpEventSink;
use crate::pipeline::{prepare_output, resolve_inputs, ProjectLayout, StageSpec};
use crate::stages::Transform;
use crate::tools::{ToolRunner, ToolSpec};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway project: `<tmp>/gui` is the root, `<tmp>/webapp` the output.
#[derive(Debug)]
pub struct ProjectFixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectFixture {
    /// Creates an empty project.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().join("gui");
        fs::create_dir_all(&root).expect("create project root");
        Self { _dir: dir, root }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The layout used by transform tests: scratch `build`, output `../webapp`.
    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.root, "build", "../webapp")
    }

    /// Resolves a root-relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        crate::utils::normalize(&self.root.join(relative))
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write fixture file");
    }

    /// Removes a file.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).expect("remove fixture file");
    }

    /// Reads a file as text.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture file")
    }

    /// Reads a file as bytes.
    pub fn read_bytes(&self, relative: &str) -> Vec<u8> {
        fs::read(self.path(relative)).expect("read fixture file")
    }

    /// Returns true if the path exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Every file under a directory, keyed by `/`-separated relative path.
    pub fn snapshot(&self, relative: &str) -> BTreeMap<String, Vec<u8>> {
        let base = self.path(relative);
        let mut files = BTreeMap::new();
        collect(&base, &base, &mut files);
        files
    }

    /// Writes the sources the bundled exmatrikulator pipeline reads.
    pub fn exmatrikulator_sources(&self) {
        self.write(
            "vendors/roboto-fontface/css/roboto-fontface.scss",
            "@font-face { font-family: 'Roboto'; src: url('../fonts/Roboto-Regular.woff'); }\n",
        );
        self.write("vendors/roboto-fontface/fonts/Roboto-Regular.woff", "roboto-regular");
        self.write("vendors/roboto-fontface/fonts/Roboto-Bold.woff", "roboto-bold");
        self.write("vendors/font-awesome/scss/font-awesome.scss", ".fa { display: inline-block; }\n");
        self.write("vendors/font-awesome/fonts/fontawesome-webfont.woff", "fa-woff");
        self.write("vendors/font-awesome/fonts/FontAwesome.otf", "fa-otf");
        self.write("vendors/jquery/dist/jquery.min.js", "/*! jQuery */ window.jQuery = {};\n");
        self.write("vendors/bootstrap/Gruntfile.js", "module.exports = function () {};\n");
        self.write(
            "sass/exmatrikulator.sass",
            "@import 'vendors/roboto-fontface/css/roboto-fontface'\n@import 'vendors/font-awesome/scss/font-awesome'\nbody\n  margin: 0\n",
        );
        self.write("coffee/exmatrikulator.coffee", "square = (x) -> x * x\n");
        self.write("img/logo.png", "png");
        self.write("video/intro.mp4", "mp4");
    }
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("read dir entry").path();
        if path.is_dir() {
            collect(base, &path, files);
        } else {
            let relative = crate::utils::to_slash(path.strip_prefix(base).expect("under base"));
            files.insert(relative, fs::read(&path).expect("read snapshot file"));
        }
    }
}

/// Runs one transform against the fixture the way the runner would.
pub async fn apply_transform(
    fixture: &ProjectFixture,
    transform: &dyn Transform,
    stage: StageSpec,
    tool: Option<ToolSpec>,
    tools: &dyn ToolRunner,
) -> Result<Vec<PathBuf>, AssetflowError> {
    let layout = fixture.layout();
    let stage = stage.normalized();
    let run = RunContext::new(RunIdentity::new(), "test", BuildMode::Build, Arc::new(NoOpEventSink));
    let inputs = resolve_inputs(&layout, &stage)?;
    let output = prepare_output(&layout, &stage).await?;

    let ctx = StageContext {
        run: &run,
        layout: &layout,
        stage: &stage,
        tool: tool.as_ref(),
        tools,
        inputs,
        output,
    };
    transform.apply(&ctx).await
}
