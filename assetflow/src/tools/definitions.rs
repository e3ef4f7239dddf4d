//! External tool definitions and argument templating.
//!
//! A tool is described by its program, a fixed argument list with
//! placeholders, and named boolean options that contribute extra arguments.
//! Placeholders are substituted inside any argument:
//!
//! - `{input}`: the single input file (the stage must expand to one file)
//! - `{inputs}`: every input file, each as its own argument (whole argument only)
//! - `{output}`: the declared output path
//!
//! All substituted paths are absolute, so the tool's working directory does
//! not affect what it reads or writes.

use super::ToolInvocation;
use crate::core::StageKind;
use crate::errors::{codes, AssetflowError, PipelineValidationError};
use crate::utils::paths::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder for the single input file.
pub const INPUT: &str = "{input}";
/// Placeholder for all input files.
pub const INPUTS: &str = "{inputs}";
/// Placeholder for the output path.
pub const OUTPUT: &str = "{output}";

/// Arguments contributed by one named boolean option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionArgs {
    /// Value used when the stage does not set the option.
    #[serde(default)]
    pub default: bool,
    /// Arguments appended when the option is enabled.
    #[serde(default)]
    pub on: Vec<String>,
    /// Arguments appended when the option is disabled.
    #[serde(default)]
    pub off: Vec<String>,
}

impl OptionArgs {
    /// Creates option arguments with the given default.
    #[must_use]
    pub fn new(default: bool) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Sets the arguments used when enabled.
    #[must_use]
    pub fn with_on<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the arguments used when disabled.
    #[must_use]
    pub fn with_off<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.off = args.into_iter().map(Into::into).collect();
        self
    }
}

/// An external program used by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Program name or path.
    pub program: String,
    /// Argument template.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory relative to the project root. Defaults to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Write the tool's standard output to the declared output file.
    #[serde(default)]
    pub capture_stdout: bool,
    /// Named boolean options.
    #[serde(default)]
    pub options: BTreeMap<String, OptionArgs>,
}

impl ToolSpec {
    /// Creates a tool spec with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            capture_stdout: false,
            options: BTreeMap::new(),
        }
    }

    /// Sets the argument template.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Captures standard output into the declared output file.
    #[must_use]
    pub fn capturing_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Adds a named option.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, args: OptionArgs) -> Self {
        self.options.insert(name.into(), args);
        self
    }

    /// Returns true if any argument mentions the placeholder.
    #[must_use]
    pub fn uses(&self, placeholder: &str) -> bool {
        self.args
            .iter()
            .chain(
                self.options
                    .values()
                    .flat_map(|option| option.on.iter().chain(option.off.iter())),
            )
            .any(|arg| arg.contains(placeholder))
    }

    /// Builds the concrete invocation for one stage execution.
    ///
    /// Option arguments are appended after the template, in option name order.
    pub fn invocation(
        &self,
        stage: &str,
        root: &Path,
        inputs: &[PathBuf],
        output: Option<&Path>,
        flags: &BTreeMap<String, bool>,
    ) -> Result<ToolInvocation, AssetflowError> {
        let mut template: Vec<&str> = self.args.iter().map(String::as_str).collect();
        for (name, option) in &self.options {
            let enabled = flags.get(name).copied().unwrap_or(option.default);
            let extra = if enabled { &option.on } else { &option.off };
            template.extend(extra.iter().map(String::as_str));
        }

        let mut args = Vec::with_capacity(template.len() + inputs.len());
        for arg in template {
            if arg == INPUTS {
                args.extend(inputs.iter().map(|path| path.to_string_lossy().into_owned()));
                continue;
            }
            let mut value = arg.to_string();
            if value.contains(INPUT) {
                let [single] = inputs else {
                    return Err(tool_error(
                        stage,
                        format!(
                            "Stage '{stage}': `{}` takes exactly one input file but {} matched",
                            self.program,
                            inputs.len()
                        ),
                    ));
                };
                value = value.replace(INPUT, &single.to_string_lossy());
            }
            if value.contains(OUTPUT) {
                let Some(output) = output else {
                    return Err(tool_error(
                        stage,
                        format!("Stage '{stage}': `{}` refers to {OUTPUT} but the stage has no output", self.program),
                    ));
                };
                value = value.replace(OUTPUT, &output.to_string_lossy());
            }
            args.push(value);
        }

        let cwd = match &self.cwd {
            Some(dir) => normalize(&root.join(dir)),
            None => root.to_path_buf(),
        };

        Ok(ToolInvocation {
            stage: stage.to_string(),
            program: self.program.clone(),
            args,
            cwd,
            inputs: inputs.to_vec(),
            output: output.map(Path::to_path_buf),
        })
    }
}

fn tool_error(stage: &str, message: String) -> AssetflowError {
    PipelineValidationError::coded(codes::TOOL, message)
        .with_stages(vec![stage.to_string()])
        .into()
}

/// Default tools per stage kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    tools: BTreeMap<StageKind, ToolSpec>,
}

impl Toolchain {
    /// Creates an empty toolchain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the default tool for a kind.
    #[must_use]
    pub fn with_tool(mut self, kind: StageKind, tool: ToolSpec) -> Self {
        self.tools.insert(kind, tool);
        self
    }

    /// Registers the default tool for a kind in place.
    pub fn insert(&mut self, kind: StageKind, tool: ToolSpec) {
        self.tools.insert(kind, tool);
    }

    /// Returns the default tool for a kind.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> Option<&ToolSpec> {
        self.tools.get(&kind)
    }

    /// Picks the stage's own tool, falling back to the kind default.
    #[must_use]
    pub fn resolve<'a>(&'a self, kind: StageKind, own: Option<&'a ToolSpec>) -> Option<&'a ToolSpec> {
        own.or_else(|| self.get(kind))
    }

    /// Iterates over registered kinds and tools.
    pub fn iter(&self) -> impl Iterator<Item = (&StageKind, &ToolSpec)> {
        self.tools.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sass() -> ToolSpec {
        ToolSpec::new("sass")
            .with_args(["{input}", "{output}"])
            .with_option(
                "source_map",
                OptionArgs::new(false).with_on(["--source-map"]).with_off(["--no-source-map"]),
            )
    }

    #[test]
    fn test_invocation_substitutes_single_input() {
        let root = Path::new("/srv/gui");
        let inputs = vec![PathBuf::from("/srv/gui/sass/app.sass")];
        let inv = sass()
            .invocation("sass-app", root, &inputs, Some(Path::new("/srv/gui/build/app.css")), &BTreeMap::new())
            .unwrap();

        assert_eq!(inv.program, "sass");
        assert_eq!(inv.args, vec!["/srv/gui/sass/app.sass", "/srv/gui/build/app.css", "--no-source-map"]);
        assert_eq!(inv.cwd, PathBuf::from("/srv/gui"));
    }

    #[test]
    fn test_stage_flag_overrides_default() {
        let mut flags = BTreeMap::new();
        flags.insert("source_map".to_string(), true);
        let inputs = vec![PathBuf::from("/r/a.sass")];
        let inv = sass()
            .invocation("s", Path::new("/r"), &inputs, Some(Path::new("/r/a.css")), &flags)
            .unwrap();

        assert_eq!(inv.args.last().map(String::as_str), Some("--source-map"));
    }

    #[test]
    fn test_single_input_placeholder_rejects_many() {
        let inputs = vec![PathBuf::from("/r/a.sass"), PathBuf::from("/r/b.sass")];
        let err = sass()
            .invocation("s", Path::new("/r"), &inputs, Some(Path::new("/r/a.css")), &BTreeMap::new())
            .unwrap_err();

        assert!(err.to_string().contains("exactly one input"));
    }

    #[test]
    fn test_inputs_placeholder_expands_each() {
        let tool = ToolSpec::new("uglifyjs").with_args(["{inputs}", "-o", "{output}"]).with_cwd("vendors");
        let inputs = vec![PathBuf::from("/r/a.js"), PathBuf::from("/r/b.js")];
        let inv = tool
            .invocation("u", Path::new("/r"), &inputs, Some(Path::new("/r/out.js")), &BTreeMap::new())
            .unwrap();

        assert_eq!(inv.args, vec!["/r/a.js", "/r/b.js", "-o", "/r/out.js"]);
        assert_eq!(inv.cwd, PathBuf::from("/r/vendors"));
    }

    #[test]
    fn test_output_placeholder_requires_output() {
        let tool = ToolSpec::new("gzip").with_args(["--out={output}"]);
        assert!(tool.uses(OUTPUT));
        assert!(tool
            .invocation("g", Path::new("/r"), &[], None, &BTreeMap::new())
            .is_err());
    }

    #[test]
    fn test_toolchain_resolution() {
        let toolchain = Toolchain::new().with_tool(StageKind::CompileStyle, sass());
        let own = ToolSpec::new("sassc");

        assert_eq!(toolchain.resolve(StageKind::CompileStyle, None).unwrap().program, "sass");
        assert_eq!(toolchain.resolve(StageKind::CompileStyle, Some(&own)).unwrap().program, "sassc");
        assert!(toolchain.resolve(StageKind::CompileScript, None).is_none());
    }

    #[test]
    fn test_tool_spec_from_toml() {
        let tool: ToolSpec = toml::from_str(
            r#"
            program = "coffee"
            args = ["-p", "{input}"]
            capture_stdout = true

            [options.bare]
            default = true
            on = ["--bare"]
            "#,
        )
        .unwrap();

        assert!(tool.capture_stdout);
        assert!(tool.options["bare"].default);
        assert!(tool.options["bare"].off.is_empty());
    }
}
