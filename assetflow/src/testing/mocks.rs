//! Tool runner test double.

use crate::errors::AssetflowError;
use crate::tools::{CapturedOutput, ToolInvocation, ToolRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

/// What the mock does when a program is invoked.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Writes the inputs, concatenated, to the output. With no inputs the
    /// output is created as an empty directory.
    Passthrough,
    /// Exits with the code and writes the message to stderr.
    Fail {
        /// Exit code.
        exit_code: i32,
        /// Standard error text.
        stderr: String,
    },
    /// Prints to stdout and writes nothing.
    Stdout(String),
    /// Populates the output directory with `(relative path, content)` files.
    Tree(Vec<(String, String)>),
}

/// A [`ToolRunner`] that records invocations and fakes tool behaviour.
#[derive(Debug, Default)]
pub struct MockToolRunner {
    behaviors: HashMap<String, MockBehavior>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl MockToolRunner {
    /// Creates a runner where every program passes its inputs through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the behaviour for a program.
    #[must_use]
    pub fn with_behavior(mut self, program: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.insert(program.into(), behavior);
        self
    }

    /// Returns every recorded invocation.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }

    /// Returns the invoked programs in order.
    #[must_use]
    pub fn programs_called(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.program.clone()).collect()
    }

    /// Returns the stages that invoked a tool, in order.
    #[must_use]
    pub fn stages_called(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.stage.clone()).collect()
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CapturedOutput, AssetflowError> {
        self.calls.lock().push(invocation.clone());
        let behavior = self
            .behaviors
            .get(&invocation.program)
            .cloned()
            .unwrap_or(MockBehavior::Passthrough);

        match behavior {
            MockBehavior::Passthrough => {
                if let Some(output) = &invocation.output {
                    if invocation.inputs.is_empty() {
                        create_dir(output)?;
                    } else {
                        let mut joined = Vec::new();
                        for input in &invocation.inputs {
                            joined.extend(std::fs::read(input).map_err(|err| AssetflowError::fs(input, err))?);
                        }
                        if let Some(parent) = output.parent() {
                            create_dir(parent)?;
                        }
                        std::fs::write(output, joined).map_err(|err| AssetflowError::fs(output, err))?;
                    }
                }
                Ok(CapturedOutput::ok(""))
            }
            MockBehavior::Fail { exit_code, stderr } => Ok(CapturedOutput::failed(exit_code, stderr)),
            MockBehavior::Stdout(text) => Ok(CapturedOutput::ok(text)),
            MockBehavior::Tree(files) => {
                if let Some(output) = &invocation.output {
                    for (relative, content) in files {
                        let path = output.join(relative);
                        if let Some(parent) = path.parent() {
                            create_dir(parent)?;
                        }
                        std::fs::write(&path, content).map_err(|err| AssetflowError::fs(&path, err))?;
                    }
                }
                Ok(CapturedOutput::ok(""))
            }
        }
    }
}

fn create_dir(path: &Path) -> Result<(), AssetflowError> {
    std::fs::create_dir_all(path).map_err(|err| AssetflowError::fs(path, err))
}
