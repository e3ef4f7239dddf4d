//! Stylesheet minification.
//!
//! The built-in minifier is a single pass over the source. It removes
//! comments (keeping `/*!` licence comments), collapses whitespace, drops
//! whitespace next to punctuation where CSS does not need it and removes the
//! last `;` of a block. String literals are copied untouched.

use super::{run_tool, Transform};
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::AssetflowError;
use async_trait::async_trait;
use std::path::PathBuf;

/// No whitespace is needed after these.
const TIGHT_AFTER: &[char] = &['{', '}', ';', ',', '>', '~', ':', '('];
/// No whitespace is needed before these.
const TIGHT_BEFORE: &[char] = &['{', '}', ';', ',', '>', '~', ')'];

/// Minifies stylesheets, with an external tool when one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyStyleTransform;

#[async_trait]
impl Transform for MinifyStyleTransform {
    fn kind(&self) -> StageKind {
        StageKind::MinifyStyle
    }

    async fn apply(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, AssetflowError> {
        if ctx.tool.is_some() {
            return run_tool(ctx).await;
        }

        let output = ctx.output_path()?;
        let mut source = String::new();
        for file in ctx.input_files() {
            let bytes = tokio::fs::read(&file)
                .await
                .map_err(|err| AssetflowError::fs(&file, err))?;
            let text = String::from_utf8(bytes).map_err(|err| {
                AssetflowError::fs(&file, std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            })?;
            if !source.is_empty() {
                source.push('\n');
            }
            source.push_str(&text);
        }

        tokio::fs::write(output, minify_css(&source))
            .await
            .map_err(|err| AssetflowError::fs(output, err))?;
        Ok(vec![output.to_path_buf()])
    }
}

/// Minifies a stylesheet.
#[must_use]
pub fn minify_css(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut pending_space = false;
    let mut after_licence = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let end = find_comment_end(&chars, i + 2);
            if chars.get(i + 2) == Some(&'!') {
                out.extend(&chars[i..end]);
                pending_space = false;
                after_licence = true;
            } else {
                pending_space = true;
            }
            i = end;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }

        if pending_space {
            if !after_licence && needs_space(out.chars().last(), c) {
                out.push(' ');
            }
            pending_space = false;
        }
        after_licence = false;

        if c == '"' || c == '\'' {
            let end = find_string_end(&chars, i);
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if c == '}' && out.ends_with(';') {
            out.pop();
        }
        out.push(c);
        i += 1;
    }

    out
}

fn needs_space(prev: Option<char>, next: char) -> bool {
    match prev {
        None => false,
        Some(prev) => !TIGHT_AFTER.contains(&prev) && !TIGHT_BEFORE.contains(&next),
    }
}

/// Index just past the closing `*/`, or the end of input.
fn find_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Index just past the closing quote, honouring backslash escapes.
fn find_string_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}
