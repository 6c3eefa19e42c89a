//! Loading inline expressions and local rule files into a matcher.

use super::traits::RuleSink;
use crate::error::{FileError, LoadError};
use std::path::Path;
use tokio::fs;

/// Loads `exps` first, then `files`, in the given order.
pub async fn load_exps_and_files<S: RuleSink + ?Sized>(
    exps: &[String],
    files: &[String],
    sink: &mut S,
) -> Result<(), LoadError> {
    load_exps(exps, sink)?;
    load_files(files, sink).await
}

pub fn load_exps<S: RuleSink + ?Sized>(exps: &[String], sink: &mut S) -> Result<(), LoadError> {
    for (index, expr) in exps.iter().enumerate() {
        sink.add_rule(expr)
            .map_err(|source| LoadError::Expression {
                index,
                expr: expr.clone(),
                source,
            })?;
    }
    Ok(())
}

pub async fn load_files<S: RuleSink + ?Sized>(
    files: &[String],
    sink: &mut S,
) -> Result<(), LoadError> {
    for (index, path) in files.iter().enumerate() {
        if path.is_empty() {
            continue;
        }
        load_file(Path::new(path), sink)
            .await
            .map_err(|source| LoadError::File {
                index,
                path: path.clone(),
                source,
            })?;
    }
    Ok(())
}

pub async fn load_file<S: RuleSink + ?Sized>(path: &Path, sink: &mut S) -> Result<(), FileError> {
    let text = fs::read_to_string(path).await?;
    load_text(&text, sink)
}

/// Feeds every rule line of `text` to `sink`. Everything after `#` is a
/// comment; blank lines are skipped.
pub fn load_text<S: RuleSink + ?Sized>(text: &str, sink: &mut S) -> Result<(), FileError> {
    for (idx, line) in text.lines().enumerate() {
        let Some(rule) = parse_line(line) else {
            continue;
        };
        sink.add_rule(rule).map_err(|source| FileError::Line {
            line: idx + 1,
            source,
        })?;
    }
    Ok(())
}

fn parse_line(line: &str) -> Option<&str> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(line)
}
