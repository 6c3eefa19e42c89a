//! Line protocol of the CLI: `<tag> <key>` in, `<tag> <key> match|no-match` out.

use crate::plugin::Registry;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Parses one `<tag> <key>` query line into its parts.
pub fn parse_query(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let tag = parts.next()?;
    let key = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((tag, key))
}

/// Answers one query line. Lookup failures become `error: ...` lines.
pub fn answer(registry: &Registry, line: &str) -> String {
    match parse_query(line) {
        Some((tag, key)) => match registry.check(tag, key) {
            Ok(true) => format!("{tag} {key} match\n"),
            Ok(false) => format!("{tag} {key} no-match\n"),
            Err(e) => format!("error: {e:#}\n"),
        },
        None => "error: expected `<tag> <key>`\n".to_string(),
    }
}

/// Answers queries from `input` until EOF. I/O errors end the loop and are
/// returned to the caller, which still owns shutdown.
pub async fn serve_queries<R, W>(registry: &Registry, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        output.write_all(answer(registry, &line).as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}
