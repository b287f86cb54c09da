//! Reads a recorded terminal log back into `TerminalBlock`s.
//!
//! Grounded on `original_source/terminal/parser.py`'s `parse_terminal_output`/
//! `find_output_by_index`: split on the boundary between adjacent JSON
//! objects, re-attach the braces the split consumed, parse greedily until the
//! first malformed block, and drop a trailing `output == "exit"` block. The
//! split boundary here is `"}\n{"` rather than the original's `"\n}\n{"`,
//! because `recorder::write_block` emits one compact JSON object per line
//! instead of the original's indented multi-line form — the boundary differs
//! to match our own writer, the algorithm doesn't.

use std::path::Path;

use crate::blocks::TerminalBlock;
use crate::error::TerminalError;

/// Parses a recorded terminal log, stopping at the first block that fails to
/// parse as JSON (matching the original's "return what we have so far"
/// behavior) and silently dropping a trailing `exit` block.
pub fn parse_log(path: &Path) -> Result<Vec<TerminalBlock>, TerminalError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(path)?;
    Ok(parse_contents(&contents))
}

fn parse_contents(contents: &str) -> Vec<TerminalBlock> {
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    for chunk in trimmed.split("}\n{") {
        let mut block = chunk.to_string();
        if !block.starts_with('{') {
            block.insert(0, '{');
        }
        if !block.ends_with('}') {
            block.push('}');
        }

        match serde_json::from_str::<TerminalBlock>(&block) {
            Ok(mut parsed) => {
                parsed.command = crate::blocks::strip_ansi(&parsed.command);
                parsed.output = crate::blocks::strip_ansi(&parsed.output);
                if parsed.output == "exit" {
                    continue;
                }
                result.push(parsed);
            }
            Err(_) => break,
        }
    }

    result
}

/// Looks up a block's output by index, supporting negative indices counted
/// from the end (Python-slice style), matching
/// `find_output_by_index`'s `output[index]["output"]` lookup.
pub fn find_output_by_index(index: i64, blocks: &[TerminalBlock]) -> Option<&str> {
    let len = blocks.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        return None;
    }
    blocks.get(resolved as usize).map(|b| b.output.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> String {
        let b1 = r#"{"command":"ls","output":"a b c"}"#;
        let b2 = r#"{"command":"pwd","output":"/home/user"}"#;
        let b3 = r#"{"command":"exit","output":"exit"}"#;
        format!("{b1}\n{b2}\n{b3}\n")
    }

    #[test]
    fn parses_blocks_and_drops_trailing_exit() {
        let blocks = parse_contents(&sample_log());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].command, "ls");
        assert_eq!(blocks[1].output, "/home/user");
    }

    #[test]
    fn stops_at_first_malformed_block() {
        let contents = format!(
            "{}\n{}",
            r#"{"command":"ls","output":"a"}"#,
            r#"{"command":"broken""#
        );
        let blocks = parse_contents(&contents);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn find_output_by_index_supports_negative_indices() {
        let blocks = parse_contents(&sample_log());
        assert_eq!(find_output_by_index(0, &blocks), Some("a b c"));
        assert_eq!(find_output_by_index(-1, &blocks), Some("/home/user"));
        assert_eq!(find_output_by_index(-2, &blocks), Some("a b c"));
        assert_eq!(find_output_by_index(5, &blocks), None);
        assert_eq!(find_output_by_index(-5, &blocks), None);
    }

    #[test]
    fn empty_log_yields_no_blocks() {
        assert!(parse_contents("").is_empty());
    }
}
