//! Input composition (spec.md §4.11, component C11): combines the
//! positional query, piped stdin, a file attachment, and resolved terminal
//! output into the single question string `AskQuestion` submits.
//!
//! Grounded on `original_source/command_line_assistant/commands/chat.py`'s
//! `_get_input_source`, extended with the `terminal_output` source spec.md
//! §4.11 adds on top of the original's three.

use crate::error::ClientError;

#[derive(Debug, Default, Clone)]
pub struct Inputs {
    pub query: Option<String>,
    pub stdin: Option<String>,
    pub attachment: Option<String>,
    pub terminal_output: Option<String>,
}

fn present(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Composes the question string per the 8-rule precedence table. Rule
/// numbers in comments match spec.md §4.11 exactly.
///
/// A `warn` callback is invoked with a user-facing warning whenever a rule
/// drops one of the provided sources, so the caller can route it through
/// whatever renderer it uses (here, a plain stderr line).
pub fn compose(inputs: &Inputs, mut warn: impl FnMut(&str)) -> Result<String, ClientError> {
    let (q, s, a, t) = (
        present(&inputs.query),
        present(&inputs.stdin),
        present(&inputs.attachment),
        present(&inputs.terminal_output),
    );

    // Rule 1: query, stdin, and attachment all present (terminal_output may
    // or may not also be present — its presence changes nothing here, per
    // the pinned Open Question in DESIGN.md: rule 1 drops terminal_output
    // silently, the same way it always dropped stdin's *sibling* sources in
    // the original three-source version of this rule). Warn that stdin is
    // ignored; this subsumes the original's "all three sources" case.
    if q && s && a {
        warn("Using positional query and file input. Stdin will be ignored.");
        return Ok(format!(
            "{} {}",
            inputs.query.as_deref().unwrap(),
            inputs.attachment.as_deref().unwrap()
        ));
    }

    // Rule 2: query & attachment & terminal_output (stdin absent, or rule 1
    // would already have matched).
    if q && a && t {
        return Ok(format!(
            "{} {} {}",
            inputs.query.as_deref().unwrap(),
            inputs.attachment.as_deref().unwrap(),
            inputs.terminal_output.as_deref().unwrap()
        ));
    }

    // Rule 3: query & terminal_output (attachment absent, or rule 2 would
    // already have matched; stdin, if present, is dropped silently here).
    if q && t {
        return Ok(format!(
            "{} {}",
            inputs.query.as_deref().unwrap(),
            inputs.terminal_output.as_deref().unwrap()
        ));
    }

    // Rule 4: query & attachment.
    if q && a {
        return Ok(format!(
            "{} {}",
            inputs.query.as_deref().unwrap(),
            inputs.attachment.as_deref().unwrap()
        ));
    }

    // Rule 5: stdin & attachment.
    if s && a {
        return Ok(format!(
            "{} {}",
            inputs.stdin.as_deref().unwrap(),
            inputs.attachment.as_deref().unwrap()
        ));
    }

    // Rule 6: stdin & query.
    if s && q {
        return Ok(format!(
            "{} {}",
            inputs.query.as_deref().unwrap(),
            inputs.stdin.as_deref().unwrap()
        ));
    }

    // Rule 7: otherwise, the first non-empty source in precedence order.
    for candidate in [&inputs.query, &inputs.stdin, &inputs.attachment, &inputs.terminal_output] {
        if present(candidate) {
            return Ok(candidate.as_deref().unwrap().to_string());
        }
    }

    // Rule 8: nothing provided at all.
    Err(ClientError::InvalidInput(
        "No input provided. Please provide input via file, stdin, or direct query.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(query: Option<&str>, stdin: Option<&str>, attachment: Option<&str>, term: Option<&str>) -> Inputs {
        Inputs {
            query: query.map(str::to_string),
            stdin: stdin.map(str::to_string),
            attachment: attachment.map(str::to_string),
            terminal_output: term.map(str::to_string),
        }
    }

    #[test]
    fn query_only() {
        let out = compose(&inputs(Some("test query"), None, None, None), |_| {}).unwrap();
        assert_eq!(out, "test query");
    }

    #[test]
    fn stdin_only() {
        let out = compose(&inputs(None, Some("stdin"), None, None), |_| {}).unwrap();
        assert_eq!(out, "stdin");
    }

    #[test]
    fn query_and_stdin() {
        let out = compose(&inputs(Some("query"), Some("stdin"), None, None), |_| {}).unwrap();
        assert_eq!(out, "query stdin");
    }

    #[test]
    fn attachment_only() {
        let out = compose(&inputs(None, None, Some("file query"), None), |_| {}).unwrap();
        assert_eq!(out, "file query");
    }

    #[test]
    fn query_and_attachment() {
        let out = compose(&inputs(Some("query"), None, Some("file"), None), |_| {}).unwrap();
        assert_eq!(out, "query file");
    }

    #[test]
    fn stdin_and_attachment() {
        let out = compose(&inputs(None, Some("stdin"), Some("file"), None), |_| {}).unwrap();
        assert_eq!(out, "stdin file");
    }

    #[test]
    fn all_four_drops_stdin_and_terminal_output_with_warning() {
        let mut warned = false;
        let out = compose(&inputs(Some("query"), Some("stdin"), Some("file"), Some("term")), |_| {
            warned = true;
        })
        .unwrap();
        assert_eq!(out, "query file");
        assert!(warned);
    }

    #[test]
    fn query_and_terminal_output() {
        let out = compose(&inputs(Some("query"), None, None, Some("last out")), |_| {}).unwrap();
        assert_eq!(out, "query last out");
    }

    #[test]
    fn no_input_is_an_error() {
        let err = compose(&inputs(None, None, None, None), |_| {}).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }
}
