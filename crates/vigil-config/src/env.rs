use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Failure while substituting `{{ env.VAR }}` placeholders
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExpandError {
    /// Variable is unset and the placeholder has no default
    #[error("environment variable not found: `{0}`")]
    MissingVar(String),
    /// Placeholder is not scoped with `env.`
    #[error("only variables scoped with 'env.' are supported: `{0}`")]
    UnsupportedScope(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // group 1: dotted key, group 2: optional default("...") value
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("valid placeholder regex")
    })
}

/// Expand `{{ env.VAR }}` and `{{ env.VAR | default("x") }}` in raw TOML
///
/// Runs before deserialization so config structs hold plain values. Comment
/// lines are copied through untouched, so commented-out secrets never need
/// to be set.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, ExpandError> {
    let mut out = String::with_capacity(line.len());
    let mut last_end = 0;

    for caps in placeholder().captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&line[last_end..whole.start()]);
        out.push_str(&resolve(&caps)?);
        last_end = whole.end();
    }

    out.push_str(&line[last_end..]);
    Ok(out)
}

fn resolve(caps: &Captures<'_>) -> Result<String, ExpandError> {
    let key = caps.get(1).map_or("", |m| m.as_str());
    let default = caps.get(2).map(|m| m.as_str());

    let var = match key.split_once('.') {
        Some(("env", var)) if !var.contains('.') => var,
        _ => return Err(ExpandError::UnsupportedScope(key.to_owned())),
    };

    match (std::env::var(var), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => Err(ExpandError::MissingVar(var.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "region = \"us-east-1\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn substitutes_set_variable() {
        temp_env::with_var("VIGIL_TEST_REGION", Some("us-west-2"), || {
            let out = expand_env("region = \"{{ env.VIGIL_TEST_REGION }}\"").unwrap();
            assert_eq!(out, "region = \"us-west-2\"");
        });
    }

    #[test]
    fn substitutes_several_variables_on_separate_lines() {
        let vars = [("VIGIL_A", Some("a")), ("VIGIL_B", Some("b"))];
        temp_env::with_vars(vars, || {
            let out = expand_env("a = \"{{ env.VIGIL_A }}\"\nb = \"{{env.VIGIL_B}}\"").unwrap();
            assert_eq!(out, "a = \"a\"\nb = \"b\"");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("VIGIL_MISSING", || {
            let err = expand_env("key = \"{{ env.VIGIL_MISSING }}\"").unwrap_err();
            assert_eq!(err, ExpandError::MissingVar("VIGIL_MISSING".to_owned()));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("VIGIL_OPTIONAL", || {
            let out = expand_env("key = \"{{ env.VIGIL_OPTIONAL | default(\"fallback\") }}\"").unwrap();
            assert_eq!(out, "key = \"fallback\"");
        });
        temp_env::with_var("VIGIL_OPTIONAL", Some("actual"), || {
            let out = expand_env("key = \"{{ env.VIGIL_OPTIONAL | default(\"fallback\") }}\"").unwrap();
            assert_eq!(out, "key = \"actual\"");
        });
    }

    #[test]
    fn other_scopes_are_rejected() {
        let err = expand_env("key = \"{{ secrets.TOKEN }}\"").unwrap_err();
        assert_eq!(err, ExpandError::UnsupportedScope("secrets.TOKEN".to_owned()));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("VIGIL_MISSING", || {
            let input = "  # api_key = \"{{ env.VIGIL_MISSING }}\"\nkey = 1";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
