use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Failure while expanding `{{ env.VAR }}` placeholders
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("environment variable not found: `{0}`")]
    MissingVar(String),
    #[error("only variables scoped with 'env.' are supported: `{0}`")]
    UnsupportedScope(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Group 1: scoped key, group 2: optional default("...") argument
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// `{{ env.VAR | default("x") }}` falls back to `x` when `VAR` is unset.
/// Comment lines are copied through untouched so commented-out secrets
/// never have to exist in the environment.
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
    let mut result = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else { continue };

        result.push_str(&line[cursor..whole.start()]);
        result.push_str(&resolve(&captures)?);
        cursor = whole.end();
    }

    result.push_str(&line[cursor..]);
    Ok(result)
}

fn resolve(captures: &Captures<'_>) -> Result<String, ExpandError> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(ExpandError::UnsupportedScope(key.to_owned()));
    };

    match (std::env::var(var_name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => Err(ExpandError::MissingVar(var_name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[storage]\ntype = \"memory\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_redis_url() {
        temp_env::with_var("CANOPY_REDIS_URL", Some("redis://cache:6379"), || {
            let result = expand_env("url = \"{{ env.CANOPY_REDIS_URL }}\"").unwrap();
            assert_eq!(result, "url = \"redis://cache:6379\"");
        });
    }

    #[test]
    fn expands_several_placeholders_on_one_line() {
        let vars = [("CANOPY_HOST", Some("localhost")), ("CANOPY_PORT", Some("8000"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("url = \"http://{{ env.CANOPY_HOST }}:{{ env.CANOPY_PORT }}/mcp\"").unwrap();
            assert_eq!(result, "url = \"http://localhost:8000/mcp\"");
        });
    }

    #[test]
    fn missing_variable_is_reported() {
        temp_env::with_var_unset("CANOPY_MISSING", || {
            let err = expand_env("url = \"{{ env.CANOPY_MISSING }}\"").unwrap_err();
            assert_eq!(err, ExpandError::MissingVar("CANOPY_MISSING".to_owned()));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("CANOPY_PREFIX", || {
            let result = expand_env("key_prefix = \"{{ env.CANOPY_PREFIX | default(\"canopy\") }}\"").unwrap();
            assert_eq!(result, "key_prefix = \"canopy\"");
        });

        temp_env::with_var("CANOPY_PREFIX", Some("staging"), || {
            let result = expand_env("key_prefix = \"{{ env.CANOPY_PREFIX | default(\"canopy\") }}\"").unwrap();
            assert_eq!(result, "key_prefix = \"staging\"");
        });
    }

    #[test]
    fn other_scopes_are_rejected() {
        let err = expand_env("key = \"{{ vault.TOKEN }}\"").unwrap_err();
        assert_eq!(err, ExpandError::UnsupportedScope("vault.TOKEN".to_owned()));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("CANOPY_MISSING", || {
            let input = "  # url = \"{{ env.CANOPY_MISSING }}\"\ntype = \"memory\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
