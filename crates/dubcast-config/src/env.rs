use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// `{{ env.VAR | default("fallback") }}` substitutes the fallback when the
/// variable is unset. Comment lines are copied verbatim so a commented-out
/// secret never has to exist in the environment.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            output.push(line.to_owned());
        } else {
            output.push(expand_line(line)?);
        }
    }

    let mut joined = output.join("\n");
    if input.ends_with('\n') {
        joined.push('\n');
    }

    Ok(joined)
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 1: dotted key, 2: optional default literal
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut failure = None;

    let expanded = placeholder().replace_all(line, |caps: &Captures<'_>| {
        match resolve(&caps[1], caps.get(2).map(|m| m.as_str())) {
            Ok(value) => value,
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e);
                }
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, String> {
    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    std::env::var(var_name)
        .ok()
        .or_else(|| default.map(str::to_owned))
        .ok_or_else(|| format!("environment variable not found: `{var_name}`"))
}
