use anyhow::{anyhow, Context as _, Result};
use std::error::Error;
use uuid::Uuid;

pub type StringPair = (String, String);

fn parse_key_value_pair_line(line: &str, seperator: &str) -> Result<StringPair> {
    let parts: Vec<&str> = line.splitn(2, seperator).collect();
    match parts.len() {
        2 => Ok((parts[0].trim().to_string(), parts[1].trim().to_string())),
        _ => Err(anyhow!("Invalid line in key value pair data.")),
    }
}

pub fn parse_uuid<S: AsRef<str>>(value: S) -> Result<Uuid> {
    Uuid::parse_str(value.as_ref())
        .map_err(|e| e.source().map(|e| anyhow!(e.to_string())).unwrap_or(anyhow!(e)))
        .context(format!("'{}' is not a valid GUID", value.as_ref()))
}

pub const SNAPSHOT_PATH_DIRECTIVE: &str = "VAULTKEEP_SNAPSHOT_PATH";

/// Scans hook stdout for redirection directives. This is a trivial line-oriented `KEY=VALUE`
/// grammar, not a shell parser: no quoting, no escaping, no continuation lines. Lines that don't
/// split on `=`, or whose key isn't a directive we recognize, are ignored rather than rejected.
pub fn parse_snapshot_path_directive(stdout: &str) -> Option<String> {
    stdout.lines().rev().find_map(|line| {
        let (key, value) = parse_key_value_pair_line(line, "=").ok()?;
        (key == SNAPSHOT_PATH_DIRECTIVE).then(|| value)
    })
}
