//! Loading the fleet's address list.

use crate::core::{Endpoint, Result, SaveError};
use std::fs;
use std::path::Path;

/// Parse one address per line. Surrounding whitespace is trimmed; blank lines
/// and `#` comments are skipped.
pub fn parse_endpoints(text: &str) -> Vec<Endpoint> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Endpoint::from)
        .collect()
}

/// Read the address file at `path`. An empty list is a setup error.
pub fn load_endpoints(path: &Path) -> Result<Vec<Endpoint>> {
    let text = fs::read_to_string(path)
        .map_err(|err| SaveError::Setup(format!("read '{}': {}", path.display(), err)))?;

    let endpoints = parse_endpoints(&text);
    if endpoints.is_empty() {
        return Err(SaveError::Setup(format!(
            "no addresses in '{}'",
            path.display()
        )));
    }
    Ok(endpoints)
}
