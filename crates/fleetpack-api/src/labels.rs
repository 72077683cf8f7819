//! Label sets and their textual `key=value,...` form

use std::collections::BTreeMap;

use thiserror::Error;

/// A set of key/value labels
///
/// Ordered so that serialized forms (and therefore packet hashes) are stable.
pub type Labels = BTreeMap<String, String>;

/// Errors raised while parsing a label string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelParseError {
    /// A pair without `=`
    #[error("label `{0}` is not of the form key=value")]
    MissingSeparator(String),

    /// A pair with an empty key
    #[error("label `{0}` has an empty key")]
    EmptyKey(String),
}

/// Parse `key=value` pairs separated by commas
///
/// Whitespace around pairs is ignored and empty segments are skipped, so
/// `""` parses to an empty set. Later duplicates overwrite earlier ones.
///
/// # Errors
/// Returns `LabelParseError` for a segment without `=` or with an empty key.
pub fn parse_labels(input: &str) -> Result<Labels, LabelParseError> {
    let mut labels = Labels::new();

    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| LabelParseError::MissingSeparator(pair.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(LabelParseError::EmptyKey(pair.to_string()));
        }
        labels.insert(key.to_string(), value.trim().to_string());
    }

    Ok(labels)
}

/// Render labels back to their `key=value,...` form
#[must_use]
pub fn format_labels(labels: &Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
