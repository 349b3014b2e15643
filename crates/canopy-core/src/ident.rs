use thiserror::Error;

/// Longest identifier accepted for servers, clients and tools
const MAX_IDENTIFIER_LEN: usize = 128;

/// An identifier that cannot be used as a registry key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier '{value}': {reason}")]
pub struct InvalidIdentifier {
    /// What the identifier names (`server`, `client`, `tool`)
    pub kind: &'static str,
    /// The rejected value
    pub value: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// Check that an identifier is usable as a registry key
///
/// Identifiers are 1 to 128 ASCII characters drawn from letters, digits,
/// `-`, `_` and `.`. The restriction keeps the `/`-separated matrix keys
/// used by the storage backends unambiguous.
///
/// # Errors
///
/// Returns [`InvalidIdentifier`] describing the first rule violated
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), InvalidIdentifier> {
    let reject = |reason| InvalidIdentifier {
        kind,
        value: value.to_owned(),
        reason,
    };

    if value.is_empty() {
        return Err(reject("must not be empty"));
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(reject("must be at most 128 characters"));
    }

    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(reject("may only contain letters, digits, '-', '_' and '.'"));
    }

    Ok(())
}
