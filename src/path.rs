//! Secret path validation.

use crate::error::VaultError;

/// Longest accepted path, in characters.
pub const MAX_PATH_LEN: usize = 255;

/// Check that `path` can name a secret: not blank, at most
/// `MAX_PATH_LEN` characters, no control characters.
///
/// Paths are otherwise free-form. Segments are conventionally separated by
/// `/` but nothing here enforces a leading slash or segment structure.
pub fn validate(path: &str) -> Result<(), VaultError> {
    if path.trim().is_empty() {
        return Err(VaultError::ValidationError("path must not be blank".into()));
    }
    if path.chars().count() > MAX_PATH_LEN {
        return Err(VaultError::ValidationError(format!(
            "path exceeds {} characters",
            MAX_PATH_LEN
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(VaultError::ValidationError(
            "path must not contain control characters".into(),
        ));
    }
    Ok(())
}
