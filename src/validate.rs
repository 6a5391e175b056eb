//! Validation for allow-list entries

use crate::error::GuardError;

/// Validate a table name supplied as an allow-list entry
///
/// Entries are compared verbatim against extracted names and never spliced
/// into SQL, so any name the parser can produce is accepted, including quoted
/// identifiers with spaces or punctuation.
///
/// ## Validation Rules
///
/// - **Length**: at least one character
/// - **Characters**: no control characters, no commas (the list separator)
/// - **Padding**: no leading or trailing whitespace
///
/// ## Example
///
/// ```rust
/// use sqlguard::validate::validate_table_identifier;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
///
/// validate_table_identifier("orders")?;
/// validate_table_identifier("Order Items")?;
/// validate_table_identifier("événements")?;
///
/// # assert!(validate_table_identifier("").is_err());
/// # assert!(validate_table_identifier("a,b").is_err());
/// # assert!(validate_table_identifier("line\nbreak").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_table_identifier(name: &str) -> Result<(), GuardError> {
    if name.is_empty() {
        return Err(GuardError::InvalidConfig(
            "Table identifier cannot be empty".to_string(),
        ));
    }

    if name.trim() != name {
        return Err(GuardError::InvalidConfig(format!(
            "Invalid table identifier {:?}: leading or trailing whitespace",
            name
        )));
    }

    if let Some(bad) = name.chars().find(|c| c.is_control() || *c == ',') {
        return Err(GuardError::InvalidConfig(format!(
            "Invalid table identifier {:?}: character {:?} not allowed",
            name, bad
        )));
    }

    Ok(())
}
