//! Lenient boolean parsing for form and JSON string fields.

/// A string that is not one of the recognised truth values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid truth value '{0}'")]
pub struct TruthValueError(pub String);

/// Parse a boolean-ish string.
///
/// `y`, `yes`, `t`, `true`, `on` and `1` are true; `n`, `no`, `f`, `false`,
/// `off` and `0` are false. Matching ignores ASCII case and surrounding
/// whitespace.
///
/// ```
/// use bazaar_core::parse_truth_value;
///
/// assert_eq!(parse_truth_value("Yes"), Ok(true));
/// assert_eq!(parse_truth_value("0"), Ok(false));
/// assert!(parse_truth_value("maybe").is_err());
/// ```
///
/// # Errors
///
/// Returns [`TruthValueError`] carrying the original input for anything else.
pub fn parse_truth_value(value: &str) -> Result<bool, TruthValueError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        _ => Err(TruthValueError(value.to_owned())),
    }
}
