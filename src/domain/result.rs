//! Result type alias for Campex
//!
//! Convenience alias using [`CampexError`] as the error type.

use super::errors::CampexError;

/// Result type alias for Campex operations
///
/// # Examples
///
/// ```
/// use campex::domain::result::Result;
/// use campex::domain::errors::CampexError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CampexError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CampexError>;
