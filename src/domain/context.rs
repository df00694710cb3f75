//! Error context extension trait
//!
//! A context extension similar to `anyhow::Context` for `Result<T, CampexError>`.
//! Unlike anyhow, the error variant is kept: a `NotFound` with context is still
//! a `NotFound`, which the retry classifier relies on.
//!
//! # Examples
//!
//! ```rust
//! use campex::domain::{CampexError, Result};
//! use campex::domain::context::ResultExt;
//!
//! fn read_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .context(format!("Failed to read file: {}", path))
//! }
//!
//! fn load_campaign(id: i64) -> Result<()> {
//!     fetch_campaign(id).with_context(|| format!("campaign {id}"))?;
//!     Ok(())
//! }
//! # fn fetch_campaign(id: i64) -> Result<()> { Ok(()) }
//! ```

use crate::domain::errors::CampexError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
///
/// This trait provides `.context()` and `.with_context()` methods
/// for adding contextual information to errors, similar to `anyhow::Context`.
///
/// The variant of the underlying error is preserved.
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// This method adds contextual information to an error. The context
    /// is evaluated eagerly, so use `.with_context()` if the context
    /// string is expensive to compute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use campex::domain::{CampexError, Result};
    /// use campex::domain::context::ResultExt;
    ///
    /// fn load_config(path: &str) -> Result<String> {
    ///     std::fs::read_to_string(path)
    ///         .context(format!("Failed to load configuration from: {}", path))
    /// }
    /// ```
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    ///
    /// This method is similar to `.context()` but the context is computed
    /// lazily only if an error occurs. This is more efficient when the
    /// context string is expensive to compute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use campex::domain::{CampexError, Result};
    /// use campex::domain::context::ResultExt;
    ///
    /// fn fetch_campaign(org: i64, campaign: i64) -> Result<String> {
    ///     make_request(campaign)
    ///         .with_context(|| format!("organization {org}, campaign {campaign}"))
    /// }
    /// # fn make_request(campaign: i64) -> Result<String> { Ok(String::new()) }
    /// ```
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

/// Implementation for `Result<T, E>` where `E` can be converted to `CampexError`
impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CampexError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| {
            let base: CampexError = e.into();
            base.with_prefix(context)
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let base: CampexError = e.into();
            base.with_prefix(f())
        })
    }
}
