//! Report data sources and the CSV artifact generator
//!
//! Report rows are fetched per [`Platform`](crate::domain::Platform) through
//! a [`ReportSourceRegistry`] built once at startup, then written by
//! [`CsvArtifactGenerator`] with the organization's delimiter and timezone.

pub mod csv;
pub mod registry;

pub use self::csv::CsvArtifactGenerator;
pub use registry::ReportSourceRegistry;
