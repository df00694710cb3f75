//! CLI command implementations

pub mod consume;
pub mod init;
pub mod publish;
pub mod status;
pub mod validate;
