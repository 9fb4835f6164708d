//! Shared CLI plumbing for the `rdt-tools` binaries.

pub mod config_args;
