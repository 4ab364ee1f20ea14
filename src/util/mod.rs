//! Shared utilities.

pub mod localid;
