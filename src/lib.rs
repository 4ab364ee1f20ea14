//! `issuemirror` - offline mirror and reconciliation for remote issue
//! trackers.
//!
//! The mirror lives in `.issues/` as one front-matter file per record,
//! split into open and closed containers. Reconciliation is three-way:
//! every record is compared against its last-synchronized snapshot and the
//! current remote state, so local edits, remote updates and genuine
//! conflicts are told apart per record. Records created offline get
//! temporary ids that are promoted to permanent ones on push, with every
//! cross-reference rewritten across the corpus.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{MirrorError, Result};
