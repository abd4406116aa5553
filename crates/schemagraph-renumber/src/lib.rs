//! Offline id renumbering for SDF schema documents.
//!
//! Rewrites every event, entity, participant and relation id into the
//! canonical `<namespace><Class>/<NNNNN>/<name>` form, with one counter per
//! class, and rewrites every reference the graph engine follows (children,
//! outlinks, participant entities, relation subjects and objects). The
//! old→new table is returned alongside so it can be written as CSV.

pub mod error;
pub mod mapping;
pub mod renumber;

pub use error::{RenumberError, Result};
pub use mapping::{IdClass, IdMapping};
pub use renumber::{output_paths, render_document, renumber, RenumberOptions, Renumberer};
