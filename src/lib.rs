//! Builds the FCI industry report: reads fund snapshots, turns each section
//! into layout elements, and renders the result as a paginated PDF.

pub mod builder;
pub mod chart;
pub mod composer;
pub mod config;
pub mod data;
pub mod document;
pub mod elements;
pub mod fonts;
pub mod format;
pub mod layout;
pub mod registry;
pub mod render;
pub mod sections;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use composer::{Composer, ComposerState, RunOutcome};
pub use document::Document;
pub use registry::{ReportFamily, SectionId};
