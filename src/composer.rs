//! Report composition: runs the section generators in order, assembles their
//! output into one [`Document`], renders it with a single degraded retry and
//! removes the scratch chart files afterwards.
//!
//! Failures stay local.  A generator that errors is replaced by a placeholder
//! paragraph and the run moves on; only the final render can fail the run, and
//! even then a copy restricted to renderer-safe elements is tried once before
//! giving up.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, error, info, warn};

use crate::document::{Document, Section, SectionStatus};
use crate::layout::{LayoutElement, Paragraph, ParagraphRole};
use crate::registry::ReportFamily;
use crate::render::DocumentRenderer;
use crate::sections::{self, no_data, ReportContext, SubReport};

/// Where a run currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposerState {
    /// Nothing has run yet.
    Pending,
    /// The generator at this position is running.
    PerSubReport(usize),
    /// All generators finished; the document is being rendered.
    Assembling,
    /// The full document was rendered.
    Rendered,
    /// Only the renderer-safe subset could be rendered.
    DegradedRendered,
    /// Nothing could be rendered.
    Failed,
}

/// Terminal result of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The full document was written to `output`.
    Rendered {
        /// Written file.
        output: PathBuf,
    },
    /// A reduced document was written after the full render failed.
    DegradedRendered {
        /// Written file.
        output: PathBuf,
        /// Number of elements left out.
        dropped: usize,
    },
    /// No file was written.
    Failed {
        /// Why the last render attempt failed.
        reason: String,
    },
}

impl RunOutcome {
    /// The state this outcome corresponds to.
    pub fn state(&self) -> ComposerState {
        match self {
            Self::Rendered { .. } => ComposerState::Rendered,
            Self::DegradedRendered { .. } => ComposerState::DegradedRendered,
            Self::Failed { .. } => ComposerState::Failed,
        }
    }

    /// The written file, if any.
    pub fn output(&self) -> Option<&Path> {
        match self {
            Self::Rendered { output } | Self::DegradedRendered { output, .. } => Some(output),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the run produced no file.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Drives a fixed sequence of generators.
pub struct Composer {
    generators: Vec<Box<dyn SubReport>>,
    state: ComposerState,
}

impl Composer {
    /// Creates a composer running `generators` in the given order.
    pub fn new(generators: Vec<Box<dyn SubReport>>) -> Self {
        Self {
            generators,
            state: ComposerState::Pending,
        }
    }

    /// Creates a composer for every section of `family`.
    pub fn for_family(family: ReportFamily) -> Self {
        Self::new(sections::for_family(family))
    }

    /// Returns the current state.
    pub fn state(&self) -> ComposerState {
        self.state
    }

    fn transition(&mut self, state: ComposerState) {
        debug!("Composer: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs every generator for `date` and assembles their output.
    ///
    /// Each section is followed by a page break.  The document's as-of date is
    /// taken from the first as-of marker in section order.
    pub fn compose(&mut self, ctx: &ReportContext<'_>, date: NaiveDate) -> Document {
        let mut document = Document::new();

        for index in 0..self.generators.len() {
            self.transition(ComposerState::PerSubReport(index));
            let generator = &self.generators[index];
            let id = generator.id();
            info!("Generating section: {id}");

            let (status, mut elements) = match generator.generate(ctx, date) {
                Ok(elements) if elements.is_empty() => {
                    warn!("{id}: generator returned no elements");
                    (SectionStatus::NoData, vec![no_data(id)])
                }
                Ok(elements) => {
                    let status = if is_notice_only(&elements) {
                        SectionStatus::NoData
                    } else {
                        SectionStatus::Generated
                    };
                    info!(
                        "{id}: {} elements added: {:?}",
                        elements.len(),
                        elements.iter().map(LayoutElement::kind).collect::<Vec<_>>()
                    );
                    (status, elements)
                }
                Err(err) => {
                    error!("Error in section '{id}': {err}");
                    let reason = err.to_string();
                    (
                        SectionStatus::Failed {
                            reason: reason.clone(),
                        },
                        vec![LayoutElement::Paragraph(Paragraph::failure(id, reason))],
                    )
                }
            };

            if let Some(as_of) = elements.iter().find_map(LayoutElement::as_of_marker) {
                if document.metadata_mut().record_as_of(as_of) {
                    info!("{id}: report as-of date set to {as_of}");
                }
            }

            elements.push(LayoutElement::PageBreak);
            document.push_section(Section::new(id, status, elements));
        }

        self.transition(ComposerState::Assembling);
        document
    }

    /// Renders `document` to `output`, retrying once with renderer-safe
    /// elements only.  Never panics and never returns an error; a render that
    /// fails twice yields [`RunOutcome::Failed`].
    pub fn publish(
        &mut self,
        document: &Document,
        renderer: &dyn DocumentRenderer,
        output: &Path,
    ) -> RunOutcome {
        self.transition(ComposerState::Assembling);

        let outcome = match renderer.render(document, output) {
            Ok(()) => {
                info!("Report generated: {}", output.display());
                RunOutcome::Rendered {
                    output: output.to_path_buf(),
                }
            }
            Err(err) => {
                warn!("Error during PDF build: {err}");
                let (safe, dropped) = document.render_safe();
                info!("Retrying render without {dropped} unsafe element(s)");
                match renderer.render(&safe, output) {
                    Ok(()) => {
                        warn!("Reduced report generated: {}", output.display());
                        RunOutcome::DegradedRendered {
                            output: output.to_path_buf(),
                            dropped,
                        }
                    }
                    Err(err) => {
                        error!("Reduced render failed: {err}");
                        RunOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
        };

        self.transition(outcome.state());
        outcome
    }

    /// Composes, publishes and cleans up in one go.
    pub fn run(
        &mut self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
        renderer: &dyn DocumentRenderer,
        output: &Path,
    ) -> RunOutcome {
        let document = self.compose(ctx, date);
        let outcome = self.publish(&document, renderer, output);
        remove_scratch_files(&document);
        outcome
    }
}

fn is_notice_only(elements: &[LayoutElement]) -> bool {
    matches!(
        elements,
        [LayoutElement::Paragraph(paragraph)] if *paragraph.role() == ParagraphRole::Notice
    )
}

/// Deletes every scratch image referenced by `document`; failures are logged.
///
/// Returns the number of files removed.
pub fn remove_scratch_files(document: &Document) -> usize {
    let mut removed = 0;
    for path in document.scratch_files() {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Cleaned up: {}", path.display());
                removed += 1;
            }
            Err(err) => warn!("Failed to clean up {}: {err}", path.display()),
        }
    }
    removed
}
