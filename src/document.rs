//! The composed report document.

use std::path::Path;

use crate::layout::LayoutElement;
use crate::registry::SectionId;

/// Document level metadata shared by the page header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportMetadata {
    as_of: Option<String>,
}

impl ReportMetadata {
    /// Returns the as-of date, once a section has stated it.
    pub fn as_of(&self) -> Option<&str> {
        self.as_of.as_deref()
    }

    /// Records the as-of date unless one is already set.
    ///
    /// Returns `true` when the value was stored.
    pub fn record_as_of(&mut self, value: &str) -> bool {
        if self.as_of.is_some() {
            return false;
        }
        self.as_of = Some(value.to_owned());
        true
    }
}

/// How a section's content came to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionStatus {
    /// The generator produced content.
    Generated,
    /// The generator found nothing to report.
    NoData,
    /// The generator failed and a placeholder was inserted.
    Failed {
        /// Failure description.
        reason: String,
    },
}

/// One section of the document.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    id: SectionId,
    status: SectionStatus,
    elements: Vec<LayoutElement>,
}

impl Section {
    /// Creates a section from its elements.
    pub fn new(id: SectionId, status: SectionStatus, elements: Vec<LayoutElement>) -> Self {
        Self {
            id,
            status,
            elements,
        }
    }

    /// Returns the section identity.
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Returns the display title.
    pub fn title(&self) -> &'static str {
        self.id.title()
    }

    /// Returns how the section was produced.
    pub fn status(&self) -> &SectionStatus {
        &self.status
    }

    /// Returns the section's elements in order.
    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }
}

/// Ordered sections plus metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    metadata: ReportMetadata,
    sections: Vec<Section>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata.
    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    /// Returns mutable metadata.
    pub fn metadata_mut(&mut self) -> &mut ReportMetadata {
        &mut self.metadata
    }

    /// Appends a section.
    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Returns the sections in order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Iterates over every element across sections in document order.
    pub fn elements(&self) -> impl Iterator<Item = &LayoutElement> {
        self.sections.iter().flat_map(|section| section.elements.iter())
    }

    /// Returns every scratch file referenced by the document, without duplicates.
    pub fn scratch_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::new();
        for path in self.elements().flat_map(LayoutElement::scratch_files) {
            if !files.contains(&path) {
                files.push(path);
            }
        }
        files
    }

    /// Returns a copy restricted to renderer-safe elements and the number of
    /// elements that were dropped.
    pub fn render_safe(&self) -> (Document, usize) {
        let mut dropped = 0;
        let sections = self
            .sections
            .iter()
            .map(|section| {
                let elements: Vec<_> = section
                    .elements
                    .iter()
                    .filter(|element| element.is_render_safe())
                    .cloned()
                    .collect();
                dropped += section.elements.len() - elements.len();
                Section::new(section.id, section.status.clone(), elements)
            })
            .collect();

        (
            Document {
                metadata: self.metadata.clone(),
                sections,
            },
            dropped,
        )
    }
}
