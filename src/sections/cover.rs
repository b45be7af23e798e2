use chrono::NaiveDate;

use super::{ReportContext, SubReport, SubReportError};
use crate::layout::{Heading, LayoutElement, Paragraph};
use crate::registry::SectionId;

const TITLE: &str = "REPORTE INDUSTRIA FCI";
const TITLE_OFFSET_PT: f64 = 36.0;

/// Cover page: the report title pushed down the page and the data date.
///
/// The cover reads no dataset and states no as-of marker, so the page header
/// takes its date from the first data section.
pub struct Cover;

impl SubReport for Cover {
    fn id(&self) -> SectionId {
        SectionId::Cover
    }

    fn generate(
        &self,
        _ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        Ok(vec![
            LayoutElement::spacer(TITLE_OFFSET_PT),
            LayoutElement::Heading(Heading::cover(TITLE)),
            LayoutElement::spacer(TITLE_OFFSET_PT),
            LayoutElement::Paragraph(Paragraph::lead(format!(
                "Datos al {}",
                date.format("%Y-%m-%d")
            ))),
        ])
    }
}
