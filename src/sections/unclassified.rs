use chrono::NaiveDate;
use log::info;

use super::{no_data, ReportContext, SubReport, SubReportError};
use crate::layout::{LayoutElement, TableBlock};
use crate::registry::SectionId;

/// Funds whose family, category or subcategory is missing.
pub struct UnclassifiedFunds;

impl SubReport for UnclassifiedFunds {
    fn id(&self) -> SectionId {
        SectionId::UnclassifiedFunds
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let funds = ctx.data.unclassified_funds()?;
        if funds.is_empty() {
            return Ok(vec![no_data(self.id())]);
        }
        info!("{}: {} funds without classification", self.id(), funds.len());

        let table = TableBlock::new(["FONDO"], vec![225])
            .with_font_size(6)
            .with_rows(funds.into_iter().map(|fund| vec![fund.fondo]));

        Ok(vec![
            LayoutElement::heading("FONDOS SIN CLASIFICAR:"),
            LayoutElement::spacer(10.0),
            LayoutElement::as_of(date),
            LayoutElement::spacer(5.0),
            LayoutElement::Table(table),
        ])
    }
}
