use chrono::NaiveDate;
use log::info;

use super::{no_data, ReportContext, SubReport, SubReportError};
use crate::data::FundReturn;
use crate::format;
use crate::layout::{LayoutElement, TableBlock};
use crate::registry::SectionId;

const HEADER: [&str; 11] = [
    "FONDO",
    "PATRIMONIO",
    "CATEGORIA",
    "SUBCATEGORIA",
    "1D",
    "WTD",
    "MTD",
    "1M",
    "3M",
    "YTD",
    "1Y",
];
const WIDTHS: [usize; 11] = [127, 60, 60, 60, 35, 35, 35, 35, 35, 35, 35];
const FONT_SIZE: u8 = 6;

/// Unit value (VCP) returns per fund.
pub struct Returns;

fn table(rows: &[FundReturn]) -> TableBlock {
    TableBlock::new(HEADER, WIDTHS)
        .with_font_size(FONT_SIZE)
        .with_rows(rows.iter().map(|row| {
            let mut cells = vec![
                row.fondo.clone(),
                format::grouped(row.patrimonio, 0),
                row.categoria.clone(),
                row.sub_categoria.clone(),
            ];
            cells.extend(row.periods().into_iter().map(format::percent_or_blank));
            cells
        }))
}

impl SubReport for Returns {
    fn id(&self) -> SectionId {
        SectionId::Returns
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let rows = ctx.data.fund_returns(date)?;
        if rows.is_empty() {
            return Ok(vec![no_data(self.id())]);
        }
        info!("{}: fetched {} funds", self.id(), rows.len());

        Ok(vec![
            LayoutElement::heading("RENTABILIDADES VCP (en %):"),
            LayoutElement::spacer(10.0),
            LayoutElement::as_of(date),
            LayoutElement::spacer(5.0),
            LayoutElement::Table(table(&rows)),
        ])
    }
}
