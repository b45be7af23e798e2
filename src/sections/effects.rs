use chrono::NaiveDate;
use log::info;

use super::{no_data, ReportContext, SubReport, SubReportError};
use crate::data::{Breakdown, EffectRow};
use crate::format;
use crate::layout::{LayoutElement, TableBlock};
use crate::registry::SectionId;

const HORIZONS: [&str; 7] = ["1D", "1SEM", "MTD", "1M", "3M", "YTD", "1Y"];
const HORIZON_WIDTH: usize = 50;

/// Net subscription effects over several horizons, grouped by category,
/// subcategory or manager.
pub struct SubscriptionEffects {
    breakdown: Breakdown,
}

impl SubscriptionEffects {
    /// Creates the generator for `breakdown`.
    pub fn new(breakdown: Breakdown) -> Self {
        Self { breakdown }
    }

    fn heading(&self) -> &'static str {
        match self.breakdown {
            Breakdown::Category => "EFECTOS DE SUSCRIPCION NETOS POR CATEGORIA (en millones):",
            Breakdown::Subcategory => {
                "EFECTOS DE SUSCRIPCION NETOS POR SUBCATEGORIA (en millones):"
            }
            Breakdown::Manager => "EFECTOS DE SUSCRIPCION NETOS POR GERENTE (en millones):",
        }
    }

    fn label_column(&self) -> (&'static str, usize) {
        match self.breakdown {
            Breakdown::Category => ("CATEGORIA", 150),
            Breakdown::Subcategory => ("SUB-CATEGORIA", 161),
            Breakdown::Manager => ("GERENTE", 165),
        }
    }

    fn table(&self, rows: &[EffectRow]) -> TableBlock {
        let (label, label_width) = self.label_column();
        let header = std::iter::once(label).chain(HORIZONS);
        let mut widths = vec![label_width];
        widths.extend([HORIZON_WIDTH; HORIZONS.len()]);

        let decimals = self.breakdown.decimals();
        TableBlock::new(header, widths).with_rows(rows.iter().map(|row| {
            std::iter::once(row.label.clone())
                .chain(row.horizons().iter().map(|value| format::grouped(*value, decimals)))
                .collect()
        }))
    }
}

impl SubReport for SubscriptionEffects {
    fn id(&self) -> SectionId {
        match self.breakdown {
            Breakdown::Category => SectionId::EffectsByCategory,
            Breakdown::Subcategory => SectionId::EffectsBySubcategory,
            Breakdown::Manager => SectionId::EffectsByManager,
        }
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let rows = ctx.data.subscription_effects(date, self.breakdown)?;
        if rows.is_empty() {
            return Ok(vec![no_data(self.id())]);
        }
        info!("{}: fetched {} rows", self.id(), rows.len());

        Ok(vec![
            LayoutElement::heading(self.heading()),
            LayoutElement::spacer(10.0),
            LayoutElement::as_of(date),
            LayoutElement::spacer(5.0),
            LayoutElement::Table(self.table(&rows)),
        ])
    }
}
