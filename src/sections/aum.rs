//! Sections of the AUM-by-fund report.

use std::sync::OnceLock;

use chrono::NaiveDate;
use log::{info, warn};
use regex::Regex;
use rust_decimal::Decimal;

use super::{no_data, to_f64, ReportContext, SubReport, SubReportError};
use crate::chart::ChartOptions;
use crate::data::{DatedTotal, FundAum};
use crate::format;
use crate::layout::{ImageBlock, LayoutElement, TableBlock};
use crate::registry::SectionId;

const MILLION: i64 = 1_000_000;
const HISTORY_POINTS: u32 = 100;
const CHART_POINTS: usize = 12;
const CHART_WIDTH_MM: f64 = 150.0;

static LEGAL_SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();

/// Drops a trailing legal-entity suffix such as `S.A.` or `SGFCISA` from a
/// manager name. Names that consist only of the suffix are kept whole.
fn strip_legal_suffix(name: &str) -> String {
    let pattern = LEGAL_SUFFIX.get_or_init(|| Regex::new(r"\s*[A-Z\.]+$").ok());
    let Some(pattern) = pattern else {
        return name.trim().to_string();
    };
    let stripped = pattern.replace(name, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        name.trim().to_string()
    } else {
        stripped.to_string()
    }
}

fn millions(value: Decimal) -> String {
    format::grouped(format::scaled(value, MILLION), 0)
}

/// AUM of every fund on the report date with its classification.
pub struct AumByFund;

impl AumByFund {
    fn table(rows: &[FundAum]) -> TableBlock {
        TableBlock::new(
            ["FAMILIA", "CATEGORIA", "SUB CATEGORIA", "AUM", "SOC. GERENTE"],
            vec![135, 75, 135, 60, 147],
        )
        .with_font_size(6)
        .with_rows(rows.iter().map(|row| {
            vec![
                row.familia.clone(),
                row.categoria.clone(),
                row.sub_categoria.clone(),
                millions(row.patrimonio),
                strip_legal_suffix(&row.gerente),
            ]
        }))
    }
}

impl SubReport for AumByFund {
    fn id(&self) -> SectionId {
        SectionId::AumByFund
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let rows = ctx.data.aum_by_fund(date)?;
        let Some(first) = rows.first() else {
            return Ok(vec![no_data(self.id())]);
        };
        let total: Decimal = rows.iter().map(|row| row.patrimonio).sum();
        info!("{}: {} funds, total {}", self.id(), rows.len(), total);

        Ok(vec![
            LayoutElement::heading(format!(
                "AUM por Fondo (Total: {} millones)",
                millions(total)
            )),
            LayoutElement::spacer(10.0),
            LayoutElement::as_of(first.fecha),
            LayoutElement::spacer(5.0),
            LayoutElement::Table(Self::table(&rows)),
        ])
    }
}

/// History of total family AUM as a table and a bar chart.
pub struct AumSummary;

impl AumSummary {
    fn table(rows: &[DatedTotal]) -> TableBlock {
        TableBlock::new(["Fecha", "Total AUM (millones)"], vec![200, 200]).with_rows(
            rows.iter().map(|row| {
                vec![row.fecha.format("%Y-%m-%d").to_string(), millions(row.total)]
            }),
        )
    }

    fn chart(ctx: &ReportContext<'_>, rows: &[DatedTotal]) -> Result<LayoutElement, SubReportError> {
        let recent = &rows[..rows.len().min(CHART_POINTS)];
        let mut labels = Vec::with_capacity(recent.len());
        let mut values = Vec::with_capacity(recent.len());
        for row in recent.iter().rev() {
            labels.push(row.fecha.format("%m-%d").to_string());
            values.push(to_f64("total_aum", format::scaled(row.total, MILLION))?);
        }

        let options = ChartOptions::new("aum_family_chart.png")
            .with_size(900, 400)
            .with_value_decimals(0);
        Ok(match ctx.charts.render_bar_chart(&labels, &values, &options) {
            Ok(path) => {
                info!("{}: chart added ({})", SectionId::AumSummary, path.display());
                LayoutElement::Image(
                    ImageBlock::new(path)
                        .with_caption("Total AUM (millones)")
                        .with_width_mm(CHART_WIDTH_MM),
                )
            }
            Err(err) => {
                warn!("{}: chart error: {err}", SectionId::AumSummary);
                LayoutElement::notice(format!("Chart failed: {err}"))
            }
        })
    }
}

impl SubReport for AumSummary {
    fn id(&self) -> SectionId {
        SectionId::AumSummary
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let rows = ctx.data.family_aum_history(date, HISTORY_POINTS)?;
        if rows.is_empty() {
            return Ok(vec![no_data(self.id())]);
        }
        info!("{}: fetched {} rows", self.id(), rows.len());

        Ok(vec![
            LayoutElement::heading(format!(
                "Resumen de AUM por Fecha (Últimos {} Días)",
                HISTORY_POINTS
            )),
            LayoutElement::spacer(10.0),
            LayoutElement::paragraph(
                "A continuación, se presenta un resumen del patrimonio total por fecha, seguido de un gráfico.",
            ),
            LayoutElement::spacer(5.0),
            LayoutElement::Table(Self::table(&rows)),
            LayoutElement::spacer(20.0),
            Self::chart(ctx, &rows)?,
        ])
    }
}
