use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;

use super::{no_data, to_f64, ReportContext, SubReport, SubReportError};
use crate::chart::ChartOptions;
use crate::data::DatedTotal;
use crate::layout::{ImageBlock, LayoutElement};
use crate::registry::SectionId;

const HISTORY_POINTS: u32 = 6;
const CHART_WIDTH_MM: f64 = 88.0;
const LEADING_SPACE_PT: f64 = 20.0;

const AUM_CAPTION: &str = "AUM TOTAL INDUSTRIA FCI - Reexpresado en billones de pesos";
const SUBSCRIPTIONS_CAPTION: &str = "SUSCRIPCIONES NETAS - En millones de pesos";

/// Industry AUM and net subscriptions as two bar charts.
pub struct Summary;

struct Series {
    labels: Vec<String>,
    values: Vec<f64>,
}

/// Turns newest-first totals into an oldest-first chart series divided by
/// `divisor`.
fn chart_series(rows: &[DatedTotal], divisor: Decimal) -> Result<Series, SubReportError> {
    let mut labels = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
        labels.push(row.fecha.format("%m-%d").to_string());
        values.push(to_f64("total", row.total / divisor)?);
    }
    Ok(Series { labels, values })
}

impl Summary {
    fn chart(
        ctx: &ReportContext<'_>,
        name: &str,
        series: &Series,
        options: ChartOptions,
        caption: &str,
    ) -> Result<ImageBlock, LayoutElement> {
        match ctx.charts.render_bar_chart(&series.labels, &series.values, &options) {
            Ok(path) => {
                info!("Summary: {name} chart added ({})", path.display());
                Ok(ImageBlock::new(path)
                    .with_caption(caption)
                    .with_width_mm(CHART_WIDTH_MM))
            }
            Err(err) => {
                warn!("Summary: {name} chart error: {err}");
                Err(LayoutElement::notice(format!("{name} chart failed: {err}")))
            }
        }
    }
}

impl SubReport for Summary {
    fn id(&self) -> SectionId {
        SectionId::Summary
    }

    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError> {
        let aum = ctx.data.aum_history(date, HISTORY_POINTS)?;
        let subscriptions = ctx.data.subscription_history(HISTORY_POINTS)?;
        if aum.is_empty() {
            return Ok(vec![no_data(self.id())]);
        }
        info!(
            "Summary: fetched {} AUM and {} subscription rows",
            aum.len(),
            subscriptions.len()
        );

        // Both series are converted first so an error cannot strand a chart file.
        let aum_series = chart_series(&aum, Decimal::from(1_000_000_000_000_i64))?;
        let subscription_series = if subscriptions.is_empty() {
            None
        } else {
            Some(chart_series(&subscriptions, Decimal::ONE)?)
        };

        let mut elements = vec![LayoutElement::spacer(LEADING_SPACE_PT)];
        let mut images = Vec::new();

        let options = ChartOptions::new("aum_chart.png").with_value_decimals(2);
        match Self::chart(ctx, "AUM", &aum_series, options, AUM_CAPTION) {
            Ok(image) => images.push(image),
            Err(notice) => elements.push(notice),
        }

        match subscription_series {
            None => elements.push(LayoutElement::notice("No Subscriptions data available.")),
            Some(series) => {
                let options = ChartOptions::new("sub_chart.png").with_value_decimals(0);
                match Self::chart(ctx, "Subscriptions", &series, options, SUBSCRIPTIONS_CAPTION) {
                    Ok(image) => images.push(image),
                    Err(notice) => elements.push(notice),
                }
            }
        }

        match images.len() {
            0 => elements.push(LayoutElement::notice("No charts generated.")),
            1 => elements.extend(images.into_iter().map(LayoutElement::Image)),
            _ => elements.push(LayoutElement::ImageRow(images)),
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::chart_series;
    use crate::data::DatedTotal;

    fn total(day: u32, value: Decimal) -> DatedTotal {
        DatedTotal {
            fecha: NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date"),
            total: value,
        }
    }

    #[test]
    fn series_is_reversed_to_oldest_first_and_scaled() {
        let rows = vec![
            total(13, dec!(45_000_000_000_000)),
            total(12, dec!(44_500_000_000_000)),
        ];
        let series = chart_series(&rows, Decimal::from(1_000_000_000_000_i64)).expect("series");
        assert_eq!(series.labels, vec!["03-12".to_string(), "03-13".to_string()]);
        assert_eq!(series.values, vec![44.5, 45.0]);
        assert_eq!(rows[0].fecha.format("%d").to_string(), "13");
    }
}
