#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fci_report::chart::{ChartError, ChartOptions, ChartRenderer};
use fci_report::data::{
    Breakdown, DatedTotal, EffectRow, FundAum, FundData, FundReturn, QueryError, UnclassifiedFund,
};
use fci_report::render::{DocumentRenderer, RenderError};
use fci_report::Document;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn report_date() -> NaiveDate {
    ymd(2025, 3, 13)
}

/// A per-process scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fci_report_{name}_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// In-memory datasets; any query listed in `failing` returns an error.
#[derive(Default)]
pub struct FakeFundData {
    pub latest: Option<NaiveDate>,
    pub aum_history: Vec<DatedTotal>,
    pub subscription_history: Vec<DatedTotal>,
    pub effects: Vec<EffectRow>,
    pub returns: Vec<FundReturn>,
    pub unclassified: Vec<UnclassifiedFund>,
    pub aum_by_fund: Vec<FundAum>,
    pub family_history: Vec<DatedTotal>,
    pub failing: Vec<&'static str>,
}

impl FakeFundData {
    pub fn failing(mut self, query: &'static str) -> Self {
        self.failing.push(query);
        self
    }

    fn check(&self, query: &'static str) -> Result<(), QueryError> {
        if self.failing.contains(&query) {
            return Err(QueryError::Execute {
                query,
                source: sqlx::Error::Protocol(format!("relation for {query} does not exist")),
            });
        }
        Ok(())
    }
}

impl FundData for FakeFundData {
    fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>, QueryError> {
        self.check("latest_snapshot_date")?;
        Ok(self.latest)
    }

    fn aum_history(&self, _date: NaiveDate, points: u32) -> Result<Vec<DatedTotal>, QueryError> {
        self.check("aum_history")?;
        Ok(self.aum_history.iter().take(points as usize).cloned().collect())
    }

    fn subscription_history(&self, points: u32) -> Result<Vec<DatedTotal>, QueryError> {
        self.check("subscription_history")?;
        Ok(self
            .subscription_history
            .iter()
            .take(points as usize)
            .cloned()
            .collect())
    }

    fn subscription_effects(
        &self,
        _date: NaiveDate,
        _breakdown: Breakdown,
    ) -> Result<Vec<EffectRow>, QueryError> {
        self.check("subscription_effects")?;
        Ok(self.effects.clone())
    }

    fn fund_returns(&self, _date: NaiveDate) -> Result<Vec<FundReturn>, QueryError> {
        self.check("fund_returns")?;
        Ok(self.returns.clone())
    }

    fn unclassified_funds(&self) -> Result<Vec<UnclassifiedFund>, QueryError> {
        self.check("unclassified_funds")?;
        Ok(self.unclassified.clone())
    }

    fn aum_by_fund(&self, _date: NaiveDate) -> Result<Vec<FundAum>, QueryError> {
        self.check("aum_by_fund")?;
        Ok(self.aum_by_fund.clone())
    }

    fn family_aum_history(
        &self,
        _date: NaiveDate,
        points: u32,
    ) -> Result<Vec<DatedTotal>, QueryError> {
        self.check("family_aum_history")?;
        Ok(self.family_history.iter().take(points as usize).cloned().collect())
    }
}

/// Newest-first daily totals ending on the report date.
pub fn dated_totals(count: u32, base: Decimal) -> Vec<DatedTotal> {
    (0..count)
        .map(|offset| DatedTotal {
            fecha: report_date() - chrono::Duration::days(i64::from(offset)),
            total: base + Decimal::from(offset) * dec!(1000),
        })
        .collect()
}

pub fn effect_row(label: &str) -> EffectRow {
    EffectRow {
        label: label.to_string(),
        es_1d: dec!(1234.5),
        es_1w: dec!(-10),
        es_mtd: dec!(250),
        es_1m: dec!(300.25),
        es_3m: dec!(-1200),
        es_ytd: dec!(5000),
        es_1y: dec!(42),
    }
}

pub fn fund_return(fondo: &str) -> FundReturn {
    FundReturn {
        fondo: fondo.to_string(),
        patrimonio: dec!(1500000000),
        categoria: "Renta Fija".to_string(),
        sub_categoria: "Corto Plazo".to_string(),
        rent_1d: Some(dec!(0.0012)),
        rent_wtd: Some(dec!(0.004)),
        rent_mtd: None,
        rent_1m: Some(dec!(0.021)),
        rent_3m: Some(dec!(-0.013)),
        rent_ytd: Some(dec!(0.05)),
        rent_1y: None,
    }
}

pub fn fund_aum(familia: &str, gerente: &str) -> FundAum {
    FundAum {
        fecha: report_date(),
        familia: familia.to_string(),
        categoria: "Renta Variable".to_string(),
        sub_categoria: "Acciones".to_string(),
        patrimonio: dec!(2500000000),
        gerente: gerente.to_string(),
    }
}

/// Writes a small placeholder file for every chart into `dir`.
pub struct FileChartRenderer {
    pub dir: PathBuf,
    pub calls: Cell<usize>,
}

impl FileChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            calls: Cell::new(0),
        }
    }
}

impl ChartRenderer for FileChartRenderer {
    fn render_bar_chart(
        &self,
        labels: &[String],
        values: &[f64],
        options: &ChartOptions,
    ) -> Result<PathBuf, ChartError> {
        self.calls.set(self.calls.get() + 1);
        if labels.is_empty() || labels.len() != values.len() {
            return Err(ChartError::InvalidSeries {
                labels: labels.len(),
                values: values.len(),
            });
        }
        let path = self.dir.join(options.file_name());
        fs::write(&path, b"png").map_err(|source| ChartError::ScratchDir {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Chart renderer whose every call fails.
pub struct FailingChartRenderer;

impl ChartRenderer for FailingChartRenderer {
    fn render_bar_chart(
        &self,
        _labels: &[String],
        _values: &[f64],
        options: &ChartOptions,
    ) -> Result<PathBuf, ChartError> {
        Err(ChartError::Missing(PathBuf::from(options.file_name())))
    }
}

/// Records every document it is asked to render and writes a stub file.
///
/// The first `failures` calls fail without touching the output.
#[derive(Default)]
pub struct RecordingRenderer {
    pub rendered: RefCell<Vec<Document>>,
    pub failures: Cell<usize>,
}

impl RecordingRenderer {
    pub fn failing(times: usize) -> Self {
        Self {
            rendered: RefCell::new(Vec::new()),
            failures: Cell::new(times),
        }
    }

    pub fn attempts(&self) -> usize {
        self.rendered.borrow().len()
    }
}

impl DocumentRenderer for RecordingRenderer {
    fn render(&self, document: &Document, output: &Path) -> Result<(), RenderError> {
        self.rendered.borrow_mut().push(document.clone());
        let remaining = self.failures.get();
        if remaining > 0 {
            self.failures.set(remaining - 1);
            return Err(RenderError::Layout(genpdf::error::Error::new(
                "element does not fit on the page",
                genpdf::error::ErrorKind::PageSizeExceeded,
            )));
        }
        fci_report::render::write_atomically(output, b"%PDF-1.3\n%%EOF\n")
    }
}
