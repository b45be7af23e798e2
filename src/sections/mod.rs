//! Sub-report generators.
//!
//! Every section of the report is produced by a [`SubReport`]: given the
//! report date it reads its datasets through [`FundData`], optionally draws
//! charts, and returns the layout elements of the section.  Query and
//! conversion errors are returned to the caller; chart errors are turned into
//! notices inside the section so the rest of its content survives.
//!
//! Generators never append page breaks, the composer separates sections.

mod aum;
mod cover;
mod effects;
mod returns;
mod summary;
mod unclassified;

use chrono::NaiveDate;

use crate::chart::ChartRenderer;
use crate::data::{Breakdown, FundData, QueryError};
use crate::layout::LayoutElement;
use crate::registry::{ReportFamily, SectionId};

pub use aum::{AumByFund, AumSummary};
pub use cover::Cover;
pub use effects::SubscriptionEffects;
pub use returns::Returns;
pub use summary::Summary;
pub use unclassified::UnclassifiedFunds;

/// Errors a generator hands back to the composer.
#[derive(Debug, thiserror::Error)]
pub enum SubReportError {
    /// A dataset could not be read.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A value could not be converted for display or charting.
    #[error("cannot convert {field} value {value}")]
    Conversion {
        /// Field being converted.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Collaborators shared by all generators during a run.
#[derive(Clone, Copy)]
pub struct ReportContext<'a> {
    /// Snapshot data.
    pub data: &'a dyn FundData,
    /// Chart drawing.
    pub charts: &'a dyn ChartRenderer,
}

impl<'a> ReportContext<'a> {
    /// Bundles the collaborators.
    pub fn new(data: &'a dyn FundData, charts: &'a dyn ChartRenderer) -> Self {
        Self { data, charts }
    }
}

/// A section generator.
pub trait SubReport {
    /// Section this generator produces.
    fn id(&self) -> SectionId;

    /// Produces the section's elements for `date`.
    ///
    /// An empty dataset yields a single notice, never an empty vector.
    fn generate(
        &self,
        ctx: &ReportContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<LayoutElement>, SubReportError>;
}

/// The notice emitted when a section has nothing to show.
pub fn no_data(id: SectionId) -> LayoutElement {
    LayoutElement::notice(format!("No data available for {}.", id.title()))
}

/// Builds the generator for `id`.
pub fn build(id: SectionId) -> Box<dyn SubReport> {
    match id {
        SectionId::Cover => Box::new(Cover),
        SectionId::Summary => Box::new(Summary),
        SectionId::EffectsByCategory => Box::new(SubscriptionEffects::new(Breakdown::Category)),
        SectionId::EffectsBySubcategory => {
            Box::new(SubscriptionEffects::new(Breakdown::Subcategory))
        }
        SectionId::EffectsByManager => Box::new(SubscriptionEffects::new(Breakdown::Manager)),
        SectionId::Returns => Box::new(Returns),
        SectionId::UnclassifiedFunds => Box::new(UnclassifiedFunds),
        SectionId::AumByFund => Box::new(AumByFund),
        SectionId::AumSummary => Box::new(AumSummary),
    }
}

/// Builds the generators of `family` in report order.
pub fn for_family(family: ReportFamily) -> Vec<Box<dyn SubReport>> {
    family.sections().iter().copied().map(build).collect()
}

fn to_f64(field: &'static str, value: rust_decimal::Decimal) -> Result<f64, SubReportError> {
    use rust_decimal::prelude::ToPrimitive;

    value
        .to_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(|| SubReportError::Conversion {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{build, for_family, no_data};
    use crate::layout::LayoutElement;
    use crate::registry::{ReportFamily, SectionId};

    #[test]
    fn builds_generators_in_family_order() {
        let ids: Vec<_> = for_family(ReportFamily::Industry).iter().map(|g| g.id()).collect();
        assert_eq!(ids, ReportFamily::Industry.sections().to_vec());
        let ids: Vec<_> = for_family(ReportFamily::AumByFund).iter().map(|g| g.id()).collect();
        assert_eq!(ids, vec![SectionId::AumByFund, SectionId::AumSummary]);
    }

    #[test]
    fn every_generator_reports_its_id() {
        for id in ReportFamily::Industry
            .sections()
            .iter()
            .chain(ReportFamily::AumByFund.sections())
        {
            assert_eq!(build(*id).id(), *id);
        }
    }

    #[test]
    fn no_data_notice_names_the_section() {
        match no_data(SectionId::Returns) {
            LayoutElement::Paragraph(p) => assert_eq!(p.text(), "No data available for Rentabilidades."),
            other => panic!("unexpected element {other:?}"),
        }
    }
}
