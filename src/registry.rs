//! Static registry describing every section the report can contain.
//!
//! Each [`SectionId`] maps to a display title and to the datasets it reads.
//! Titles are used for logging, placeholders and PDF bookmarks.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Identity of a sub-report section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum SectionId {
    /// Cover page with title and snapshot date.
    Cover,
    /// AUM and net subscription charts.
    Summary,
    /// Net subscription effects grouped by category.
    EffectsByCategory,
    /// Net subscription effects grouped by subcategory.
    EffectsBySubcategory,
    /// Net subscription effects grouped by managing company.
    EffectsByManager,
    /// Per-fund unit value returns.
    Returns,
    /// Funds missing classification data.
    UnclassifiedFunds,
    /// AUM per fund for the AUM report family.
    AumByFund,
    /// AUM history table and chart for the AUM report family.
    AumSummary,
}

/// Inputs a section reads from the data source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// Only the report date itself.
    ReportDate,
    /// Industry AUM totals by date.
    AumHistory,
    /// Net subscription totals by date.
    SubscriptionHistory,
    /// Subscription effects over several horizons.
    SubscriptionEffects,
    /// Unit value returns per fund.
    FundReturns,
    /// Fund classification catalogue.
    FundClassification,
    /// AUM per fund and family.
    FundAum,
}

/// Registry entry for a section.
#[derive(Debug)]
pub struct SectionInfo {
    /// Section identity.
    pub id: SectionId,
    /// Human readable title.
    pub title: &'static str,
    /// Datasets the section depends on.
    pub inputs: &'static [Input],
}

/// Registry entries, indexed by the discriminant of [`SectionId`].
pub const REGISTRY: &[SectionInfo] = &[
    SectionInfo {
        id: SectionId::Cover,
        title: "Portada",
        inputs: &[Input::ReportDate],
    },
    SectionInfo {
        id: SectionId::Summary,
        title: "Resumen",
        inputs: &[Input::AumHistory, Input::SubscriptionHistory],
    },
    SectionInfo {
        id: SectionId::EffectsByCategory,
        title: "Efectos por Categoria",
        inputs: &[Input::SubscriptionEffects, Input::FundClassification],
    },
    SectionInfo {
        id: SectionId::EffectsBySubcategory,
        title: "Efectos por Subcategoria",
        inputs: &[Input::SubscriptionEffects, Input::FundClassification],
    },
    SectionInfo {
        id: SectionId::EffectsByManager,
        title: "Efectos por Gerente",
        inputs: &[Input::SubscriptionEffects, Input::FundClassification],
    },
    SectionInfo {
        id: SectionId::Returns,
        title: "Rentabilidades",
        inputs: &[Input::FundReturns],
    },
    SectionInfo {
        id: SectionId::UnclassifiedFunds,
        title: "Fondos sin Clasificar",
        inputs: &[Input::FundClassification],
    },
    SectionInfo {
        id: SectionId::AumByFund,
        title: "AUM por Fondo",
        inputs: &[Input::FundAum],
    },
    SectionInfo {
        id: SectionId::AumSummary,
        title: "Resumen AUM",
        inputs: &[Input::FundAum],
    },
];

impl SectionId {
    /// Returns the registry entry for this section.
    pub fn info(self) -> &'static SectionInfo {
        &REGISTRY[self as usize]
    }

    /// Returns the display title.
    pub fn title(self) -> &'static str {
        self.info().title
    }

    /// Returns the datasets the section reads.
    pub fn inputs(self) -> &'static [Input] {
        self.info().inputs
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The two report layouts the generator knows how to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFamily {
    /// Multi-section industry report.
    #[default]
    Industry,
    /// AUM per fund report.
    AumByFund,
}

impl ReportFamily {
    /// Sections in the order they appear in the document.
    pub fn sections(self) -> &'static [SectionId] {
        match self {
            Self::Industry => &[
                SectionId::Cover,
                SectionId::Summary,
                SectionId::EffectsByCategory,
                SectionId::EffectsBySubcategory,
                SectionId::EffectsByManager,
                SectionId::Returns,
                SectionId::UnclassifiedFunds,
            ],
            Self::AumByFund => &[SectionId::AumByFund, SectionId::AumSummary],
        }
    }

    /// Title printed in the page header.
    pub fn header_title(self) -> &'static str {
        match self {
            Self::Industry => "REPORTE DE FCI",
            Self::AumByFund => "REPORTE DE AUM POR FONDO (cifras en millones)",
        }
    }

    /// File name of the generated PDF.
    ///
    /// The industry report is named after the report date; the AUM report
    /// after the generation time.
    pub fn output_file_name(self, date: NaiveDate, now: NaiveDateTime) -> String {
        match self {
            Self::Industry => format!("{} reporte fci.pdf", date.format("%Y%m%d")),
            Self::AumByFund => {
                format!("multi_report_aum_familia_{}.pdf", now.format("%Y%m%d_%H%M%S"))
            }
        }
    }
}
