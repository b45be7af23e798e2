mod support;

use fci_report::layout::{LayoutElement, ParagraphRole};
use fci_report::sections::{self, ReportContext, SubReportError};
use fci_report::{ReportFamily, SectionId};
use rust_decimal_macros::dec;
use support::{
    dated_totals, fund_aum, report_date, scratch_dir, FailingChartRenderer, FakeFundData,
    FileChartRenderer,
};

fn notices(elements: &[LayoutElement]) -> Vec<&str> {
    elements
        .iter()
        .filter_map(|element| match element {
            LayoutElement::Paragraph(paragraph) if *paragraph.role() == ParagraphRole::Notice => {
                Some(paragraph.text())
            }
            _ => None,
        })
        .collect()
}

fn all_sections() -> impl Iterator<Item = SectionId> {
    ReportFamily::Industry
        .sections()
        .iter()
        .chain(ReportFamily::AumByFund.sections())
        .copied()
}

#[test]
fn empty_datasets_yield_exactly_one_placeholder() {
    let data = FakeFundData::default();
    let charts = FailingChartRenderer;
    let ctx = ReportContext::new(&data, &charts);

    for id in all_sections().filter(|id| *id != SectionId::Cover) {
        let elements = sections::build(id)
            .generate(&ctx, report_date())
            .unwrap_or_else(|err| panic!("{id} failed: {err}"));
        assert_eq!(elements, vec![sections::no_data(id)], "{id}");
    }
}

#[test]
fn cover_needs_no_data() {
    let data = FakeFundData::default().failing("aum_history");
    let charts = FailingChartRenderer;
    let elements = sections::build(SectionId::Cover)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect("cover is static");
    assert!(elements.iter().any(|element| match element {
        LayoutElement::Paragraph(paragraph) => paragraph.text() == "Datos al 2025-03-13",
        _ => false,
    }));
    assert!(elements.iter().all(|element| element.as_of_marker().is_none()));
}

#[test]
fn failing_query_is_reported_as_an_error() {
    let charts = FailingChartRenderer;
    let cases = [
        (SectionId::Summary, "aum_history"),
        (SectionId::Summary, "subscription_history"),
        (SectionId::EffectsByCategory, "subscription_effects"),
        (SectionId::EffectsBySubcategory, "subscription_effects"),
        (SectionId::EffectsByManager, "subscription_effects"),
        (SectionId::Returns, "fund_returns"),
        (SectionId::UnclassifiedFunds, "unclassified_funds"),
        (SectionId::AumByFund, "aum_by_fund"),
        (SectionId::AumSummary, "family_aum_history"),
    ];

    for (id, query) in cases {
        let data = FakeFundData {
            aum_history: dated_totals(6, dec!(45000000000000)),
            ..FakeFundData::default()
        }
        .failing(query);
        let err = sections::build(id)
            .generate(&ReportContext::new(&data, &charts), report_date())
            .expect_err("query fails");
        assert!(
            matches!(err, SubReportError::Query(_)),
            "{id} with {query} failing: {err}"
        );
        assert!(err.to_string().contains(query), "{id}: {err}");
    }
}

#[test]
fn summary_query_failure_draws_no_chart() {
    let data = FakeFundData {
        aum_history: dated_totals(6, dec!(45000000000000)),
        ..FakeFundData::default()
    }
    .failing("subscription_history");
    let dir = scratch_dir("sections_no_stray_chart");
    let charts = FileChartRenderer::new(&dir);

    sections::build(SectionId::Summary)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect_err("subscription query fails");

    assert_eq!(charts.calls.get(), 0);
    assert!(!dir.join("aum_chart.png").exists());

    std::fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn summary_chart_failures_become_notices() {
    let data = FakeFundData {
        aum_history: dated_totals(6, dec!(45000000000000)),
        subscription_history: dated_totals(6, dec!(-1500)),
        ..FakeFundData::default()
    };
    let charts = FailingChartRenderer;

    let elements = sections::build(SectionId::Summary)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect("chart errors stay inside the section");

    let notices = notices(&elements);
    assert_eq!(notices.len(), 3, "{notices:?}");
    assert!(notices[0].starts_with("AUM chart failed:"));
    assert!(notices[1].starts_with("Subscriptions chart failed:"));
    assert_eq!(notices[2], "No charts generated.");
    assert!(elements.iter().all(|element| element.scratch_files().is_empty()));
}

#[test]
fn summary_without_subscriptions_keeps_the_aum_chart() {
    let data = FakeFundData {
        aum_history: dated_totals(6, dec!(45000000000000)),
        ..FakeFundData::default()
    };
    let dir = scratch_dir("sections_single_chart");
    let charts = FileChartRenderer::new(&dir);

    let elements = sections::build(SectionId::Summary)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect("summary renders");

    assert_eq!(notices(&elements), vec!["No Subscriptions data available."]);
    let images: Vec<_> = elements
        .iter()
        .filter_map(|element| match element {
            LayoutElement::Image(image) => Some(image),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].path(), dir.join("aum_chart.png"));
    assert!(images[0].caption().is_some());

    std::fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn aum_summary_chart_failure_keeps_the_table() {
    let data = FakeFundData {
        family_history: dated_totals(30, dec!(2500000000)),
        ..FakeFundData::default()
    };
    let charts = FailingChartRenderer;

    let elements = sections::build(SectionId::AumSummary)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect("chart errors stay inside the section");

    let table = elements
        .iter()
        .find_map(|element| match element {
            LayoutElement::Table(table) => Some(table),
            _ => None,
        })
        .expect("history table");
    assert_eq!(table.rows().len(), 30);
    assert_eq!(table.rows()[0][0], "2025-03-13");
    let notices = notices(&elements);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].starts_with("Chart failed:"));
}

#[test]
fn aum_by_fund_strips_manager_suffix() {
    let data = FakeFundData {
        aum_by_fund: vec![
            fund_aum("Familia Uno", "Gestora Andina S.A."),
            fund_aum("Familia Dos", "Fondos del Sur SGFCISA"),
        ],
        ..FakeFundData::default()
    };
    let charts = FailingChartRenderer;

    let elements = sections::build(SectionId::AumByFund)
        .generate(&ReportContext::new(&data, &charts), report_date())
        .expect("aum by fund renders");

    match &elements[0] {
        LayoutElement::Heading(heading) => {
            assert_eq!(heading.text(), "AUM por Fondo (Total: 5.000 millones)")
        }
        other => panic!("expected heading, got {other:?}"),
    }
    let table = elements
        .iter()
        .find_map(|element| match element {
            LayoutElement::Table(table) => Some(table),
            _ => None,
        })
        .expect("fund table");
    assert_eq!(table.rows()[0][4], "Gestora Andina");
    assert_eq!(table.rows()[1][4], "Fondos del Sur");
}
