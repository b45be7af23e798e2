mod support;

use std::path::PathBuf;

use fci_report::chart::RasterChartRenderer;
use fci_report::composer::remove_scratch_files;
use fci_report::config::ReportConfig;
use fci_report::fonts::AssetPaths;
use fci_report::render::{DocumentRenderer, PdfRenderer};
use fci_report::sections::ReportContext;
use fci_report::{Composer, Document, ReportFamily};
use image::{ImageFormat, Rgb, RgbImage};
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};
use support::{
    dated_totals, effect_row, fund_return, report_date, scratch_dir, FailingChartRenderer,
    FakeFundData,
};

/// Fonts come from `FCI_REPORT_ASSETS_DIR`; the logo is generated per run.
fn assets(dir: &std::path::Path) -> Option<AssetPaths> {
    let assets_dir = std::env::var_os("FCI_REPORT_ASSETS_DIR").map(PathBuf::from)?;
    let config = ReportConfig {
        assets_dir,
        ..ReportConfig::default()
    };
    let mut paths = AssetPaths::from_config(&config);
    if !paths.fonts_available() {
        return None;
    }

    let logo = dir.join("logo.png");
    RgbImage::from_pixel(120, 40, Rgb([0, 51, 102]))
        .save_with_format(&logo, ImageFormat::Png)
        .expect("write logo");
    paths.logo = logo;
    Some(paths)
}

fn renderer(assets: AssetPaths) -> PdfRenderer {
    PdfRenderer::new(
        assets,
        ReportFamily::Industry.header_title(),
        support::ymd(2025, 3, 14),
    )
}

fn sample_data() -> FakeFundData {
    FakeFundData {
        aum_history: dated_totals(6, dec!(45000000000000)),
        subscription_history: dated_totals(6, dec!(-1500)),
        effects: vec![effect_row("Renta Fija"), effect_row("Renta Variable")],
        returns: (0..80).map(|i| fund_return(&format!("Fondo {i:02}"))).collect(),
        ..FakeFundData::default()
    }
}

fn sample_document(dir: &std::path::Path) -> Document {
    let charts = RasterChartRenderer::new(dir);
    Composer::for_family(ReportFamily::Industry)
        .compose(&ReportContext::new(&sample_data(), &charts), report_date())
}

/// Same report with chart notices instead of images, so the logo is the
/// only image on each page. printpdf writes a page's images in hash order.
fn chart_free_document() -> Document {
    Composer::for_family(ReportFamily::Industry).compose(
        &ReportContext::new(&sample_data(), &FailingChartRenderer),
        report_date(),
    )
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    // Blanks the value following `tag` up to `terminator`.
    fn blank_after(data: &mut [u8], tag: &[u8], terminator: &[u8]) {
        let mut offset = 0;
        while let Some(found) = data[offset..]
            .windows(tag.len())
            .position(|window| window == tag)
        {
            let start = offset + found + tag.len();
            let Some(length) = data[start..]
                .windows(terminator.len())
                .position(|window| window == terminator)
            else {
                break;
            };
            for byte in &mut data[start..start + length] {
                if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                    *byte = b'0';
                }
            }
            offset = start + length;
        }
    }

    let mut normalized = bytes.to_vec();
    blank_after(&mut normalized, b"/CreationDate(", b")");
    blank_after(&mut normalized, b"/ModDate(", b")");
    blank_after(&mut normalized, b"/ID[", b"]");
    blank_after(&mut normalized, b"/Producer(", b")");
    for tag in [
        "xmp:CreateDate",
        "xmp:ModifyDate",
        "xmp:MetadataDate",
        "xmpMM:DocumentID",
        "xmpMM:InstanceID",
        "xmpMM:VersionID",
    ] {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        blank_after(&mut normalized, open.as_bytes(), close.as_bytes());
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn renders_the_industry_report() {
    let dir = scratch_dir("rendering_full");
    let Some(assets) = assets(&dir) else {
        eprintln!("Skipping renders_the_industry_report: set FCI_REPORT_ASSETS_DIR to the report fonts.");
        return;
    };
    let document = sample_document(&dir);
    let output = dir.join("out").join("20250313 reporte fci.pdf");

    renderer(assets)
        .render(&document, &output)
        .expect("render report");

    let bytes = std::fs::read(&output).expect("read report");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(!dir.join("out").join("20250313 reporte fci.pdf.part").exists());

    remove_scratch_files(&document);
    std::fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn rendering_is_deterministic() {
    let dir = scratch_dir("rendering_determinism");
    let Some(assets) = assets(&dir) else {
        eprintln!("Skipping rendering_is_deterministic: set FCI_REPORT_ASSETS_DIR to the report fonts.");
        return;
    };
    let document = chart_free_document();
    assert!(document.scratch_files().is_empty());
    let renderer = renderer(assets);

    let first = renderer.render_bytes(&document).expect("first render");
    let second = renderer.render_bytes(&document).expect("second render");
    assert_eq!(first.len(), second.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&first),
        normalized_hash(&second),
        "PDF renders must be deterministic after metadata normalization"
    );

    std::fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn missing_fonts_fail_without_writing() {
    let dir = scratch_dir("rendering_missing_fonts");
    let assets = AssetPaths {
        regular_font: dir.join("missing-regular.ttf"),
        bold_font: dir.join("missing-bold.ttf"),
        logo: dir.join("missing-logo.png"),
    };
    let output = dir.join("report.pdf");

    let err = renderer(assets)
        .render(&Document::new(), &output)
        .expect_err("fonts are missing");
    assert!(err.to_string().contains("fonts"), "{err}");
    assert!(!output.exists());

    std::fs::remove_dir_all(dir).expect("cleanup");
}

#[cfg(feature = "bookmarks")]
#[test]
fn bookmarks_add_an_outline() {
    let dir = scratch_dir("rendering_bookmarks");
    let Some(assets) = assets(&dir) else {
        eprintln!("Skipping bookmarks_add_an_outline: set FCI_REPORT_ASSETS_DIR to the report fonts.");
        return;
    };
    let document = sample_document(&dir);

    let bytes = renderer(assets)
        .with_bookmarks(true)
        .render_bytes(&document)
        .expect("render with bookmarks");
    let parsed = lopdf::Document::load_mem(&bytes).expect("valid pdf");
    let catalog = parsed.catalog().expect("catalog");
    assert!(catalog.has(b"Outlines"));

    remove_scratch_files(&document);
    std::fs::remove_dir_all(dir).expect("cleanup");
}
