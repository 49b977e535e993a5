use aurine_docs::export::{
    CaptureOptions, ExportFormat, FlowRenderer, RasterRenderer, Rasterizer, Renderer,
};
use aurine_docs::fonts::{self, FontSet};
use aurine_docs::model::{Block, Document, Orientation, PageLayout};
use aurine_docs::records::MetricsRecord;
use aurine_docs::templates::{report, RenderContext};
use aurine_docs::Error;
use chrono::NaiveDate;
use image::GenericImageView;
use sha2::{Digest, Sha256};

fn sample_record() -> MetricsRecord {
    MetricsRecord {
        client_name: "Salon Bella".into(),
        city: "Kraków".into(),
        period: "Listopad 2025".into(),
        budget: "3500".into(),
        impressions: "180000".into(),
        reach: "85000".into(),
        clicks: "3500".into(),
        ctr: "1.94".into(),
        conversions: "245".into(),
        cost_per_conversion: "14.29".into(),
        bookings: "178".into(),
        weekly_reach_data: Some("15000,19000,25000,26000".into()),
        weekly_clicks_data: Some("650,820,1100,930".into()),
        ..MetricsRecord::default()
    }
}

fn sample_report(orientation: Orientation) -> Document {
    let context = RenderContext::new(NaiveDate::from_ymd_opt(2025, 11, 30).expect("date"));
    report::render(&sample_record(), orientation, &context)
}

fn flow_renderer() -> Option<FlowRenderer> {
    if !fonts::default_fonts_available() {
        return None;
    }
    let fonts = FontSet::discover(None).expect("load bundled fonts");
    Some(FlowRenderer::new(fonts).expect("flow renderer"))
}

fn render_flow_pdf() -> Option<Vec<u8>> {
    let renderer = flow_renderer()?;
    let file = renderer
        .render(&sample_report(Orientation::Portrait), ExportFormat::Pdf)
        .expect("render sample pdf");
    Some(file.bytes)
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("parse pdf")
        .get_pages()
        .len()
}

// Blanks every byte between `open` and `close` that is not structural, so timestamps and
// document ids do not affect the hash.
fn blank_between(data: &mut [u8], open: &[u8], close: &[u8], keep: &[u8]) {
    let mut from = 0;
    while let Some(found) = find(&data[from..], open) {
        let start = from + found + open.len();
        let Some(length) = find(&data[start..], close) else {
            break;
        };
        for byte in &mut data[start..start + length] {
            if !keep.contains(byte) {
                *byte = b'0';
            }
        }
        from = start + length + close.len();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    let mut data = bytes.to_vec();
    for key in ["/CreationDate(", "/ModDate(", "/Producer("] {
        blank_between(&mut data, key.as_bytes(), b")", b"");
    }
    blank_between(&mut data, b"/ID[", b"]", b"<> \r\n\t");
    for tag in [
        "xmp:CreateDate",
        "xmp:ModifyDate",
        "xmp:MetadataDate",
        "xmpMM:DocumentID",
        "xmpMM:InstanceID",
        "xmpMM:VersionID",
    ] {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        blank_between(&mut data, open.as_bytes(), close.as_bytes(), b"");
    }
    data
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn tall_documents_are_tiled_onto_pages() {
    let document = Document::new("Tall", PageLayout::PORTRAIT)
        .with_min_height(1400.0)
        .with_block(Block::heading("Raport", 28.0));
    let renderer = RasterRenderer::new(Rasterizer::without_fonts())
        .with_options(CaptureOptions::for_format(ExportFormat::Pdf).with_pixel_ratio(1.0));

    let file = renderer
        .render(&document, ExportFormat::Pdf)
        .expect("render pdf");
    assert_eq!(file.pages, 2);
    assert_eq!(page_count(&file.bytes), 2);
}

#[test]
fn report_page_count_follows_content_height() {
    let rasterizer = Rasterizer::without_fonts();
    let document = sample_report(Orientation::Portrait);
    let height = rasterizer.layout(&document, true).expect("layout").height();
    let expected = (height / PageLayout::PORTRAIT.height).ceil() as usize;

    let renderer = RasterRenderer::new(rasterizer)
        .with_options(CaptureOptions::for_format(ExportFormat::Pdf).with_pixel_ratio(1.0));
    let file = renderer
        .render(&document, ExportFormat::Pdf)
        .expect("render pdf");
    assert!(expected >= 2, "portrait reports are at least 1400px tall");
    assert_eq!(file.pages, expected);
    assert_eq!(page_count(&file.bytes), expected);
}

#[test]
fn landscape_report_png_has_slide_width() {
    let renderer = RasterRenderer::new(Rasterizer::without_fonts());
    let file = renderer
        .render(&sample_report(Orientation::Landscape), ExportFormat::Png)
        .expect("render png");
    let image = image::load_from_memory(&file.bytes).expect("decode png");
    assert_eq!(image.width(), 3200);
    assert!(image.height() >= 1800);
}

#[test]
fn flow_backend_renders_pdf_only() {
    let Some(renderer) = flow_renderer() else {
        eprintln!(
            "Skipping flow_backend_renders_pdf_only: bundled fonts missing. Set AURINE_FONTS_DIR or copy assets/fonts next to the binary."
        );
        return;
    };
    let document = sample_report(Orientation::Portrait);
    let err = renderer
        .render(&document, ExportFormat::Png)
        .expect_err("png is raster only");
    assert!(matches!(err, Error::Unsupported(_)));

    let file = renderer
        .render(&document, ExportFormat::Pdf)
        .expect("render pdf");
    assert!(!file.bytes.is_empty());
    assert_eq!(page_count(&file.bytes), file.pages);
}

#[test]
fn flow_rendering_is_deterministic() {
    let Some(bytes_a) = render_flow_pdf() else {
        eprintln!(
            "Skipping flow_rendering_is_deterministic: bundled fonts missing. Set AURINE_FONTS_DIR or copy assets/fonts next to the binary."
        );
        return;
    };
    let Some(bytes_b) = render_flow_pdf() else {
        return;
    };

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}
