mod common;

use common::{build_error, generate, generate_with, GeneratedPdf, TestResult};
use serde_json::json;
use sheaf::pipeline::{Assembler, Destination, DocumentConfig};
use sheaf::traits::{InMemoryResourceProvider, ResourceError};
use sheaf::{CompileError, PipelineError};
use std::sync::Arc;

#[test]
fn metadata_reaches_the_info_dictionary() -> TestResult {
    let pdf = generate(&json!([
        {"title": "Annual Report", "author": "Finance", "doc-header": ["Department", "Treasury"]},
        "Body"
    ]))?;
    assert_eq!(pdf.info("Title").as_deref(), Some("Annual Report"));
    assert_eq!(pdf.info("Author").as_deref(), Some("Finance"));
    assert_eq!(pdf.info("Department").as_deref(), Some("Treasury"));
    Ok(())
}

#[test]
fn page_size_and_orientation_shape_the_media_box() -> TestResult {
    let pdf = generate(&json!([{"size": "letter", "orientation": "landscape"}, "Wide"]))?;
    let page_id = pdf.doc.get_pages()[&1];
    let media_box = pdf
        .doc
        .get_dictionary(page_id)?
        .get(b"MediaBox")?
        .as_array()?
        .iter()
        .map(|n| n.as_float().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(media_box, vec![0.0, 0.0, 792.0, 612.0]);
    Ok(())
}

#[test]
fn headings_lists_and_tables_are_drawn() -> TestResult {
    let pdf = generate(&json!([
        {"footer": false},
        ["heading", "Summary"],
        ["list", {"numbered": true}, "Revenue", "Costs"],
        ["table", {"header": ["Region", "Total"]}, ["North", "120"], ["South", "80"]],
        [":paragraph.note", "Done"]
    ]))?;
    assert_page_shows!(pdf, 1, "Summary");
    assert_page_shows!(pdf, 1, "1.");
    assert_page_shows!(pdf, 1, "Costs");
    assert_page_shows!(pdf, 1, "North");
    assert_page_shows!(pdf, 1, "Done");
    Ok(())
}

#[test]
fn chapters_and_sections_are_numbered() -> TestResult {
    let pdf = generate(&json!([
        {"footer": false},
        ["chapter", "Introduction", ["section", "Scope", "text"], ["section", "Terms", "text"]],
        ["chapter", "Results", ["section", "Revenue", "text"]]
    ]))?;
    assert!(pdf.shows("1. Introduction"));
    assert!(pdf.shows("1.2. Terms"));
    assert!(pdf.shows("2.1. Revenue"));
    Ok(())
}

#[test]
fn references_are_shared_across_the_build() -> TestResult {
    let pdf = generate(&json!([
        {"references": {"sig": ["paragraph", "Signed, the board"]}, "footer": false},
        ["reference", "sig"],
        ["pagebreak"],
        ["reference", ":sig"]
    ]))?;
    assert_page_shows!(pdf, 1, "Signed, the board");
    assert_page_shows!(pdf, 2, "Signed, the board");
    assert_eq!(pdf.summary.cache.misses, 1);
    assert_eq!(pdf.summary.cache.hits, 1);
    Ok(())
}

#[test]
fn stylesheet_classes_apply_to_tokens() -> TestResult {
    let pdf = generate(&json!([
        {"stylesheet": {"loud": {"family": "courier", "style": "bold"}}, "footer": false},
        ["paragraph.loud", "Attention"]
    ]))?;
    assert!(pdf.page_content(1).contains("Courier"));
    assert_page_shows!(pdf, 1, "Attention");
    Ok(())
}

#[test]
fn unknown_tags_fail_the_build() {
    let err = build_error(&json!([{}, "fine", ["marquee", "no"]]));
    assert!(matches!(err, PipelineError::Compile(CompileError::UnknownTag { ref tag, .. }) if tag == "marquee"));
}

#[test]
fn unresolved_references_fail_the_build() {
    let err = build_error(&json!([{}, ["reference", "missing"]]));
    assert!(matches!(err, PipelineError::Compile(CompileError::UnresolvedReference { .. })));
}

#[test]
fn circular_references_fail_the_build() {
    let err = build_error(&json!([
        {"references": {"loop": ["paragraph", "again", ["reference", "loop"]]}},
        ["reference", "loop"]
    ]));
    assert!(matches!(err, PipelineError::Compile(CompileError::ReferenceCycle { ref id, .. }) if id == "loop"));
}

#[test]
fn unregistered_page_events_fail_the_build() {
    let err = build_error(&json!([{"page-events": ["stamp"]}, "body"]));
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn missing_images_report_the_resource() {
    let err = build_error(&json!([{}, ["image", "nowhere/logo.png"]]));
    assert!(matches!(
        err,
        PipelineError::Compile(CompileError::Resource(ResourceError::NotFound(ref path))) if path == "nowhere/logo.png"
    ));
}

#[test]
fn images_come_from_the_configured_provider() -> TestResult {
    let mut png = Vec::new();
    image::RgbImage::new(8, 8).write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
    let assembler = Assembler::new()
        .with_resource_provider(Arc::new(InMemoryResourceProvider::new().with("logo.png", png.clone())))
        .with_bitmap("seal", png);
    let pdf = generate_with(
        &assembler,
        &json!([{"footer": false}, ["image", "logo.png"], ["image", {"handle": "seal"}]]),
    )?;
    assert_pdf_page_count!(pdf, 1);
    Ok(())
}

#[test]
fn path_destinations_are_written_and_flushed() -> TestResult {
    common::init_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out").join("report.pdf");
    let summary = Assembler::new().build(&json!([{}, "Hello"]), Destination::path(&path))?;
    let pdf = GeneratedPdf::from_bytes(std::fs::read(&path)?, summary)?;
    assert_pdf_page_count!(pdf, 1);
    assert_page_shows!(pdf, 1, "Hello");
    Ok(())
}

#[test]
fn failed_builds_leave_the_writer_usable() {
    common::init_logging();
    let mut bytes = b"prefix".to_vec();
    let result = Assembler::new().build(&json!([{}, ["nope"]]), Destination::writer(&mut bytes));
    assert!(result.is_err());
    assert!(bytes.starts_with(b"prefix"));
}

#[test]
fn items_can_be_pulled_lazily() -> TestResult {
    common::init_logging();
    let config = DocumentConfig::from_value(&json!({"pages": true, "footer": "Page"}))?;
    let items = (1..=3).flat_map(|n| {
        let mut page = vec![json!(format!("Entry {}", n))];
        if n < 3 {
            page.push(json!(["pagebreak"]));
        }
        page
    });
    let mut bytes = Vec::new();
    let summary = Assembler::new().build_items(&config, items, Destination::writer(&mut bytes))?;
    let pdf = GeneratedPdf::from_bytes(bytes, summary)?;
    assert_eq!(pdf.summary.pages, 3);
    assert_page_shows!(pdf, 3, "Entry 3");
    assert_page_shows!(pdf, 3, "Page 3 / 3");
    Ok(())
}

#[test]
fn grouped_items_are_flattened() -> TestResult {
    let pdf = generate(&json!([
        {"footer": false},
        [["paragraph", "Grouped one"], ["pagebreak"], "Grouped two"]
    ]))?;
    assert_pdf_page_count!(pdf, 2);
    assert_page_shows!(pdf, 2, "Grouped two");
    Ok(())
}
