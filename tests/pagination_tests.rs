mod common;

use common::{generate, generate_with, GeneratedPdf, TestResult};
use serde_json::json;
use sheaf::pipeline::{Assembler, Destination, OutputStrategy};
use sheaf::traits::{Overlay, PageEvent, PageInfo};
use std::sync::Arc;

fn three_pages() -> Vec<serde_json::Value> {
    vec![
        json!("First page"),
        json!(["pagebreak"]),
        json!("Second page"),
        json!(["pagebreak"]),
        json!("Third page"),
    ]
}

fn document(metadata: serde_json::Value) -> serde_json::Value {
    let mut items = vec![metadata];
    items.extend(three_pages());
    serde_json::Value::Array(items)
}

#[test]
fn total_page_footer_is_stamped_on_every_page() -> TestResult {
    let pdf = generate(&document(json!({"pages": true, "footer": "Page"})))?;
    assert_pdf_page_count!(pdf, 3);
    assert_eq!(pdf.summary.strategy, OutputStrategy::BufferThenStamp);
    assert_page_shows!(pdf, 1, "Page 1 / 3");
    assert_page_shows!(pdf, 2, "Page 2 / 3");
    assert_page_shows!(pdf, 3, "Page 3 / 3");
    assert!(!pdf.page_content(2).contains("(Page 2)"));
    Ok(())
}

#[test]
fn single_pass_footer_has_no_total() -> TestResult {
    let pdf = generate(&document(json!({"footer": "Page"})))?;
    assert_eq!(pdf.summary.strategy, OutputStrategy::DirectWrite);
    assert_page_shows!(pdf, 2, "Page 2");
    assert!(!pdf.page_content(2).contains(" / 3"));
    Ok(())
}

#[test]
fn custom_separator_and_start_page() -> TestResult {
    let pdf = generate(&document(json!({
        "pages": true,
        "footer": {"text": "p.", "start-page": 2, "footer-separator": " of ", "align": "center"}
    })))?;
    assert!(!pdf.page_content(1).contains("p. 1"));
    assert_page_shows!(pdf, 2, "p. 2 of 3");
    assert_page_shows!(pdf, 3, "p. 3 of 3");
    Ok(())
}

#[test]
fn disabled_footer_draws_nothing() -> TestResult {
    let pdf = generate(&document(json!({"pages": true, "footer": false})))?;
    assert_eq!(pdf.summary.strategy, OutputStrategy::DirectWrite);
    assert!(!pdf.shows("1 / 3"));
    Ok(())
}

#[test]
fn clear_double_page_inserts_a_blank_page_after_an_odd_page() -> TestResult {
    let pdf = generate(&json!([
        {"footer": false},
        "Chapter one",
        ["clear-double-page"],
        "Chapter two"
    ]))?;
    assert_pdf_page_count!(pdf, 3);
    assert_page_shows!(pdf, 1, "Chapter one");
    assert!(!pdf.page_content(2).contains("Chapter"));
    assert_page_shows!(pdf, 3, "Chapter two");
    Ok(())
}

#[test]
fn clear_double_page_after_an_even_page_only_breaks() -> TestResult {
    let pdf = generate(&json!([
        {"footer": false},
        "one",
        ["pagebreak"],
        "two",
        ["clear-double-page"],
        "three"
    ]))?;
    assert_pdf_page_count!(pdf, 3);
    assert_page_shows!(pdf, 3, "three");
    Ok(())
}

#[test]
fn pagebreak_on_an_empty_page_does_nothing() -> TestResult {
    let pdf = generate(&json!([{}, ["pagebreak"], "only", ["pagebreak"]]))?;
    assert_pdf_page_count!(pdf, 1);
    Ok(())
}

#[derive(Debug)]
struct Confidential;

impl PageEvent for Confidential {
    fn on_page(&self, page: &PageInfo, overlay: &mut Overlay) {
        let label = match page.total {
            Some(total) => format!("Confidential {} of {}", page.number, total),
            None => format!("Confidential {}", page.number),
        };
        overlay.text(&label, "Helvetica-Oblique", 8.0, 40.0, page.height - 20.0, [0.5, 0.5, 0.5]);
    }
}

#[test]
fn page_stamps_force_buffering_and_see_the_total() -> TestResult {
    let assembler = Assembler::new().with_page_stamp(Arc::new(Confidential));
    let pdf = generate_with(&assembler, &document(json!({"footer": "Page"})))?;
    assert_eq!(pdf.summary.strategy, OutputStrategy::BufferThenStamp);
    assert_page_shows!(pdf, 3, "Confidential 3 of 3");
    // Without `pages` the engine still draws its running footer.
    assert_page_shows!(pdf, 2, "Page 2");
    Ok(())
}

#[test]
fn named_page_events_run_while_pages_are_written() -> TestResult {
    let assembler = Assembler::new().with_page_event("confidential", Arc::new(Confidential));
    let pdf = generate_with(
        &assembler,
        &document(json!({"footer": false, "page-events": ["confidential"]})),
    )?;
    assert_eq!(pdf.summary.strategy, OutputStrategy::DirectWrite);
    assert_page_shows!(pdf, 1, "Confidential 1");
    assert_page_shows!(pdf, 3, "Confidential 3");
    Ok(())
}

#[test]
fn streamed_input_still_gets_the_total() -> TestResult {
    common::init_logging();
    let input = r#"
        {"pages": true, "footer": "Page"}
        "First page" ["pagebreak"] "Second page"
    "#;
    let mut bytes = Vec::new();
    let summary = Assembler::new().build_from_reader(input.as_bytes(), Destination::writer(&mut bytes))?;
    let pdf = GeneratedPdf::from_bytes(bytes, summary)?;
    assert_pdf_page_count!(pdf, 2);
    assert_page_shows!(pdf, 2, "Page 2 / 2");
    Ok(())
}

#[test]
fn letterhead_appears_only_before_the_header() -> TestResult {
    let pdf = generate(&json!([
        {"letterhead": [["paragraph", "ACME Corporation"]], "header": "Quarterly report", "footer": false},
        "Summary",
        ["pagebreak"],
        "Details"
    ]))?;
    assert_page_shows!(pdf, 1, "ACME Corporation");
    assert!(!pdf.page_content(1).contains("Quarterly report"));
    assert_page_shows!(pdf, 2, "Quarterly report");
    assert!(!pdf.page_content(2).contains("ACME"));
    Ok(())
}
