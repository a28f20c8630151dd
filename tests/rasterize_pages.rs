mod common;

use common::{files_in, FakeRasterizer};
use takeoff_kit::{
    config::PageFormat,
    page_range::PageRange,
    rasterize::{page_file_name, ConvertOptions, PageConverter},
};

fn opts(out: &std::path::Path, pages: Option<PageRange>) -> ConvertOptions {
    ConvertOptions {
        output_dir: out.to_path_buf(),
        pages,
        dpi: 300,
        format: PageFormat::Png,
    }
}

#[test]
fn page_names_are_zero_padded() {
    assert_eq!(page_file_name("plan", 2, PageFormat::Png), "plan_page_002.png");
    assert_eq!(page_file_name("a.b", 12, PageFormat::Jpeg), "a.b_page_012.jpg");
}

#[test]
fn all_pages_one_file_each() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = tmp.path().join("plan.pdf");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    let out = tmp.path().join("holding");

    let conv = PageConverter::new(opts(&out, None), FakeRasterizer::new(3));
    let report = conv.convert(&pdf).unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(
        files_in(&out),
        vec!["plan_page_001.png", "plan_page_002.png", "plan_page_003.png"]
    );
}

#[test]
fn single_page_selection() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = tmp.path().join("plan.pdf");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    let out = tmp.path().join("holding");

    let conv = PageConverter::new(
        opts(&out, Some(PageRange::parse("2").unwrap())),
        FakeRasterizer::new(3),
    );
    conv.convert(&pdf).unwrap();

    assert_eq!(files_in(&out), vec!["plan_page_002.png"]);
}

#[test]
fn range_past_end_is_clamped_and_start_past_end_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = tmp.path().join("plan.pdf");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    let out = tmp.path().join("holding");

    let clamped = PageConverter::new(
        opts(&out, Some(PageRange::parse("2-9").unwrap())),
        FakeRasterizer::new(3),
    );
    let report = clamped.convert(&pdf).unwrap();
    assert_eq!(report.pages, PageRange { first: 2, last: 3 });

    let past = PageConverter::new(
        opts(&out, Some(PageRange::parse("5").unwrap())),
        FakeRasterizer::new(3),
    );
    assert!(past.convert(&pdf).is_err());
}

#[test]
fn missing_input_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("holding");
    let rasterizer = FakeRasterizer::new(3);
    let rendered = rasterizer.rendered.clone();
    let conv = PageConverter::new(opts(&out, None), rasterizer);

    let err = conv.convert(&tmp.path().join("nope.pdf")).unwrap_err();
    assert!(err.to_string().contains("PDF not found"));
    assert!(!out.exists());
    assert!(rendered.borrow().is_empty());

    assert!(conv.convert_batch(&tmp.path().join("no-dir")).is_err());
    assert!(!out.exists());
}

#[test]
fn batch_continues_past_failing_document() {
    let tmp = tempfile::tempdir().unwrap();
    let pdfs = tmp.path().join("pdfs");
    std::fs::create_dir_all(&pdfs).unwrap();
    std::fs::write(pdfs.join("a.pdf"), b"%PDF").unwrap();
    std::fs::write(pdfs.join("broken.pdf"), b"junk").unwrap();
    std::fs::write(pdfs.join("c.PDF"), b"%PDF").unwrap();
    std::fs::write(pdfs.join("notes.txt"), b"x").unwrap();
    let out = tmp.path().join("holding");

    let conv = PageConverter::new(opts(&out, None), FakeRasterizer::new(1));
    let report = conv.convert_batch(&pdfs).unwrap();

    assert_eq!(report.found, 3);
    assert_eq!(report.converted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].input.ends_with("broken.pdf"));
    assert_eq!(files_in(&out), vec!["a_page_001.png", "c_page_001.png"]);
}

#[test]
fn batch_without_pdfs_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let conv = PageConverter::new(opts(&tmp.path().join("out"), None), FakeRasterizer::new(1));
    let err = conv.convert_batch(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("no PDF files"));
}
