use takeoff_kit::engine::poppler::{parse_page_count, parse_version};

#[test]
fn page_count_from_pdfinfo() {
    let out = "Title:          Plan\nProducer:       AutoCAD\nPages:          12\nEncrypted:      no\n";
    assert_eq!(parse_page_count(out), Some(12));
    assert_eq!(parse_page_count("Title: x\n"), None);
}

#[test]
fn version_banner() {
    let banner = "pdftoppm version 24.02.0\nCopyright 2005-2024 The Poppler Developers\n";
    assert_eq!(parse_version(banner).as_deref(), Some("24.02.0"));
}
