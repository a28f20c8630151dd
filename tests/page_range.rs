use takeoff_kit::page_range::PageRange;

#[test]
fn single_page() {
    let r = PageRange::parse("3").unwrap();
    assert_eq!(r, PageRange { first: 3, last: 3 });
    assert_eq!(r.len(), 1);
}

#[test]
fn inclusive_range() {
    let r = PageRange::parse("1-5").unwrap();
    assert_eq!((r.first, r.last), (1, 5));
    assert_eq!(r.pages().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(r.to_string(), "1-5");
}

#[test]
fn rejects_malformed_ranges() {
    for bad in ["", "abc", "1,3,5", "1-", "-4", "1-2-3", "0", "0-2", "5-3", "2.5", "+1"] {
        assert!(PageRange::parse(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn all_pages() {
    assert_eq!(PageRange::all(7), PageRange { first: 1, last: 7 });
}
