pub fn format_size(sz: u64) -> String {
    format!("{}B ({})", sz, humansize::format_size(sz, humansize::BINARY))
}

#[test]
fn test_format_size() {
    let s = format_size(0x40010);

    assert!(s.starts_with("262160B ("));
    assert!(s.contains("KiB"));
}
