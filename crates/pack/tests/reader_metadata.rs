//! Metadata reader against real packs and malformed inputs.

use packgrep_pack::{read_pack_file_list, FileInfo, PackBuilder, PackError, PACK_MAGIC};

#[test]
fn test_lists_files_in_pack_order() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("list.qgd");

    let mut builder = PackBuilder::create(&pack_path).unwrap();
    builder
        .append_file_part("a.rs", 0, b"fn a() {}\n".to_vec(), 100, 10)
        .unwrap();
    builder
        .append_file_part("b.rs", 0, b"fn b() {}\n".to_vec(), 200, 10)
        .unwrap();
    builder
        .append_file_part("c.rs", 0, b"fn c() {}\n".to_vec(), 300, 10)
        .unwrap();
    builder.finish().unwrap();

    let files = read_pack_file_list(&pack_path).unwrap();
    assert_eq!(
        files,
        vec![
            FileInfo {
                path: "a.rs".into(),
                timestamp: 100,
                file_size: 10
            },
            FileInfo {
                path: "b.rs".into(),
                timestamp: 200,
                file_size: 10
            },
            FileInfo {
                path: "c.rs".into(),
                timestamp: 300,
                file_size: 10
            },
        ]
    );
}

#[test]
fn test_split_file_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("split.qgd");

    let body: Vec<u8> = b"0123456789012345678\n".repeat(60); // 1200 bytes
    let mut builder = PackBuilder::with_chunk_size(&pack_path, 300).unwrap();
    builder
        .append_file_part("wide.txt", 0, body.clone(), 42, body.len() as u64)
        .unwrap();
    builder
        .append_file_part("small.txt", 0, b"x\n".to_vec(), 43, 2)
        .unwrap();
    builder.finish().unwrap();

    let files = read_pack_file_list(&pack_path).unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(names, vec!["wide.txt", "small.txt"]);
    assert_eq!(files[0].timestamp, 42);
    assert_eq!(files[0].file_size, body.len() as u64);
}

#[test]
fn test_empty_pack_has_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("empty.qgd");

    let builder = PackBuilder::create(&pack_path).unwrap();
    builder.finish().unwrap();

    assert_eq!(read_pack_file_list(&pack_path).unwrap(), vec![]);
}

#[test]
fn test_rejects_unknown_magic() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("stale.qgd");
    std::fs::write(&pack_path, b"OLDPACK0no chunks here").unwrap();

    match read_pack_file_list(&pack_path) {
        Err(PackError::FormatMismatch { .. }) => {}
        other => panic!("expected FormatMismatch, got {other:?}"),
    }
}

#[test]
fn test_rejects_truncated_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("cut.qgd");

    let mut builder = PackBuilder::create(&pack_path).unwrap();
    builder
        .append_file_part("a.rs", 0, b"fn a() {}\n".repeat(50), 1, 500)
        .unwrap();
    builder.finish().unwrap();

    let mut raw = std::fs::read(&pack_path).unwrap();
    raw.truncate(raw.len() - 5);
    std::fs::write(&pack_path, &raw).unwrap();

    match read_pack_file_list(&pack_path) {
        Err(PackError::Corrupt { .. }) => {}
        other => panic!("expected Corrupt, got {other:?}"),
    }
}

#[test]
fn test_rejects_header_only_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("frag.qgd");

    let mut raw = PACK_MAGIC.to_vec();
    raw.extend_from_slice(&[7u8; 12]); // half a chunk header
    std::fs::write(&pack_path, &raw).unwrap();

    match read_pack_file_list(&pack_path) {
        Err(PackError::Corrupt { .. }) => {}
        other => panic!("expected Corrupt, got {other:?}"),
    }
}
