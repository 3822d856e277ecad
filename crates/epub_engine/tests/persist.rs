use std::fs;

use epub_engine::{ensure_output_dir, epub_filename, AtomicFileWriter, PersistError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("books").join("2024");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn rewriting_a_book_replaces_it_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_bytes("book.epub", b"PK\x03\x04one").unwrap();
    assert_eq!(first.file_name().unwrap(), "book.epub");
    assert_eq!(fs::read(&first).unwrap(), b"PK\x03\x04one");

    let second = writer.write_bytes("book.epub", b"PK\x03\x04two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"PK\x03\x04two");

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["book.epub"]);
}

#[test]
fn output_path_that_is_a_file_fails_without_writing() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let err = writer.write_bytes("book.epub", b"data").unwrap_err();
    assert!(matches!(err, PersistError::OutputDir(_)));
    assert!(!file_path.with_file_name("book.epub").exists());
}

#[test]
fn failed_replace_names_the_book_and_leaves_no_temp_file() {
    let temp = TempDir::new().unwrap();
    let blocked = temp.path().join("book.epub");
    fs::create_dir(&blocked).unwrap();

    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    match writer.write_bytes("book.epub", b"PK\x03\x04") {
        Err(PersistError::Replace { path, .. }) => assert_eq!(path, blocked),
        other => panic!("expected a replace error, got {other:?}"),
    }
    assert!(blocked.is_dir());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn filenames_are_windows_safe() {
    assert_eq!(epub_filename("Rust: A <Guide>?"), "Rust_ A _Guide.epub");
    assert_eq!(epub_filename("深度学习入门"), "深度学习入门.epub");
    assert_eq!(epub_filename("  ...  "), "untitled.epub");
    assert_eq!(epub_filename("con"), "con_.epub");
    assert_eq!(epub_filename("a//b"), "a_b.epub");

    let long = "x".repeat(200);
    assert_eq!(epub_filename(&long), format!("{}.epub", "x".repeat(80)));
}
