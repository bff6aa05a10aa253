//! Methods for reading and writing files

use std::{io, path};

use fs_err as fs;

/// Returns contents of a file at `path`
///
/// # Errors
///
/// The file does not exist or cannot be read. The error message includes the path.
pub(crate) fn read_file(path: &path::Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Writes `contents` into a file at `path`, creating missing parent directories
///
/// # Errors
///
/// A directory or the file cannot be created or written.
pub(crate) fn write_file(path: &path::Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

#[test]
fn write_then_read_creates_parents() {
    let dir = std::env::temp_dir().join(format!("regfilegen-util-{}", std::process::id()));
    let file = dir.join("nested").join("out.vhd");

    write_file(&file, "entity x is end;").unwrap();
    assert_eq!(read_file(&file).unwrap(), "entity x is end;");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_error_names_path() {
    let err = read_file(path::Path::new("/nonexistent/regfilegen/decl.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/regfilegen/decl.json"));
}
