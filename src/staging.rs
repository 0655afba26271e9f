use chrono::Local;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::photo::MessageId;
use crate::error::Error;

/// Timestamp component of staged file names, one per pipeline run.
pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn ensure_staging_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`, so a
/// remote-supplied filename cannot escape the staging directory.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Compose `{timestamp}_{message_id}[_{index}]_{sanitized}`. The embedded
/// timestamp and UID keep names unique across messages within a run.
pub fn unique_name(
    timestamp: &str,
    id: MessageId,
    index: Option<usize>,
    filename: &str,
) -> String {
    let safe = sanitize_filename(filename);
    match index {
        Some(i) => format!("{timestamp}_{id}_{i}_{safe}"),
        None => format!("{timestamp}_{id}_{safe}"),
    }
}

/// Write bytes under `name` in the staging directory, never overwriting: an
/// existing target gets a numeric prefix so the extension stays intact.
pub fn write_staged(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
    let mut path = dir.join(name);
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{n}_{name}"));
        n += 1;
    }
    fs::write(&path, bytes)?;
    debug!("staged {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("photo_01.JPG"), "photo_01.JPG");
        assert_eq!(sanitize_filename("week-3.png"), "week-3.png");
    }

    #[test]
    fn sanitize_replaces_everything_else() {
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("a/b\\c:d.png"), "a_b_c_d.png");
        assert_eq!(sanitize_filename("fête.jpg"), "f_te.jpg");
    }

    #[test]
    fn unique_name_with_and_without_index() {
        assert_eq!(
            unique_name("20260807_184600", 42, None, "photo.jpg"),
            "20260807_184600_42_photo.jpg"
        );
        assert_eq!(
            unique_name("20260807_184600", 42, Some(3), "a b.png"),
            "20260807_184600_42_3_a_b.png"
        );
    }

    #[test]
    fn write_staged_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_staged(dir.path(), "x.jpg", b"one").unwrap();
        let second = write_staged(dir.path(), "x.jpg", b"two").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }
}
