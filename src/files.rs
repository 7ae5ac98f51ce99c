use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::api::models::UploadedFile;

/// Outcome of persisting a single upload. `bytes_written == 0` means the
/// write failed; zero-byte uploads never reach the persister because
/// validation rejects files with no content.
#[derive(Debug)]
pub struct SavedFile {
    pub name: String,
    pub bytes_written: u64,
}

/// Create the uploads directory if it doesn't exist. Idempotent; a failure
/// here is logged but does not abort — the per-file write reports the real
/// error if the directory is truly unusable.
pub fn ensure_files_dir(dir: &Path) {
    if dir.is_dir() {
        return;
    }
    info!("creating the files directory {}", dir.display());
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("failed to create files directory {}: {}", dir.display(), e);
    }
}

/// Persist one upload to `<dir>/<name>`.
///
/// The content is written to a uniquely-named temporary file in the same
/// directory and renamed into place, so concurrent requests writing the same
/// filename can race on which version wins but never interleave bytes.
pub fn save(dir: &Path, file: &UploadedFile) -> SavedFile {
    match write_atomic(dir, file) {
        Ok(bytes_written) => SavedFile {
            name: file.name.clone(),
            bytes_written,
        },
        Err(e) => {
            error!("failed to save upload {}: {}", file.name, e);
            SavedFile {
                name: file.name.clone(),
                bytes_written: 0,
            }
        }
    }
}

fn write_atomic(dir: &Path, file: &UploadedFile) -> io::Result<u64> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&file.data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(&file.name)).map_err(|e| e.error)?;
    Ok(file.data.len() as u64)
}

/// Persist a validated batch. Every file is attempted even after a failure
/// so the caller can report all failed names at once.
pub fn save_all(dir: &Path, files: &[UploadedFile]) -> Vec<SavedFile> {
    files.iter().map(|f| save(dir, f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn upload(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn test_ensure_files_dir_creates_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("uploads/nested");

        ensure_files_dir(&target);
        assert!(target.is_dir());
        ensure_files_dir(&target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_save_writes_content_and_reports_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save(dir.path(), &upload("data.txt", b"hello world"));

        assert_eq!(saved.name, "data.txt");
        assert_eq!(saved.bytes_written, 11);
        assert_eq!(
            std::fs::read(dir.path().join("data.txt")).unwrap(),
            b"hello world"
        );
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), b"old").unwrap();

        let saved = save(dir.path(), &upload("data.txt", b"new content"));
        assert_eq!(saved.bytes_written, 11);
        assert_eq!(
            std::fs::read(dir.path().join("data.txt")).unwrap(),
            b"new content"
        );
    }

    #[test]
    fn test_save_reports_zero_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let saved = save(&missing, &upload("data.txt", b"hello"));
        assert_eq!(saved.bytes_written, 0);
    }

    #[test]
    fn test_save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), &upload("data.txt", b"hello"));

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["data.txt"]);
    }

    #[test]
    fn test_save_all_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![upload("a.txt", b"aaa"), upload("b.txt", b"bb")];

        let saved = save_all(dir.path(), &files);
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].bytes_written, 3);
        assert_eq!(saved[1].bytes_written, 2);
    }

    #[test]
    fn test_concurrent_saves_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let a = upload("clash.txt", &[b'a'; 8192]);
        let b = upload("clash.txt", &[b'b'; 8192]);

        let pa = path.clone();
        let ta = std::thread::spawn(move || save(&pa, &a));
        let tb = std::thread::spawn(move || save(&path, &b));
        ta.join().unwrap();
        tb.join().unwrap();

        let content = std::fs::read(dir.path().join("clash.txt")).unwrap();
        assert_eq!(content.len(), 8192);
        let first = content[0];
        assert!(content.iter().all(|&c| c == first), "interleaved write");
    }
}
