pub mod google;

use anyhow::Result;
use log::{info, warn};
use std::path::Path;

use crate::domain::photo::ExtractedFile;

/// Google Photos caps batchCreate at 50 items per call.
const MAX_BATCH_ITEMS: usize = 50;

/// Upload destination contract: upload bytes for a token, ensure the album
/// exists, attach a batch of tokens to it.
pub trait PhotoLibrary {
    fn upload(&self, path: &Path) -> Result<String>;
    fn ensure_album(&self, name: &str) -> Result<String>;
    /// Returns how many of the tokens were attached successfully.
    fn attach_to_album(&self, album_id: &str, tokens: &[String]) -> Result<usize>;
}

/// Upload every staged file and attach the successful ones to the album.
/// Per-file upload failures are logged and skipped; the batch continues.
pub fn upload_all(
    library: &dyn PhotoLibrary,
    album_name: &str,
    files: &[ExtractedFile],
) -> Result<usize> {
    if files.is_empty() {
        return Ok(0);
    }

    let album_id = library.ensure_album(album_name)?;

    let mut tokens = Vec::new();
    for file in files {
        match library.upload(&file.path) {
            Ok(token) => tokens.push(token),
            Err(e) => warn!("upload failed for {}: {e}", file.path.display()),
        }
    }
    if tokens.is_empty() {
        warn!("no uploads succeeded out of {} file(s)", files.len());
        return Ok(0);
    }

    let mut attached = 0;
    for chunk in tokens.chunks(MAX_BATCH_ITEMS) {
        attached += library.attach_to_album(&album_id, chunk)?;
    }
    info!(
        "attached {attached}/{} photo(s) to album {album_name:?}",
        tokens.len()
    );
    Ok(attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::photo::OriginKind;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLibrary {
        fail_for: Option<String>,
        attached: Mutex<Vec<String>>,
    }

    impl PhotoLibrary for FakeLibrary {
        fn upload(&self, path: &Path) -> Result<String> {
            let name = path.file_name().unwrap().to_str().unwrap().to_string();
            if self.fail_for.as_deref() == Some(name.as_str()) {
                anyhow::bail!("simulated upload failure");
            }
            Ok(format!("token-{name}"))
        }

        fn ensure_album(&self, _name: &str) -> Result<String> {
            Ok("album-1".to_string())
        }

        fn attach_to_album(&self, _album_id: &str, tokens: &[String]) -> Result<usize> {
            self.attached.lock().unwrap().extend(tokens.iter().cloned());
            Ok(tokens.len())
        }
    }

    fn staged(name: &str) -> ExtractedFile {
        ExtractedFile {
            path: PathBuf::from(name),
            message_id: 1,
            origin: OriginKind::Attachment,
        }
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let library = FakeLibrary::default();
        assert_eq!(upload_all(&library, "Album", &[]).unwrap(), 0);
        assert!(library.attached.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_upload_is_skipped_not_fatal() {
        let library = FakeLibrary {
            fail_for: Some("b.jpg".to_string()),
            ..Default::default()
        };
        let files = vec![staged("a.jpg"), staged("b.jpg"), staged("c.jpg")];

        let attached = upload_all(&library, "Album", &files).unwrap();

        assert_eq!(attached, 2);
        assert_eq!(
            *library.attached.lock().unwrap(),
            vec!["token-a.jpg".to_string(), "token-c.jpg".to_string()]
        );
    }
}
