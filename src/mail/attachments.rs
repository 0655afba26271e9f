use log::{info, warn};
use mailparse::{DispositionType, ParsedMail};
use std::path::Path;

use crate::config::DownloadPolicy;
use crate::domain::photo::{ExtractedFile, MessageId, OriginKind};
use crate::error::Error;
use crate::mail::decoders::decode_header_str;
use crate::staging::{unique_name, write_staged};

/// Extract every policy-conforming file attachment from one raw RFC 822
/// message. Each part either stages a file, is not an attachment at all, or
/// is skipped with a logged reason — one bad part never stops the rest.
pub fn extract(
    raw: &[u8],
    id: MessageId,
    policy: &DownloadPolicy,
    timestamp: &str,
) -> Vec<ExtractedFile> {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(p) => p,
        Err(e) => {
            warn!("message {id}: cannot parse MIME structure: {e}");
            return Vec::new();
        }
    };

    let mut leaves = Vec::new();
    collect_leaves(&parsed, &mut leaves);

    let mut out = Vec::new();
    for part in leaves {
        match extract_part(part, id, policy, timestamp) {
            Ok(Some(file)) => {
                info!("message {id}: staged attachment -> {}", file.path.display());
                out.push(file);
            }
            Ok(None) => {}
            Err(e) => warn!("message {id}: skipping attachment: {e}"),
        }
    }
    out
}

fn collect_leaves<'a, 'b>(part: &'a ParsedMail<'b>, out: &mut Vec<&'a ParsedMail<'b>>) {
    if part.subparts.is_empty() {
        out.push(part);
        return;
    }
    for sub in &part.subparts {
        collect_leaves(sub, out);
    }
}

/// One MIME leaf: `Ok(None)` means "not a named attachment", `Err` means
/// "attachment, but rejected by policy or unwritable".
fn extract_part(
    part: &ParsedMail<'_>,
    id: MessageId,
    policy: &DownloadPolicy,
    timestamp: &str,
) -> Result<Option<ExtractedFile>, Error> {
    let disposition = part.get_content_disposition();
    if disposition.disposition != DispositionType::Attachment {
        return Ok(None);
    }

    // Content-Disposition filename, falling back to the Content-Type name.
    let Some(raw_name) = disposition
        .params
        .get("filename")
        .cloned()
        .or_else(|| part.ctype.params.get("name").cloned())
    else {
        return Ok(None);
    };

    let filename = decode_header_str(&raw_name);
    if filename.is_empty() {
        return Ok(None);
    }

    let Some(ext) = dotted_extension(&filename) else {
        return Err(Error::Validation(format!("{filename:?}: no file extension")));
    };
    if !policy.allows_extension(&ext) {
        return Err(Error::Validation(format!(
            "{filename:?}: extension {ext} not in allow-list"
        )));
    }

    let payload = part
        .get_body_raw()
        .map_err(|e| Error::Validation(format!("{filename:?}: undecodable payload: {e}")))?;
    if !policy.within_size(payload.len()) {
        return Err(Error::Validation(format!(
            "{filename:?}: {} bytes exceeds size ceiling",
            payload.len()
        )));
    }

    let name = unique_name(timestamp, id, None, &filename);
    let path = write_staged(&policy.staging_dir, &name, &payload)?;
    Ok(Some(ExtractedFile {
        path,
        message_id: id,
        origin: OriginKind::Attachment,
    }))
}

/// Lowercased dotted extension (".jpg"), or `None` when the name has none.
fn dotted_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn policy(dir: PathBuf, max_bytes: u64) -> DownloadPolicy {
        DownloadPolicy {
            extensions: vec![".jpg".into(), ".jpeg".into(), ".png".into()],
            max_bytes,
            staging_dir: dir,
        }
    }

    fn message_with_attachment(filename: &str, payload: &str) -> Vec<u8> {
        format!(
            "From: News <news@school.org>\r\n\
             Subject: [Weekly Update] Week 3\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
             \r\n\
             --sep\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             Photos attached.\r\n\
             --sep\r\n\
             Content-Type: application/octet-stream; name=\"{filename}\"\r\n\
             Content-Disposition: attachment; filename=\"{filename}\"\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             {payload}\r\n\
             --sep--\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn stages_allowed_attachment_despite_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let payload = "x".repeat(2048);
        let raw = message_with_attachment("photo.JPG", &payload);

        let files = extract(&raw, 12, &policy(dir.path().to_path_buf(), 50 * 1024 * 1024), "ts");

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].origin, OriginKind::Attachment);
        assert_eq!(files[0].message_id, 12);
        let written = std::fs::read(&files[0].path).unwrap();
        assert_eq!(written.len(), 2048);
        assert!(
            files[0]
                .path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("ts_12_")
        );
    }

    #[test]
    fn rejects_extension_outside_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let raw = message_with_attachment("document.pdf", "not a photo");

        let files = extract(&raw, 3, &policy(dir.path().to_path_buf(), 50 * 1024 * 1024), "ts");

        assert!(files.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn rejects_payload_over_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let payload = "x".repeat(200);
        let raw = message_with_attachment("big.jpg", &payload);

        let files = extract(&raw, 3, &policy(dir.path().to_path_buf(), 100), "ts");

        assert!(files.is_empty());
    }

    #[test]
    fn inline_parts_are_not_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let raw = b"From: news@school.org\r\n\
            Subject: hi\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            just text\r\n"
            .to_vec();

        let files = extract(&raw, 3, &policy(dir.path().to_path_buf(), 100), "ts");
        assert!(files.is_empty());
    }

    #[test]
    fn filename_is_sanitized_in_staged_name() {
        let dir = tempfile::tempdir().unwrap();
        let raw = message_with_attachment("week 3 (1).jpg", "abc");

        let files = extract(&raw, 9, &policy(dir.path().to_path_buf(), 100), "ts");

        assert_eq!(files.len(), 1);
        let name = files[0].path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "ts_9_week_3__1_.jpg");
    }

    #[test]
    fn one_bad_attachment_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let raw = b"From: news@school.org\r\n\
             Subject: photos\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
             \r\n\
             --sep\r\n\
             Content-Type: application/octet-stream; name=\"notes.txt\"\r\n\
             Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
             \r\n\
             text notes\r\n\
             --sep\r\n\
             Content-Type: image/jpeg; name=\"ok.jpg\"\r\n\
             Content-Disposition: attachment; filename=\"ok.jpg\"\r\n\
             \r\n\
             jpeg bytes\r\n\
             --sep--\r\n"
            .to_vec();

        let files = extract(&raw, 5, &policy(dir.path().to_path_buf(), 100), "ts");

        assert_eq!(files.len(), 1);
        assert!(files[0].path.to_str().unwrap().contains("ok.jpg"));
    }
}
