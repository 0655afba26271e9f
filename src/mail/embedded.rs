use log::{debug, info, warn};
use mailparse::ParsedMail;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

use crate::config::DownloadPolicy;
use crate::domain::photo::{ExtractedFile, MessageId, OriginKind};
use crate::error::Error;
use crate::staging::{unique_name, write_staged};

/// Bounded wait for each embedded-image retrieval.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves the bytes behind an image URL. The seam exists so tests can
/// observe (and count) retrievals without a network.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// Production fetcher: blocking reqwest client with the bounded timeout.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Network(format!("{url}: HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Fallback extractor, invoked only for a message whose attachment pass
/// yielded nothing: scan the HTML body for `<img src>` URLs and retrieve
/// each one under the same policy the attachment path enforces.
pub fn extract(
    raw: &[u8],
    id: MessageId,
    policy: &DownloadPolicy,
    fetcher: &dyn ImageFetcher,
    timestamp: &str,
) -> Vec<ExtractedFile> {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(p) => p,
        Err(e) => {
            warn!("message {id}: cannot parse MIME structure: {e}");
            return Vec::new();
        }
    };

    let Some(html) = find_html_body(&parsed) else {
        info!("message {id}: no HTML body to scan for embedded images");
        return Vec::new();
    };

    let urls = scan_image_urls(&html);
    info!("message {id}: found {} image URL(s) in HTML body", urls.len());

    let mut out = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        let index = i + 1;
        match retrieve(url, index, id, policy, fetcher, timestamp) {
            Ok(Some(file)) => {
                info!(
                    "message {id}: staged embedded image {index}/{} -> {}",
                    urls.len(),
                    file.path.display()
                );
                out.push(file);
            }
            Ok(None) => debug!("message {id}: skipping non-image URL: {url}"),
            Err(e) => warn!("message {id}: skipping embedded image: {e}"),
        }
    }
    out
}

/// First text/html part in walk order.
fn find_html_body(part: &ParsedMail<'_>) -> Option<String> {
    if part.ctype.mimetype.to_ascii_lowercase() == "text/html" {
        return part.get_body().ok();
    }
    for sub in &part.subparts {
        if let Some(html) = find_html_body(sub) {
            return Some(html);
        }
    }
    None
}

fn img_src_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("static img pattern")
    })
}

/// Raw `src` URLs in document order, with the `&amp;` entity unescaped.
pub fn scan_image_urls(html: &str) -> Vec<String> {
    img_src_re()
        .captures_iter(html)
        .map(|c| c[1].replace("&amp;", "&"))
        .collect()
}

/// Deliberately loose: an allow-listed extension may appear anywhere in the
/// URL, tolerating CDN links whose real name hides behind a query string.
pub fn looks_like_image_url(url: &str, policy: &DownloadPolicy) -> bool {
    let lower = url.to_lowercase();
    policy.extensions.iter().any(|ext| lower.contains(ext.as_str()))
}

/// Last URL path segment, or a synthesized `image_{index}.jpg` when the path
/// has no usable name.
pub fn filename_from_url(url: &str, index: usize) -> String {
    let from_path = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segs| segs.next_back().map(|s| s.to_string()))
    });
    match from_path {
        Some(name) if !name.is_empty() && name.contains('.') => name,
        _ => format!("image_{index}.jpg"),
    }
}

fn retrieve(
    url: &str,
    index: usize,
    id: MessageId,
    policy: &DownloadPolicy,
    fetcher: &dyn ImageFetcher,
    timestamp: &str,
) -> Result<Option<ExtractedFile>, Error> {
    if !looks_like_image_url(url, policy) {
        return Ok(None);
    }

    let bytes = fetcher.fetch(url)?;
    if !policy.within_size(bytes.len()) {
        return Err(Error::Validation(format!(
            "{url}: {} bytes exceeds size ceiling",
            bytes.len()
        )));
    }

    let filename = filename_from_url(url, index);
    let name = unique_name(timestamp, id, Some(index), &filename);
    let path = write_staged(&policy.staging_dir, &name, &bytes)?;
    Ok(Some(ExtractedFile {
        path,
        message_id: id,
        origin: OriginKind::EmbeddedImage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DownloadPolicy {
        DownloadPolicy {
            extensions: vec![".jpg".into(), ".jpeg".into(), ".png".into()],
            max_bytes: 1024,
            staging_dir: std::path::PathBuf::from("."),
        }
    }

    #[test]
    fn scans_img_tags_in_document_order() {
        let html = r#"<p>hi</p>
            <IMG width="10" SRC="https://cdn.example.com/a.png">
            <img src='https://cdn.example.com/b.jpg' alt="x">"#;
        assert_eq!(
            scan_image_urls(html),
            vec![
                "https://cdn.example.com/a.png".to_string(),
                "https://cdn.example.com/b.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn unescapes_amp_entity() {
        let html = r#"<img src="https://cdn.example.com/a.png?x=1&amp;y=2">"#;
        assert_eq!(
            scan_image_urls(html),
            vec!["https://cdn.example.com/a.png?x=1&y=2".to_string()]
        );
    }

    #[test]
    fn extension_match_is_substring_and_case_insensitive() {
        let p = policy();
        assert!(looks_like_image_url("https://c.example.com/a.PNG?sig=abc", &p));
        assert!(looks_like_image_url("https://c.example.com/get?file=a.jpg", &p));
        assert!(!looks_like_image_url("https://c.example.com/tracker.gif", &p));
    }

    #[test]
    fn filename_from_url_uses_path_segment() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/photos/week3.jpg?x=1", 4),
            "week3.jpg"
        );
    }

    #[test]
    fn filename_from_url_synthesizes_when_extensionless() {
        assert_eq!(filename_from_url("https://cdn.example.com/photos/raw", 4), "image_4.jpg");
        assert_eq!(filename_from_url("https://cdn.example.com/", 2), "image_2.jpg");
        assert_eq!(filename_from_url("not a url", 1), "image_1.jpg");
    }

    #[test]
    fn no_html_part_yields_nothing() {
        struct Panicking;
        impl ImageFetcher for Panicking {
            fn fetch(&self, _url: &str) -> Result<Vec<u8>, Error> {
                panic!("must not be called");
            }
        }

        let raw = b"From: news@school.org\r\n\
            Subject: plain\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            no pictures here\r\n";
        let files = extract(raw, 1, &policy(), &Panicking, "ts");
        assert!(files.is_empty());
    }
}
