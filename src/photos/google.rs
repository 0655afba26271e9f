use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::auth::token_manager::TokenManager;
use crate::photos::PhotoLibrary;

const API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Google Photos REST client. Uploads are the raw protocol (bytes in, upload
/// token out as body text); album membership goes through batchCreate.
pub struct GooglePhotos {
    client: reqwest::blocking::Client,
    tokens: TokenManager,
}

impl GooglePhotos {
    pub fn new(tokens: TokenManager) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, tokens })
    }
}

impl PhotoLibrary for GooglePhotos {
    fn upload(&self, path: &Path) -> Result<String> {
        let access = self.tokens.get_access_token()?;
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo");
        info!("uploading {file_name} ({} bytes)", bytes.len());

        let response = self
            .client
            .post(format!("{API_BASE}/uploads"))
            .bearer_auth(&access)
            .header("Content-Type", "application/octet-stream")
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-Upload-File-Name", file_name)
            .body(bytes)
            .send()?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "upload of {file_name} failed: HTTP {}",
                response.status()
            ));
        }

        let token = response.text()?;
        if token.is_empty() {
            return Err(anyhow!("upload of {file_name} returned no token"));
        }
        Ok(token)
    }

    fn ensure_album(&self, name: &str) -> Result<String> {
        let access = self.tokens.get_access_token()?;

        let listing: AlbumList = self
            .client
            .get(format!("{API_BASE}/albums"))
            .bearer_auth(&access)
            .query(&[("pageSize", "50")])
            .send()?
            .error_for_status()?
            .json()?;
        if let Some(album) = listing
            .albums
            .iter()
            .find(|a| a.title.as_deref() == Some(name))
        {
            info!("found existing album {name:?} ({})", album.id);
            return Ok(album.id.clone());
        }

        info!("creating album {name:?}");
        let created: Album = self
            .client
            .post(format!("{API_BASE}/albums"))
            .bearer_auth(&access)
            .json(&serde_json::json!({ "album": { "title": name } }))
            .send()?
            .error_for_status()?
            .json()?;
        info!("created album {name:?} ({})", created.id);
        Ok(created.id)
    }

    fn attach_to_album(&self, album_id: &str, tokens: &[String]) -> Result<usize> {
        let access = self.tokens.get_access_token()?;

        let items: Vec<serde_json::Value> = tokens
            .iter()
            .map(|t| serde_json::json!({ "simpleMediaItem": { "uploadToken": t } }))
            .collect();
        let response: BatchCreateResponse = self
            .client
            .post(format!("{API_BASE}/mediaItems:batchCreate"))
            .bearer_auth(&access)
            .json(&serde_json::json!({
                "albumId": album_id,
                "newMediaItems": items,
            }))
            .send()?
            .error_for_status()?
            .json()?;

        let mut attached = 0;
        for (i, result) in response.new_media_item_results.iter().enumerate() {
            if result.media_item.is_some() {
                attached += 1;
            } else {
                let message = result
                    .status
                    .as_ref()
                    .and_then(|s| s.message.as_deref())
                    .unwrap_or("unknown error");
                warn!("photo {} not attached to album: {message}", i + 1);
            }
        }
        Ok(attached)
    }
}

#[derive(Debug, Deserialize)]
struct AlbumList {
    #[serde(default)]
    albums: Vec<Album>,
}

#[derive(Debug, Deserialize)]
struct Album {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateResponse {
    #[serde(default)]
    new_media_item_results: Vec<MediaItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemResult {
    media_item: Option<serde_json::Value>,
    status: Option<ResultStatus>,
}

#[derive(Debug, Deserialize)]
struct ResultStatus {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_response_counts_media_items() {
        let body = r#"{
            "newMediaItemResults": [
                {"mediaItem": {"id": "m1"}, "status": {"message": "Success"}},
                {"status": {"message": "quota exceeded"}}
            ]
        }"#;
        let parsed: BatchCreateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.new_media_item_results.len(), 2);
        assert!(parsed.new_media_item_results[0].media_item.is_some());
        assert!(parsed.new_media_item_results[1].media_item.is_none());
    }

    #[test]
    fn album_list_tolerates_missing_fields() {
        let parsed: AlbumList = serde_json::from_str("{}").unwrap();
        assert!(parsed.albums.is_empty());

        let parsed: AlbumList =
            serde_json::from_str(r#"{"albums": [{"id": "a1"}]}"#).unwrap();
        assert_eq!(parsed.albums[0].id, "a1");
        assert!(parsed.albums[0].title.is_none());
    }
}
