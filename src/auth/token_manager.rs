use anyhow::Result;
use log::info;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{PHOTOS_SCOPES, oauth, token_store, tokens_file};
use crate::config::PhotosConfig;

/// Produces valid Google Photos access tokens, in order of preference:
/// cached token, refresh-token exchange, interactive PKCE flow.
#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl TokenManager {
    pub fn from_config(cfg: &PhotosConfig) -> Result<Self> {
        let client_secret = token_store::load_client_secret(&cfg.client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id: cfg.client_id.clone(),
            client_secret,
            redirect_uri: cfg.redirect_uri.clone(),
        })
    }

    /// Returns a valid access token; refreshes/PKCE if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        // 1) cached & not expired
        if let Some(tf) = tokens_file::load_tokens()?
            && let (Some(at), Some(exp)) = (tf.access_token, tf.expires_at_epoch)
            && now < exp
        {
            return Ok(at);
        }

        // 2) refresh if possible
        if let Some(rt) = token_store::load_refresh_token(&self.client_id)? {
            info!("access token missing or expired; refreshing");
            let t =
                oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)?;
            let exp = t.expires_in.map(|s| now + s as i64).unwrap_or(now + 3500);
            tokens_file::save_tokens(Some(&t.access_token), Some(exp))?;
            return Ok(t.access_token);
        }

        // 3) otherwise PKCE
        info!("no refresh token stored; starting interactive authorization");
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            PHOTOS_SCOPES,
        )?;

        let exp = t.expires_in.map(|s| now + s as i64).unwrap_or(now + 3500);
        tokens_file::save_tokens(Some(&t.access_token), Some(exp))?;
        Ok(t.access_token)
    }
}
