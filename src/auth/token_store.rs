use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mailpix";

/// Save the Google refresh token, keyed by client_id
pub fn save_refresh_token(client_id: &str, refresh_token: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, &format!("refresh_token:{client_id}"));
    entry?
        .set_password(refresh_token)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the Google refresh token for a client_id, if stored
pub fn load_refresh_token(client_id: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, &format!("refresh_token:{client_id}"));
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Save the OAuth client secret, keyed by client_id
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, &format!("client_secret:{client_id}"));
    entry?
        .set_password(client_secret)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the OAuth client secret for a client_id, if stored
pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, &format!("client_secret:{client_id}"));
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Save the IMAP password for a mailbox username
pub fn save_mailbox_password(username: &str, password: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, &format!("imap_password:{username}"));
    entry?
        .set_password(password)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the IMAP password for a mailbox username, if stored
pub fn load_mailbox_password(username: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, &format!("imap_password:{username}"));
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
