pub mod oauth;
pub mod token_manager;
pub mod token_store;
pub mod tokens_file;

/// Scopes needed to upload photos and manage the destination album.
pub const PHOTOS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/photoslibrary",
    "https://www.googleapis.com/auth/photoslibrary.appendonly",
];
