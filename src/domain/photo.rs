use std::path::PathBuf;

/// Server-assigned IMAP UID. Scoped to one mailbox session; not stable
/// across sessions.
pub type MessageId = u32;

/// Whether an extracted file came from a traditional MIME attachment or from
/// an image embedded in the HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    Attachment,
    EmbeddedImage,
}

/// One staged photo file, ready for upload. The caller deletes the file after
/// a successful upload; the extraction pipeline never removes it.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub message_id: MessageId,
    pub origin: OriginKind,
}

/// Header-only view of a candidate message, used for the accept/reject
/// decision and discarded afterwards.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub date_raw: String,
    /// Advisory only: whether the Date header falls on the configured weekday.
    pub is_target_day: bool,
}
