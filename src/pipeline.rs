use log::{info, warn};

use crate::config::{Config, DownloadPolicy};
use crate::domain::photo::{ExtractedFile, MessageId};
use crate::error::Error;
use crate::mail::classify::classify;
use crate::mail::embedded::{HttpImageFetcher, ImageFetcher};
use crate::mail::search::search_candidates;
use crate::mail::session::{MailStore, MailboxSession};
use crate::mail::{attachments, embedded};
use crate::staging::{ensure_staging_dir, run_timestamp};

/// One full extraction pass over the mailbox.
///
/// Only a failed connection aborts; every later failure degrades to fewer
/// files while the run still reports success. The session is released exactly
/// once on every exit path (explicitly on the normal path, by drop otherwise).
pub fn run(cfg: &Config, days_back: u32) -> Result<Vec<ExtractedFile>, Error> {
    let policy = cfg.downloads.policy();
    ensure_staging_dir(&policy.staging_dir)?;

    let password = resolve_password(cfg)?;
    let fetcher = HttpImageFetcher::new()?;

    let mut session = MailboxSession::open(&cfg.mailbox, &password)?;
    let files = extract_from_store(&mut session, cfg, &policy, &fetcher, days_back);
    session.close();

    Ok(files)
}

fn resolve_password(cfg: &Config) -> Result<String, Error> {
    if let Some(p) = &cfg.mailbox.password {
        return Ok(p.clone());
    }
    match crate::auth::token_store::load_mailbox_password(&cfg.mailbox.username) {
        Ok(Some(p)) => Ok(p),
        Ok(None) => Err(Error::Connection(format!(
            "no mailbox password for {}: set [mailbox] password or run `mailpix set-password`",
            cfg.mailbox.username
        ))),
        Err(e) => Err(Error::Connection(format!("keyring lookup failed: {e}"))),
    }
}

/// Search, classify, and extract against an already-open mail store. Search
/// rejection and per-message fetch failures degrade to fewer files here;
/// session lifetime stays with the caller.
pub fn extract_from_store(
    session: &mut dyn MailStore,
    cfg: &Config,
    policy: &DownloadPolicy,
    fetcher: &dyn ImageFetcher,
    days_back: u32,
) -> Vec<ExtractedFile> {
    let candidates = match search_candidates(session, &cfg.mailbox.sender, days_back) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("search failed, treating this run as empty: {e}");
            return Vec::new();
        }
    };
    if candidates.is_empty() {
        info!("no candidate messages found");
        return Vec::new();
    }

    // Validated at config load, so this cannot fail here.
    let weekday = cfg
        .schedule
        .target_weekday()
        .unwrap_or(chrono::Weekday::Fri);

    let outcome = classify(
        session,
        &candidates,
        &cfg.mailbox.sender,
        &cfg.mailbox.subject,
        weekday,
    );
    if outcome.accepted.is_empty() {
        info!("no messages passed filtering");
        return Vec::new();
    }

    let timestamp = run_timestamp();
    let mut out = Vec::new();
    for &id in &outcome.accepted {
        let raw = match session.fetch_full(id) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("message {id}: empty body fetch, skipping");
                continue;
            }
            Err(e) => {
                warn!("message {id}: body fetch failed, skipping: {e}");
                continue;
            }
        };
        out.extend(process_message(&raw, id, policy, fetcher, &timestamp));
    }

    info!(
        "extracted {} file(s) from {} accepted message(s)",
        out.len(),
        outcome.accepted.len()
    );
    out
}

/// Per-message two-phase extraction: traditional attachments first, and the
/// HTML embedded-image scan only when that message yielded no attachment
/// files. A message with attachments never triggers a network fetch.
pub fn process_message(
    raw: &[u8],
    id: MessageId,
    policy: &DownloadPolicy,
    fetcher: &dyn ImageFetcher,
    timestamp: &str,
) -> Vec<ExtractedFile> {
    let files = attachments::extract(raw, id, policy, timestamp);
    if !files.is_empty() {
        return files;
    }
    info!("message {id}: no traditional attachments, scanning HTML for embedded images");
    embedded::extract(raw, id, policy, fetcher, timestamp)
}
