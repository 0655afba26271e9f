use chrono::{DateTime, Datelike, Weekday};
use log::{debug, info, warn};
use mailparse::MailHeaderMap;

use crate::domain::photo::{MessageId, MessageSummary};
use crate::mail::session::MailStore;

/// What one classification pass over the candidate set produced. The counts
/// exist for observability; only `accepted` feeds the extractors.
#[derive(Debug)]
pub struct ClassifyOutcome {
    pub accepted: Vec<MessageId>,
    pub total: usize,
    pub target_day: usize,
}

/// Re-validate every candidate client-side: header-only fetch, decode,
/// sender + exact subject check, advisory day-of-week classification.
/// Per-candidate failures skip that candidate; the batch never aborts.
pub fn classify(
    session: &mut dyn MailStore,
    candidates: &[MessageId],
    sender: &str,
    subject: &str,
    target_weekday: Weekday,
) -> ClassifyOutcome {
    let mut accepted = Vec::new();
    let mut target_day = 0usize;

    for &id in candidates {
        let header = match session.fetch_headers(id) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("message {id}: empty header fetch, skipping");
                continue;
            }
            Err(e) => {
                warn!("message {id}: header fetch failed, skipping: {e}");
                continue;
            }
        };

        let Some(summary) = summarize(id, &header, target_weekday) else {
            warn!("message {id}: unparseable headers, skipping");
            continue;
        };

        if !accepts(&summary, sender, subject) {
            debug!(
                "message {id}: filtered out (from {:?}, subject {:?})",
                summary.sender, summary.subject
            );
            continue;
        }

        info!(
            "message {id} accepted: from {:?}, subject {:?}, date {:?}, target day: {}",
            summary.sender, summary.subject, summary.date_raw, summary.is_target_day
        );
        if summary.is_target_day {
            target_day += 1;
        }
        accepted.push(id);
    }

    let outcome = ClassifyOutcome {
        accepted,
        total: candidates.len(),
        target_day,
    };
    info!(
        "classification: {} candidate(s), {} accepted, {} on the expected weekday",
        outcome.total,
        outcome.accepted.len(),
        outcome.target_day
    );
    outcome
}

/// Build the header-only view of one candidate. `mailparse` handles RFC 2047
/// decoding of Subject/From; a completely unparseable header block is the
/// only way this returns `None`.
pub fn summarize(id: MessageId, header: &[u8], target_weekday: Weekday) -> Option<MessageSummary> {
    let (headers, _) = mailparse::parse_headers(header).ok()?;

    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let sender = headers.get_first_value("From").unwrap_or_default();
    let date_raw = headers.get_first_value("Date").unwrap_or_default();
    let is_target_day = is_on_weekday(&date_raw, target_weekday);

    Some(MessageSummary {
        id,
        subject,
        sender,
        date_raw,
        is_target_day,
    })
}

/// The accept rule: decoded From must contain the configured sender address
/// (case-insensitive) and decoded Subject must contain the exact pattern.
/// The day classification never participates.
pub fn accepts(summary: &MessageSummary, sender: &str, subject: &str) -> bool {
    summary
        .sender
        .to_lowercase()
        .contains(&sender.to_lowercase())
        && summary.subject.contains(subject)
}

/// Date parse failure maps to `false` — the flag is advisory, never an error.
pub fn is_on_weekday(date_raw: &str, weekday: Weekday) -> bool {
    mailparse::dateparse(date_raw)
        .ok()
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .map(|dt| dt.weekday() == weekday)
        .unwrap_or(false)
}
