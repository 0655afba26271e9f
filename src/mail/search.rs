use chrono::{Duration, Local, NaiveDate};
use log::info;

use crate::domain::photo::MessageId;
use crate::error::Error;
use crate::mail::session::MailStore;

/// Coarse server-side query: sender + lower date bound only. The exact
/// subject is NOT sent to the server — its free-text search is unreliable for
/// bracket-delimited subjects, so subject precision lives in the classifier.
pub fn build_query(sender: &str, since: NaiveDate) -> String {
    format!("FROM \"{}\" SINCE {}", sender, since.format("%d-%b-%Y"))
}

pub fn since_date(days_back: u32) -> NaiveDate {
    (Local::now() - Duration::days(days_back as i64)).date_naive()
}

/// Returns the candidate UID set, a superset of what the classifier will
/// accept. An empty result is success; a rejected query is `Error::Search`,
/// which the orchestrator downgrades to an empty run.
pub fn search_candidates(
    session: &mut dyn MailStore,
    sender: &str,
    days_back: u32,
) -> Result<Vec<MessageId>, Error> {
    session.select_inbox()?;

    let query = build_query(sender, since_date(days_back));
    info!("searching for candidate messages: {query}");

    let ids = session.uid_search(&query)?;
    info!("server search returned {} candidate(s)", ids.len());
    Ok(ids)
}
