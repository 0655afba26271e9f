use log::{info, warn};
use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;

use crate::config::MailboxConfig;
use crate::domain::photo::MessageId;
use crate::error::Error;

enum Transport {
    Tls(imap::Session<TlsStream<TcpStream>>),
    Plain(imap::Session<TcpStream>),
}

/// Run each operation against whichever transport the session holds.
macro_rules! with_session {
    ($self:expr, $s:ident => $body:expr) => {
        match $self.inner.as_mut() {
            Some(Transport::Tls($s)) => $body,
            Some(Transport::Plain($s)) => $body,
            None => Err(imap::error::Error::Bad("session already closed".to_string())),
        }
    };
}

/// Operations the pipeline needs from an open mailbox. `MailboxSession` is
/// the IMAP implementation; tests substitute a canned store. Select/search
/// failures surface as `Error::Search`, fetch failures as `Error::Fetch`.
pub trait MailStore {
    fn select_inbox(&mut self) -> Result<(), Error>;
    /// UID search, result sorted ascending.
    fn uid_search(&mut self, query: &str) -> Result<Vec<MessageId>, Error>;
    /// Header-only fetch. `None` when the server returned no data for the UID.
    fn fetch_headers(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, Error>;
    /// Full RFC 822 fetch.
    fn fetch_full(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, Error>;
}

/// An authenticated connection to the mail store, exclusively owned by one
/// pipeline run. The server connection is released exactly once: by the
/// explicit `close()` call, or on drop for early exit paths.
pub struct MailboxSession {
    inner: Option<Transport>,
}

impl MailboxSession {
    /// Connect (TLS or plaintext per config) and LOGIN. Any failure here is
    /// fatal to the run.
    pub fn open(cfg: &MailboxConfig, password: &str) -> Result<Self, Error> {
        info!("connecting to mail server {}:{}", cfg.host, cfg.port);

        let inner = if cfg.use_tls {
            let tls = TlsConnector::builder()
                .build()
                .map_err(|e| Error::Connection(e.to_string()))?;
            let client = imap::connect((cfg.host.as_str(), cfg.port), cfg.host.as_str(), &tls)
                .map_err(|e| Error::Connection(e.to_string()))?;
            let session = client
                .login(&cfg.username, password)
                .map_err(|(e, _client)| Error::Connection(e.to_string()))?;
            Transport::Tls(session)
        } else {
            let stream = TcpStream::connect((cfg.host.as_str(), cfg.port))
                .map_err(|e| Error::Connection(e.to_string()))?;
            let mut client = imap::Client::new(stream);
            client
                .read_greeting()
                .map_err(|e| Error::Connection(e.to_string()))?;
            let session = client
                .login(&cfg.username, password)
                .map_err(|(e, _client)| Error::Connection(e.to_string()))?;
            Transport::Plain(session)
        };

        info!("authenticated as {}", cfg.username);
        Ok(Self { inner: Some(inner) })
    }

    /// Best-effort CLOSE + LOGOUT. Logs but never raises on failure, and is a
    /// no-op the second time around.
    pub fn close(&mut self) {
        if let Some(transport) = self.inner.take() {
            let result = match transport {
                Transport::Tls(mut s) => s.close().and_then(|_| s.logout()),
                Transport::Plain(mut s) => s.close().and_then(|_| s.logout()),
            };
            match result {
                Ok(()) => info!("mail connection closed"),
                Err(e) => warn!("error closing mail connection: {e}"),
            }
        }
    }
}

impl MailStore for MailboxSession {
    fn select_inbox(&mut self) -> Result<(), Error> {
        with_session!(self, s => s.select("INBOX").map(|_| ()))
            .map_err(|e| Error::Search(e.to_string()))
    }

    fn uid_search(&mut self, query: &str) -> Result<Vec<MessageId>, Error> {
        let ids = with_session!(self, s => s.uid_search(query))
            .map_err(|e| Error::Search(e.to_string()))?;
        let mut ids: Vec<MessageId> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_headers(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, Error> {
        let fetches = with_session!(self, s => s.uid_fetch(id.to_string(), "(UID RFC822.HEADER)"))
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.header())
            .map(|b| b.to_vec()))
    }

    /// PEEK keeps the message unread on the server.
    fn fetch_full(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, Error> {
        let fetches = with_session!(self, s => s.uid_fetch(id.to_string(), "(UID BODY.PEEK[])"))
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .map(|b| b.to_vec()))
    }
}

impl Drop for MailboxSession {
    fn drop(&mut self) {
        self.close();
    }
}
