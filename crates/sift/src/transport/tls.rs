//! Production transport over the `imap` crate with native TLS

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};

use super::{FetchSpec, FetchedMessage, MailboxInfo, Transport};
use crate::config::AccountConfig;
use crate::error::{Error, Result};
use crate::models::MessageId;

type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// IMAP-over-TLS transport backed by the `imap` crate
pub struct TlsTransport {
    session: ImapSession,
}

impl TlsTransport {
    /// Connect to the configured server and authenticate.
    pub fn connect(config: &AccountConfig) -> Result<Self> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| Error::Connection(format!("TLS setup failed: {e}")))?;

        let client = imap::connect((config.host.as_str(), config.port), &config.host, &tls)
            .map_err(|e| Error::Connection(format!("{}:{}: {e}", config.host, config.port)))?;

        let session = client
            .login(&config.user, &config.password)
            .map_err(|(e, _)| Error::Authentication(e.to_string()))?;

        log::info!("logged in to {} as {}", config.host, config.user);
        Ok(Self { session })
    }
}

impl Transport for TlsTransport {
    fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
        let names = self.session.list(Some(""), Some("*"))?;
        Ok(names.iter().map(mailbox_info).collect())
    }

    fn select(&mut self, mailbox: &str) -> Result<()> {
        self.session.select(mailbox)?;
        Ok(())
    }

    fn search(&mut self, query: &str) -> Result<Vec<MessageId>> {
        let matched = self.session.search(query)?;
        // The set comes back unordered; sequence numbers ascend in
        // server order.
        let mut ids: Vec<MessageId> = matched.into_iter().map(MessageId::new).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch(&mut self, ids: &[MessageId], spec: FetchSpec) -> Result<Vec<FetchedMessage>> {
        let sequence = ids
            .iter()
            .map(MessageId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fetches = self.session.fetch(&sequence, spec.query())?;

        let mut out = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            let data = match spec {
                FetchSpec::Header => fetch.header(),
                FetchSpec::Text => fetch.text(),
                FetchSpec::Full => fetch.body(),
            };
            let data = data.ok_or_else(|| {
                Error::Transport(format!(
                    "fetch response for message {} carried no {} data",
                    fetch.message,
                    spec.query()
                ))
            })?;
            out.push(FetchedMessage {
                id: MessageId::new(fetch.message),
                data: data.to_vec(),
            });
        }
        Ok(out)
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}

fn mailbox_info(name: &imap::types::Name) -> MailboxInfo {
    MailboxInfo {
        flags: name.attributes().iter().map(attribute_name).collect(),
        delimiter: name.delimiter().map(str::to_string),
        name: name.name().to_string(),
    }
}

fn attribute_name(attr: &imap::types::NameAttribute<'_>) -> String {
    match attr {
        imap::types::NameAttribute::NoInferiors => r"\Noinferiors".to_string(),
        imap::types::NameAttribute::NoSelect => r"\Noselect".to_string(),
        imap::types::NameAttribute::Marked => r"\Marked".to_string(),
        imap::types::NameAttribute::Unmarked => r"\Unmarked".to_string(),
        imap::types::NameAttribute::Custom(raw) => raw.to_string(),
    }
}
