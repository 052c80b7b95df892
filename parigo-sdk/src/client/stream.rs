//! WebSocket consumer for the live consistency stream.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::ClientError;
use crate::objects::WsServerMessage;
use crate::sequence::{SeqCheck, SeqTracker};

/// Connect to `GET /api/v1/users/{user_id}/stream`.
///
/// `base_url` is the server's HTTP root; the scheme is rewritten to the
/// matching WebSocket scheme.
pub async fn connect_user_stream(
    base_url: &Url,
    user_id: &str,
) -> Result<EventStream, ClientError> {
    let mut url = base_url.join(&format!("/api/v1/users/{user_id}/stream"))?;
    let ws_scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // Url::set_scheme rejects some cross-scheme changes; rebuild instead.
    if url.scheme() != ws_scheme {
        let rewritten = format!(
            "{ws_scheme}{}",
            &url.as_str()[url.scheme().len()..]
        );
        url = Url::parse(&rewritten)?;
    }
    let (inner, _) = connect_async(url.as_str()).await?;
    Ok(EventStream {
        inner,
        tracker: SeqTracker::new(),
        last_check: None,
    })
}

/// One open stream session, yielding typed frames.
pub struct EventStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tracker: SeqTracker,
    last_check: Option<SeqCheck>,
}

impl EventStream {
    /// Read the next server frame.
    ///
    /// Returns `Ok(None)` once the server closes the connection. Control
    /// frames are skipped transparently.
    pub async fn next_message(&mut self) -> Result<Option<WsServerMessage>, ClientError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    let message: WsServerMessage = serde_json::from_str(&text)?;
                    self.track(&message);
                    return Ok(Some(message));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
            }
        }
    }

    /// Sequence classification of the most recent change frame. A gap is
    /// informative, not fatal: the frame after a gap still carries current
    /// values, and the next reconciler cycle re-derives remaining drift.
    pub fn last_check(&self) -> Option<SeqCheck> {
        self.last_check
    }

    fn track(&mut self, message: &WsServerMessage) {
        let seq = match message {
            WsServerMessage::BalanceUpdate { seq, .. }
            | WsServerMessage::DepositUpdate { seq, .. }
            | WsServerMessage::WithdrawalUpdate { seq, .. }
            | WsServerMessage::TransactionsUpdate { seq, .. } => *seq,
            WsServerMessage::StalenessMonitorStatus { .. } | WsServerMessage::Error { .. } => {
                return;
            }
        };
        self.last_check = Some(self.tracker.observe(seq));
    }

    /// The last change-event sequence number seen on this stream.
    pub fn last_seq(&self) -> Option<u64> {
        self.tracker.last_seen()
    }
}
