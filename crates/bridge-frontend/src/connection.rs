//! A single client connection.
use std::net::SocketAddr;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// The write side of the active client connection.
///
/// Outbound messages are queued to a dedicated writer task, so every
/// message reaches the socket as one uninterrupted write no matter how
/// many threads send concurrently.
#[derive(Debug)]
pub struct Connection {
    peer: SocketAddr,
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl Connection {
    /// Wrap the write half of an accepted socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<W>(peer: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(async move {
            let mut writer = writer;
            while let Some(msg) = outbound_rx.recv().await {
                if writer.write_all(&msg).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        Self {
            peer,
            outbound: Some(outbound),
        }
    }

    /// Address of the connected client.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue one encoded message. Returns `false` once disposed.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        match &self.outbound {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Close the connection. Already-queued messages are still written.
    pub fn dispose(&mut self) {
        if self.outbound.take().is_some() {
            tracing::debug!(peer = %self.peer, "connection disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.outbound.is_none()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.dispose();
    }
}
