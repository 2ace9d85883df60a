//! Stop-and-wait transfer engine.

use std::time::Duration;

use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};
use udpfetch_protocol::{Command, InfoReply, RECV_BUFFER_SIZE, ResourceId, parse_listing};

use crate::retry::RetryBudget;
use crate::session::{Accept, TransferSession};
use crate::transport::Transport;
use crate::{ClientOptions, TransferError};

/// Downloads resources over a [`Transport`], one request in flight at a time.
pub struct TransferClient<T: Transport> {
    transport: T,
    options: ClientOptions,
    buf: Vec<u8>,
}

impl<T: Transport> TransferClient<T> {
    pub fn new(transport: T, options: ClientOptions) -> Self {
        Self {
            transport,
            options,
            buf: vec![0u8; RECV_BUFFER_SIZE],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Downloads the named resource.
    pub async fn get(&mut self, name: &str) -> Result<Vec<u8>, TransferError> {
        self.fetch(&ResourceId::Named(name.to_string())).await
    }

    /// Downloads the listing and splits it into resource names.
    pub async fn list(&mut self) -> Result<Vec<String>, TransferError> {
        let doc = self.fetch(&ResourceId::Listing).await?;
        Ok(parse_listing(&doc))
    }

    /// Downloads `resource`: resolves its chunk count, then fetches every
    /// chunk in index order.
    pub async fn fetch(&mut self, resource: &ResourceId) -> Result<Vec<u8>, TransferError> {
        let chunk_count = self.resolve(resource).await?;
        debug!(%resource, chunk_count, "metadata resolved");

        let mut session = TransferSession::new(resource.clone(), chunk_count);
        while let Some(index) = session.current_index() {
            let request = Command::Fetch {
                resource: resource.clone(),
                seq: index,
            }
            .to_bytes();

            let outcome = self
                .exchange(&request, |packet| match session.accept(packet) {
                    Accept::Accepted => Some(()),
                    Accept::Stale { seq, expected } => {
                        debug!(seq, expected, "discarding stale chunk");
                        None
                    }
                    Accept::Complete { seq } => {
                        debug!(seq, "discarding chunk after completion");
                        None
                    }
                    Accept::Malformed(e) => {
                        debug!("discarding non-chunk reply: {e}");
                        None
                    }
                })
                .await?;

            if let Err(attempts) = outcome {
                return Err(TransferError::ChunkTimeout {
                    resource: resource.to_string(),
                    index,
                    chunk_count,
                    attempts,
                });
            }
        }

        info!(
            resource = %session.resource(),
            chunk_count = session.chunk_count(),
            bytes = session.received_len(),
            "transfer complete"
        );
        Ok(session.into_bytes())
    }

    /// Sends the info request for `resource` and returns its chunk count.
    ///
    /// Datagrams already queued from an earlier transfer are dropped first,
    /// so a late `ok <n>` cannot answer this request.
    pub async fn resolve(&mut self, resource: &ResourceId) -> Result<u32, TransferError> {
        self.discard_queued().await;
        let request = Command::Info(resource.clone()).to_bytes();

        let outcome = self
            .exchange(&request, |datagram| match InfoReply::parse(datagram) {
                Ok(reply) => Some(reply),
                Err(e) => {
                    debug!("discarding reply during metadata phase: {e}");
                    None
                }
            })
            .await?;

        match outcome {
            Ok(InfoReply::Found { chunk_count }) => Ok(chunk_count),
            Ok(InfoReply::NotFound) => Err(TransferError::NotFound(resource.to_string())),
            Err(attempts) => Err(TransferError::MetadataTimeout {
                resource: resource.to_string(),
                attempts,
            }),
        }
    }

    async fn discard_queued(&mut self) {
        while let Ok(Ok(n)) = timeout(Duration::ZERO, self.transport.recv(&mut self.buf)).await {
            debug!(len = n, "discarding queued datagram");
        }
    }

    /// Sends `request` until `classify` accepts a reply or the retry budget
    /// runs out.
    ///
    /// Each send opens a window of `options.timeout`. Replies rejected by
    /// `classify` are dropped and the wait continues against the same
    /// deadline, so they never cost an attempt. On exhaustion the number of
    /// attempts made is returned as the inner error.
    async fn exchange<R, F>(
        &mut self,
        request: &[u8],
        mut classify: F,
    ) -> Result<Result<R, u32>, TransferError>
    where
        F: FnMut(&[u8]) -> Option<R>,
    {
        let mut budget = RetryBudget::new(self.options.max_retries);

        while budget.try_consume() {
            self.transport.send(request).await?;
            let deadline = Instant::now() + self.options.timeout;

            loop {
                match timeout_at(deadline, self.transport.recv(&mut self.buf)).await {
                    Ok(Ok(n)) => {
                        if let Some(accepted) = classify(&self.buf[..n]) {
                            return Ok(Ok(accepted));
                        }
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        warn!(
                            request = %String::from_utf8_lossy(request),
                            attempt = budget.used(),
                            max = budget.max_attempts(),
                            "timed out waiting for reply"
                        );
                        break;
                    }
                }
            }
        }

        Ok(Err(budget.used()))
    }
}
