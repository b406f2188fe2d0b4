use crate::error::{ConnectError, TransportError};
use crate::transport::{Dial, WsLink};
use flock_core::Endpoint;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use rand::seq::SliceRandom;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Races connection attempts to several signaling endpoints.
///
/// All candidates are dialed concurrently and the first successful handshake wins.
/// Attempts still in flight are cancelled and any that completed in the same instant
/// are closed without being used.
#[derive(Clone)]
pub struct Connector {
    dialer: Arc<dyn Dial>,
    shuffle: bool,
}

impl Connector {
    pub fn new(dialer: Arc<dyn Dial>) -> Self {
        Self {
            dialer,
            shuffle: true,
        }
    }

    /// Dial candidates in the order given instead of shuffling them.
    pub fn fixed_order(mut self) -> Self {
        self.shuffle = false;
        self
    }

    pub async fn race(
        &self,
        mut candidates: Vec<Endpoint>,
    ) -> Result<(Endpoint, WsLink), ConnectError> {
        if candidates.is_empty() {
            return Err(ConnectError::NoCandidates);
        }
        if self.shuffle {
            candidates.shuffle(&mut rand::thread_rng());
        }

        let total = candidates.len();
        let mut attempts: FuturesUnordered<_> = candidates
            .into_iter()
            .map(|endpoint| {
                let dialer = self.dialer.clone();
                async move {
                    let result = dialer.dial(&endpoint).await;
                    (endpoint, result)
                }
            })
            .collect();

        let mut failures = 0;
        while let Some((endpoint, result)) = attempts.next().await {
            match result {
                Ok(link) => {
                    debug!("Connected to {endpoint}");
                    close_ready_losers(&mut attempts);
                    return Ok((endpoint, link));
                }
                Err(err) => {
                    failures += 1;
                    warn!("Failed to connect to {endpoint} ({failures}/{total}): {err}");
                }
            }
        }

        Err(ConnectError::AllFailed(total))
    }
}

/// Close links from attempts that finished alongside the winner; the rest are dropped.
fn close_ready_losers<S>(attempts: &mut S)
where
    S: futures_util::Stream<Item = (Endpoint, Result<WsLink, TransportError>)> + Unpin,
{
    while let Some(Some((endpoint, result))) = attempts.next().now_or_never() {
        if let Ok(link) = result {
            debug!("Closing late connection to {endpoint}");
            tokio::spawn(link.close().in_current_span());
        }
    }
}
