use anyhow::anyhow;
use flock::{ClientEvent, SessionEvent};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("flock=debug,mock_signaling=debug"));
        FmtSubscriber::builder().with_env_filter(filter).init();
    });
}

/// Wait up to 10s for an event matching `matches`.
#[allow(unused)]
pub async fn wait_for(
    events: &mut UnboundedReceiver<ClientEvent>,
    matches: impl Fn(&SessionEvent) -> bool,
) -> anyhow::Result<ClientEvent> {
    let found = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = events.recv().await {
            if matches(&event.event) {
                return Some(event);
            }
        }
        None
    })
    .await?;
    found.ok_or_else(|| anyhow!("event tap closed"))
}

/// Poll `check` every 20ms for up to 10s.
#[allow(unused)]
pub async fn eventually(check: impl Fn() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;
    Ok(())
}
