mod utils;
#[allow(unused)]
use utils::*;

use flock_core::{SessionConfig, SimulationConfig};
use flock_runtime::{ChannelSink, FlockRuntime};
use mock_signaling::{MockConfig, MockServer};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn hatches_runs_and_exits() -> anyhow::Result<()> {
    init();
    let server = MockServer::spawn(MockConfig::default()).await?;
    let (sink, mut batches) = ChannelSink::new();

    let session = SessionConfig::new("e2e", &[server.url().as_str()]);
    let simulation = SimulationConfig::new(3)
        .hatch_rate(20.0)
        .duration(Duration::from_millis(500))
        .stats_interval(Duration::from_millis(300), Duration::from_secs(10));
    let runtime = FlockRuntime::new(session, simulation)
        .stats_sink(Arc::new(sink))
        .ctrl_c(false);

    tokio::time::timeout(Duration::from_secs(10), runtime.run()).await??;

    assert_eq!(server.connections(), 3);
    eventually(|| server.received_of("disconnect").len() == 3).await?;
    assert_eq!(server.received_of("answer").len(), 3);

    let batch = batches.try_recv()?;
    assert_eq!(batch.clients.len(), 3);
    assert!(batch.connected() >= 1);
    Ok(())
}

#[tokio::test]
async fn repeats_after_the_interval() -> anyhow::Result<()> {
    init();
    let server = MockServer::spawn(MockConfig::default()).await?;

    let session = SessionConfig::new("e2e", &[server.url().as_str()]);
    let simulation = SimulationConfig::new(1)
        .duration(Duration::from_millis(200))
        .repeat_interval(Duration::from_millis(100));
    let simulation = FlockRuntime::new(session, simulation)
        .ctrl_c(false)
        .build()?;
    let handle = simulation.handle();
    let run = tokio::spawn(simulation.run());

    eventually(|| server.connections() >= 3).await?;
    handle.shutdown();
    tokio::time::timeout(Duration::from_secs(10), run).await??;
    assert!(server.received_of("disconnect").len() >= 2);
    Ok(())
}
