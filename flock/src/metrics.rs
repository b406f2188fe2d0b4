use crate::event::SessionEvent;

#[cfg(feature = "metrics")]
pub(crate) fn record(event: &SessionEvent) {
    use metrics::counter;

    match event {
        SessionEvent::Connected { .. } => counter!("flock.connects").increment(1),
        SessionEvent::ConnectFailed { .. } => counter!("flock.connect_failures").increment(1),
        SessionEvent::ReconnectScheduled { .. } => counter!("flock.reconnects").increment(1),
        SessionEvent::Redirected { .. } => counter!("flock.redirects").increment(1),
        SessionEvent::ProtocolViolation { .. } => {
            counter!("flock.protocol_violations").increment(1)
        }
        SessionEvent::MessageSent { size, .. } => {
            counter!("flock.datachannel.messages").increment(1);
            counter!("flock.datachannel.bytes").increment(*size as u64);
        }
        _ => {}
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record(_event: &SessionEvent) {}
