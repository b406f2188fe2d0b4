//! Text-frame signaling transport.
//!
//! A [`WsLink`] is an established WebSocket split into a sink and a stream of text frames.
//! Anything that can produce one (a real tungstenite connection, an in-memory pair in
//! tests) plugs in behind [`Dial`].
use crate::error::TransportError;
use crate::registry::ClientId;
use crate::session::SessionInput;
use crate::task::AbortOnDrop;
use crate::timeline::{Event, EventSender};
use flock_core::Endpoint;
use futures_util::future::{self, BoxFuture};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};
use tungstenite::protocol::Message;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

pub struct WsLink {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl WsLink {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    pub fn from_tungstenite<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));
        // Control and binary frames are not part of the signaling protocol.
        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::from(err))),
            })
        });
        Self::new(Box::pin(sink), Box::pin(stream))
    }

    /// Close without reading anything further.
    pub async fn close(mut self) {
        if let Err(err) = self.sink.close().await {
            debug!("Error closing signaling link: {err}");
        }
    }
}

/// Establishes a [`WsLink`] to one endpoint.
pub trait Dial: Send + Sync + 'static {
    fn dial<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<WsLink, TransportError>>;
}

/// Dials real WebSocket endpoints with tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteDialer;

impl Dial for TungsteniteDialer {
    fn dial<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<WsLink, TransportError>> {
        Box::pin(async move {
            let (ws, _response) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;
            Ok(WsLink::from_tungstenite(ws))
        })
    }
}

pub(crate) enum WsEvent {
    Text(String),
    Closed(Option<TransportError>),
}

enum WsCommand {
    Text(String),
    Close,
}

/// A live link owned by a session.
///
/// Reads are forwarded to the timeline tagged with `token`; writes are queued to a
/// writer task so the timeline never awaits the network. Dropping the handle stops
/// reading and lets the writer close the link.
pub(crate) struct WsHandle {
    pub token: u64,
    commands: mpsc::UnboundedSender<WsCommand>,
    _reader: AbortOnDrop,
}

impl WsHandle {
    pub fn spawn(client: ClientId, token: u64, link: WsLink, events: EventSender) -> Self {
        let WsLink { mut sink, mut stream } = link;
        let (commands, mut rx) = mpsc::unbounded_channel();

        let span = tracing::debug_span!("websocket", %client, token);

        let writer_events = events.clone();
        tokio::spawn(
            async move {
                while let Some(command) = rx.recv().await {
                    match command {
                        WsCommand::Text(text) => {
                            if let Err(err) = sink.send(text).await {
                                let _ = writer_events.send(Event::Session(
                                    client,
                                    SessionInput::Ws {
                                        link: token,
                                        event: WsEvent::Closed(Some(err)),
                                    },
                                ));
                                return;
                            }
                        }
                        WsCommand::Close => break,
                    }
                }
                if let Err(err) = sink.close().await {
                    debug!("Error closing websocket: {err}");
                }
            }
            .instrument(span.clone()),
        );

        let reader = tokio::spawn(
            async move {
                let closed = loop {
                    match stream.next().await {
                        Some(Ok(text)) => {
                            trace!("Received {text}");
                            let input = SessionInput::Ws {
                                link: token,
                                event: WsEvent::Text(text),
                            };
                            if events.send(Event::Session(client, input)).is_err() {
                                return;
                            }
                        }
                        Some(Err(err)) => break Some(err),
                        None => break None,
                    }
                };
                let _ = events.send(Event::Session(
                    client,
                    SessionInput::Ws {
                        link: token,
                        event: WsEvent::Closed(closed),
                    },
                ));
            }
            .instrument(span),
        );

        Self {
            token,
            commands,
            _reader: AbortOnDrop::new(reader),
        }
    }

    pub fn send(&self, text: String) -> bool {
        self.commands.send(WsCommand::Text(text)).is_ok()
    }

    /// Flush queued frames, then close.
    pub fn close(self) {
        let _ = self.commands.send(WsCommand::Close);
    }
}
