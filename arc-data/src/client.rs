use crate::channel::Channel;
use crate::error::DataError;
use crate::model::MarketEvent;
use arc_instrument::Symbol;
use arc_integration::protocol::websocket::{self, WsMessage};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, info, warn};
use url::Url;

/// Exchange-specific wire behaviour plugged into [`WebSocketClient`]'s connection-scope
/// dispatch.
pub trait ExchangeWsProtocol: Send + Sync + 'static {
    /// WebSocket URL to connect to. For private streams this may embed a
    /// previously-obtained listen-key.
    fn url(&self) -> Url;

    /// `true` if this protocol instance authenticates a private stream.
    fn is_private(&self) -> bool {
        false
    }

    /// Build the subscription message(s) for the given symbols and channels.
    fn subscribe_messages(&self, symbols: &[Symbol], channels: &[Channel]) -> Vec<WsMessage>;

    /// Build the unsubscribe counterpart of [`Self::subscribe_messages`].
    fn unsubscribe_messages(&self, symbols: &[Symbol], channels: &[Channel]) -> Vec<WsMessage>;

    /// Parse one inbound frame into zero or more [`MarketEvent`]s. A parse failure is
    /// logged and dropped by the caller, never torn down.
    fn parse(&self, message: &WsMessage) -> Vec<Result<MarketEvent, DataError>>;

    /// Optional client-initiated heartbeat payload and interval. `None` means the
    /// exchange relies solely on server-initiated ping/pong, which tungstenite answers
    /// automatically.
    fn heartbeat(&self) -> Option<(Duration, WsMessage)> {
        None
    }
}

/// Maintains one bidirectional stream to an exchange endpoint: connects, subscribes,
/// dispatches parsed events, and reconnects with backoff on disconnect, resubscribing
/// the cached subscription set.
pub struct WebSocketClient<P> {
    protocol: Arc<P>,
    subscriptions: Arc<Mutex<Vec<(Vec<Symbol>, Vec<Channel>)>>>,
}

impl<P> WebSocketClient<P>
where
    P: ExchangeWsProtocol,
{
    pub fn new(protocol: P) -> Self {
        Self {
            protocol: Arc::new(protocol),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register symbols/channels to subscribe on (re)connect. Does not itself send
    /// anything; the running connection loop picks up the cached set on its next
    /// reconnect, or the caller sends immediately via [`Self::run`]'s initial
    /// subscribe.
    pub fn subscribe(&self, symbols: Vec<Symbol>, channels: Vec<Channel>) {
        self.subscriptions.lock().push((symbols, channels));
    }

    /// Drive the connect → subscribe → receive-loop → reconnect cycle
    /// forever, forwarding parsed events to `on_event`. Returns only if
    /// `shutdown` resolves.
    pub async fn run<F>(&self, mut on_event: F, mut shutdown: tokio::sync::oneshot::Receiver<()>)
    where
        F: FnMut(MarketEvent) + Send,
    {
        let mut backoff = Duration::from_millis(500);
        const MAX_BACKOFF: Duration = Duration::from_secs(10);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("WebSocket client shutting down");
                    return;
                }
                result = self.connect_and_receive(&mut on_event) => {
                    if let Err(error) = result {
                        warn!(?error, backoff_ms = backoff.as_millis(), "WebSocket disconnected, reconnecting");
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff.mul_f64(1.5), MAX_BACKOFF);
        }
    }

    async fn connect_and_receive<F>(&self, on_event: &mut F) -> Result<(), DataError>
    where
        F: FnMut(MarketEvent) + Send,
    {
        let url = self.protocol.url();
        let request = url
            .as_str()
            .into_client_request()
            .map_err(|e| DataError::Parse(e.to_string()))?;

        let socket = websocket::connect(request).await?;
        let (mut sink, mut stream) = socket.split();
        info!(%url, "WebSocket connected");

        for (symbols, channels) in self.subscriptions.lock().iter() {
            for message in self.protocol.subscribe_messages(symbols, channels) {
                sink.send(message).await.map_err(|e| {
                    DataError::Transport(arc_integration::SocketError::WebSocket(Box::new(e)))
                })?;
            }
        }

        let (heartbeat_interval, heartbeat_payload) = match self.protocol.heartbeat() {
            Some((interval, payload)) => (interval, Some(payload)),
            None => (Duration::from_secs(3600), None),
        };
        let mut heartbeat_tick = tokio::time::interval(heartbeat_interval);
        heartbeat_tick.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                _ = heartbeat_tick.tick() => {
                    if let Some(payload) = &heartbeat_payload {
                        sink.send(payload.clone()).await.map_err(|e| {
                            DataError::Transport(arc_integration::SocketError::WebSocket(Box::new(e)))
                        })?;
                    }
                }
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        return Err(DataError::Transport(arc_integration::SocketError::Terminated(
                            "stream ended".into(),
                        )));
                    };

                    let frame = frame.map_err(|e| {
                        arc_integration::SocketError::WebSocket(Box::new(e))
                    })?;

                    if frame.is_close() {
                        return Err(DataError::Transport(arc_integration::SocketError::Terminated(
                            "received close frame".into(),
                        )));
                    }
                    if frame.is_ping() || frame.is_pong() {
                        continue;
                    }

                    for result in self.protocol.parse(&frame) {
                        match result {
                            Ok(event) => on_event(event),
                            Err(error) => debug!(?error, "dropping unparseable WebSocket frame"),
                        }
                    }
                }
            }
        }
    }
}

/// An unbounded channel pair convenient for feeding [`WebSocketClient::run`]
/// events into an async consumer (eg/ the market-data hub) from a spawned
/// task.
pub fn event_channel() -> (mpsc::UnboundedSender<MarketEvent>, mpsc::UnboundedReceiver<MarketEvent>) {
    mpsc::unbounded_channel()
}
