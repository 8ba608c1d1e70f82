use futures_util::{SinkExt, StreamExt};
use seed_core::console_ipc::{
    decode_inbound, encode_outbound, ControlAction, FrameError, InboundMsg, OutboundMsg,
    DEFAULT_MAX_FRAME_BYTES,
};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connecting { url: String },
    Connected,
    Disconnected { reason: String },
    ReconnectScheduled { delay: Duration },
    Message(InboundMsg),
    DecodeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("console is not connected")]
    NotConnected,
    #[error("outbound queue is full")]
    QueueFull,
    #[error("transport task has stopped")]
    Closed,
    #[error(transparent)]
    Encode(#[from] FrameError),
}

/// Fixed-delay retry timer. Holds at most one pending attempt.
#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    delay: Duration,
    pending: Option<Instant>,
}

impl ReconnectSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Returns false when an attempt is already pending.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(now + self.delay);
        true
    }

    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[derive(Debug, Clone)]
pub struct TransportClient {
    url: String,
    reconnect_delay: Duration,
    max_frame_bytes: usize,
}

impl TransportClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn spawn(self, events: mpsc::Sender<TransportEvent>) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = TransportTask {
            schedule: ReconnectSchedule::new(self.reconnect_delay),
            client: self,
            events,
            outbound_rx,
            outbound_open: true,
            shutdown: shutdown_rx,
        };
        TransportHandle {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            task: tokio::spawn(task.run()),
        }
    }
}

pub struct TransportHandle {
    outbound: mpsc::Sender<OutboundMsg>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    pub fn sender(&self) -> mpsc::Sender<OutboundMsg> {
        self.outbound.clone()
    }

    pub fn try_send(&self, msg: OutboundMsg) -> Result<(), SendError> {
        self.outbound.try_send(msg).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Closes the socket (best effort) and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(event = "console_transport_join_error", error = %err);
        }
    }
}

enum PumpExit {
    Shutdown,
    Closed(String),
}

struct TransportTask {
    client: TransportClient,
    schedule: ReconnectSchedule,
    events: mpsc::Sender<TransportEvent>,
    outbound_rx: mpsc::Receiver<OutboundMsg>,
    outbound_open: bool,
    shutdown: watch::Receiver<bool>,
}

impl TransportTask {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() || self.events.is_closed() {
                break;
            }
            let url = self.client.url.clone();
            info!(event = "console_connecting", url = %url);
            self.emit(TransportEvent::Connecting { url: url.clone() })
                .await;

            let connect = tokio::select! {
                result = connect_async(url.as_str()) => result,
                _ = self.shutdown.changed() => break,
            };

            match connect {
                Ok((mut ws, _)) => {
                    info!(event = "console_connected", url = %url);
                    self.emit(TransportEvent::Connected).await;
                    if let Err(reason) = self
                        .write(&mut ws, &OutboundMsg::EnemyControl(ControlAction::StrategyStatus))
                        .await
                    {
                        self.emit(TransportEvent::Disconnected { reason }).await;
                    } else {
                        match self.pump(&mut ws).await {
                            PumpExit::Shutdown => {
                                let _ = ws.close(None).await;
                                break;
                            }
                            PumpExit::Closed(reason) => {
                                warn!(event = "console_disconnected", reason = %reason);
                                let _ = ws.close(None).await;
                                self.emit(TransportEvent::Disconnected { reason }).await;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(event = "console_connect_error", url = %url, error = %err);
                    self.emit(TransportEvent::Disconnected {
                        reason: err.to_string(),
                    })
                    .await;
                }
            }

            if self.schedule.schedule(Instant::now()) {
                self.emit(TransportEvent::ReconnectScheduled {
                    delay: self.schedule.delay(),
                })
                .await;
            }
            if !self.wait_for_retry().await {
                break;
            }
        }
        debug!(event = "console_transport_stopped");
    }

    async fn pump(&mut self, ws: &mut Socket) -> PumpExit {
        loop {
            tokio::select! {
                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.dispatch(&text).await,
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                            Ok(text) => self.dispatch(&text).await,
                            Err(err) => {
                                warn!(event = "console_decode_error", error = %err);
                                self.emit(TransportEvent::DecodeFailed(err.to_string())).await;
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|frame| format!("closed by server ({})", frame.code))
                                .unwrap_or_else(|| "closed by server".to_string());
                            return PumpExit::Closed(reason);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return PumpExit::Closed(err.to_string()),
                        None => return PumpExit::Closed("stream ended".to_string()),
                    }
                }
                maybe_out = self.outbound_rx.recv(), if self.outbound_open => {
                    match maybe_out {
                        Some(msg) => {
                            if let Err(reason) = self.write(ws, &msg).await {
                                return PumpExit::Closed(reason);
                            }
                        }
                        None => self.outbound_open = false,
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return PumpExit::Shutdown;
                    }
                }
            }
        }
    }

    /// Encode failures are reported and skipped; socket failures end the connection.
    async fn write(&self, ws: &mut Socket, msg: &OutboundMsg) -> Result<(), String> {
        let text = match encode_outbound(msg, self.client.max_frame_bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(event = "console_encode_error", kind = msg.kind(), error = %err);
                return Ok(());
            }
        };
        ws.send(Message::Text(text))
            .await
            .map_err(|err| err.to_string())
    }

    async fn dispatch(&mut self, text: &str) {
        match decode_inbound(text, self.client.max_frame_bytes) {
            Ok(msg) => self.emit(TransportEvent::Message(msg)).await,
            Err(err) => {
                warn!(event = "console_decode_error", error = %err);
                self.emit(TransportEvent::DecodeFailed(err.to_string()))
                    .await;
            }
        }
    }

    /// Sleeps until the pending attempt is due. Anything queued meanwhile is
    /// dropped. Returns false on shutdown.
    async fn wait_for_retry(&mut self) -> bool {
        while let Some(deadline) = self.schedule.deadline() {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    self.schedule.take_due(Instant::now());
                }
                maybe_out = self.outbound_rx.recv(), if self.outbound_open => {
                    match maybe_out {
                        Some(msg) => warn!(event = "console_send_dropped", kind = msg.kind()),
                        None => self.outbound_open = false,
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        self.schedule.cancel();
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }
}
