//! Live voice bridge
//!
//! Lifecycle of one bidirectional voice session:
//!
//! ```text
//!   Disconnected ──connect()──▶ Connecting ──socket open──▶ Active
//!        ▲                          │                         │
//!        └──── transport fault / disconnect() ◀───────────────┘
//! ```
//!
//! While active, one task streams fixed-size audio frames from the input
//! and another turns server messages into [`LiveEvent`]s. Every transition
//! into `Disconnected` from another state emits exactly one
//! `LiveEvent::Status { active: false }`.

use super::frame::Framer;
use super::input::AudioInput;
use super::protocol::{realtime_input, setup_message, ServerMessage, Utterance};
use crate::config::LiveConfig;
use crate::error::{Error, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Active,
}

/// Notification emitted by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// A discrete utterance from the user or the model
    Message { text: String, is_from_user: bool },
    /// The session became active or inactive
    Status { active: bool },
}

impl From<Utterance> for LiveEvent {
    fn from(utterance: Utterance) -> Self {
        LiveEvent::Message {
            text: utterance.text,
            is_from_user: utterance.is_from_user,
        }
    }
}

/// Shared lifecycle cell: state plus the channel status changes go to
struct Lifecycle {
    state: RwLock<BridgeState>,
    events: mpsc::Sender<LiveEvent>,
}

impl Lifecycle {
    fn get(&self) -> BridgeState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Move `from` -> `to`; returns false if the state was something else
    fn transition(&self, from: BridgeState, to: BridgeState) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    /// Enter `Active` from `Connecting` and report it.
    ///
    /// A disconnect that lands between the transition and the report may
    /// have sent its `false` first; the state is re-checked after sending
    /// and a trailing `false` restores the order. Returns whether the
    /// bridge is still active.
    async fn announce_active(&self) -> bool {
        if !self.transition(BridgeState::Connecting, BridgeState::Active) {
            return false;
        }
        let _ = self.events.send(LiveEvent::Status { active: true }).await;
        if self.get() == BridgeState::Active {
            return true;
        }
        let _ = self.events.send(LiveEvent::Status { active: false }).await;
        false
    }

    /// Enter `Disconnected`, reporting inactivity if the state changed
    async fn mark_disconnected(&self, reason: &str) {
        let changed = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            let changed = *state != BridgeState::Disconnected;
            *state = BridgeState::Disconnected;
            changed
        };
        if changed {
            tracing::info!(reason, "Live bridge disconnected");
            let _ = self.events.send(LiveEvent::Status { active: false }).await;
        }
    }
}

struct Session {
    lifecycle: Arc<Lifecycle>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Real-time voice session adapter
pub struct LiveBridge {
    config: LiveConfig,
    model: String,
    api_key: Option<String>,
    lifecycle: Mutex<Option<Arc<Lifecycle>>>,
    session: Mutex<Option<Session>>,
}

impl LiveBridge {
    pub fn new(config: LiveConfig, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            config,
            model: model.into(),
            api_key,
            lifecycle: Mutex::new(None),
            session: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> BridgeState {
        match self.lifecycle.lock().await.as_ref() {
            Some(lifecycle) => lifecycle.get(),
            None => BridgeState::Disconnected,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == BridgeState::Active
    }

    fn url(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}?key={}", self.config.endpoint, key),
            None => self.config.endpoint.clone(),
        }
    }

    /// Open the session and start streaming `input`.
    ///
    /// Events, including status changes, are delivered on `events`. A
    /// failure while connecting is reported both as an error and as
    /// `Status { active: false }`.
    pub async fn connect(
        &self,
        input: Box<dyn AudioInput>,
        events: mpsc::Sender<LiveEvent>,
    ) -> Result<()> {
        let lifecycle = {
            let mut current = self.lifecycle.lock().await;
            if let Some(existing) = current.as_ref() {
                if existing.get() != BridgeState::Disconnected {
                    return Err(Error::Transport("live session already open".to_string()));
                }
            }
            let lifecycle = Arc::new(Lifecycle {
                state: RwLock::new(BridgeState::Connecting),
                events,
            });
            *current = Some(lifecycle.clone());
            lifecycle
        };
        // A session that ended remotely is still parked here
        if let Some(stale) = self.session.lock().await.take() {
            stale.close("replaced").await;
        }
        tracing::info!(endpoint = %self.config.endpoint, model = %self.model, "Live bridge connecting");

        let mut socket = match self.open().await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::error!(error = %e, "Live bridge failed to connect");
                lifecycle.mark_disconnected("connect failed").await;
                return Err(e);
            }
        };

        if !lifecycle.announce_active().await {
            // disconnect() ran while the socket was opening
            let _ = socket.close(None).await;
            return Err(Error::Transport("connection cancelled".to_string()));
        }
        tracing::info!(input = input.name(), "Live bridge active");

        let (sink, stream) = socket.split();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let sender = tokio::spawn(stream_audio(
            sink,
            input,
            self.config.frame_samples,
            self.config.sample_rate,
            shutdown_rx.clone(),
        ));
        let receiver = tokio::spawn(receive_events(
            stream,
            lifecycle.clone(),
            shutdown.clone(),
            shutdown_rx,
        ));

        let mut slot = self.session.lock().await;
        if lifecycle.get() != BridgeState::Active {
            // disconnect() ran before the session was stored
            let _ = shutdown.send(true);
        }
        *slot = Some(Session {
            lifecycle,
            shutdown,
            tasks: vec![sender, receiver],
        });
        Ok(())
    }

    async fn open(&self) -> Result<Socket> {
        let (mut socket, _response) = connect_async(self.url())
            .await
            .map_err(|e| Error::Transport(format!("connect failed: {}", e)))?;
        socket
            .send(Message::Text(setup_message(&self.model, &self.config.voice_name)))
            .await
            .map_err(|e| Error::Transport(format!("setup failed: {}", e)))?;
        Ok(socket)
    }

    /// Stop streaming and close the channel. Safe to call repeatedly and
    /// before any session was established.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => session.close("disconnect requested").await,
            None => {
                // May still be connecting; a pending connect() sees this and aborts.
                let lifecycle = self.lifecycle.lock().await.clone();
                if let Some(lifecycle) = lifecycle {
                    lifecycle.mark_disconnected("disconnect requested").await;
                }
            }
        }
    }
}

impl Session {
    async fn close(self, reason: &str) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Live bridge task ended abnormally");
            }
        }
        self.lifecycle.mark_disconnected(reason).await;
    }
}

/// Frame input samples and send them until shutdown.
///
/// When the input ends the last partial frame is padded and sent, and the
/// socket stays open for responses until shutdown.
async fn stream_audio(
    mut sink: SplitSink<Socket, Message>,
    mut input: Box<dyn AudioInput>,
    frame_samples: usize,
    sample_rate: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut framer = Framer::new(frame_samples);
    let mut sent = 0usize;

    loop {
        let chunk = tokio::select! {
            _ = shutdown.changed() => break,
            chunk = input.read_chunk() => chunk,
        };
        let (frames, ended) = match chunk {
            Ok(Some(samples)) => (framer.push(&samples), false),
            Ok(None) => {
                tracing::info!(input = input.name(), "Audio input ended");
                (framer.flush().into_iter().collect(), true)
            }
            Err(e) => {
                tracing::error!(input = input.name(), error = %e, "Audio input failed");
                (Vec::new(), true)
            }
        };

        for frame in &frames {
            if let Err(e) = sink.send(Message::Text(realtime_input(frame, sample_rate))).await {
                tracing::error!(error = %e, "Failed to send audio frame");
                return;
            }
            sent += 1;
        }
        if !frames.is_empty() {
            tracing::trace!(frames = frames.len(), total = sent, "Sent audio frames");
        }

        if ended {
            if !*shutdown.borrow() {
                let _ = shutdown.changed().await;
            }
            break;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    tracing::debug!(frames = sent, "Audio streaming stopped");
}

/// Turn server messages into events until shutdown or a transport fault.
async fn receive_events(
    mut stream: SplitStream<Socket>,
    lifecycle: Arc<Lifecycle>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let reason = loop {
        let next = tokio::select! {
            _ = shutdown.changed() => return,
            next = stream.next() => next,
        };
        let raw = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!("Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Live service closed the session");
                break "closed by server";
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::error!(error = %e, "Live transport fault");
                break "transport fault";
            }
            None => break "stream ended",
        };

        let message = match ServerMessage::parse(&raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable live server message");
                continue;
            }
        };
        if message.setup_complete.is_some() {
            tracing::debug!("Live session setup complete");
        }
        for utterance in message.utterances() {
            tracing::debug!(from_user = utterance.is_from_user, "Live utterance");
            if lifecycle.events.send(utterance.into()).await.is_err() {
                tracing::debug!("Live event receiver dropped");
            }
        }
    };

    let _ = shutdown_tx.send(true);
    lifecycle.mark_disconnected(reason).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::protocol::VOICE_RESPONSE_PLACEHOLDER;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Yields fixed chunks, then either ends or stays silent forever
    struct ScriptedInput {
        chunks: VecDeque<Vec<i16>>,
        hold_open: bool,
    }

    #[async_trait]
    impl AudioInput for ScriptedInput {
        async fn read_chunk(&mut self) -> Result<Option<Vec<i16>>> {
            match self.chunks.pop_front() {
                Some(chunk) => Ok(Some(chunk)),
                None if self.hold_open => std::future::pending().await,
                None => Ok(None),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn input(chunks: Vec<Vec<i16>>, hold_open: bool) -> Box<dyn AudioInput> {
        Box::new(ScriptedInput {
            chunks: chunks.into(),
            hold_open,
        })
    }

    fn bridge(endpoint: String, frame_samples: usize) -> LiveBridge {
        let config = LiveConfig {
            endpoint,
            frame_samples,
            ..Default::default()
        };
        LiveBridge::new(config, "test-live-model", None)
    }

    async fn next_event(rx: &mut mpsc::Receiver<LiveEvent>) -> LiveEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for live event")
            .expect("event channel closed")
    }

    async fn text_of(ws: &mut WebSocketStream<TcpStream>) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Close(_) => panic!("unexpected close"),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_session_streams_frames_and_surfaces_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let setup = text_of(&mut ws).await;
            assert_eq!(setup["setup"]["model"], "models/test-live-model");
            assert_eq!(
                setup["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
                "Kore"
            );

            // 10 samples at 4 per frame: two full frames plus a padded one
            for _ in 0..3 {
                let frame = text_of(&mut ws).await;
                let chunk = &frame["realtimeInput"]["mediaChunks"][0];
                assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
                let bytes = BASE64.decode(chunk["data"].as_str().unwrap()).unwrap();
                assert_eq!(bytes.len(), 8);
            }

            ws.send(Message::Text(json!({"setupComplete": {}}).to_string())).await.unwrap();
            ws.send(Message::Text(
                json!({"serverContent": {"inputTranscription": {"text": "I feel scattered"}}}).to_string(),
            ))
            .await
            .unwrap();
            for _ in 0..2 {
                ws.send(Message::Binary(
                    json!({"serverContent": {"modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": "AAAA"}}]}}})
                        .to_string()
                        .into_bytes(),
                ))
                .await
                .unwrap();
            }

            // Wait for the client to close
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => continue,
                }
            }
        });

        let bridge = bridge(format!("ws://{}", addr), 4);
        let (tx, mut rx) = mpsc::channel(16);
        bridge
            .connect(input(vec![vec![1; 6], vec![2; 4]], false), tx)
            .await
            .unwrap();
        assert_eq!(bridge.state().await, BridgeState::Active);

        assert_eq!(next_event(&mut rx).await, LiveEvent::Status { active: true });
        assert_eq!(
            next_event(&mut rx).await,
            LiveEvent::Message {
                text: "I feel scattered".to_string(),
                is_from_user: true
            }
        );
        // Each audio message is surfaced on its own
        for _ in 0..2 {
            assert_eq!(
                next_event(&mut rx).await,
                LiveEvent::Message {
                    text: VOICE_RESPONSE_PLACEHOLDER.to_string(),
                    is_from_user: false
                }
            );
        }

        bridge.disconnect().await;
        assert_eq!(bridge.state().await, BridgeState::Disconnected);
        assert_eq!(next_event(&mut rx).await, LiveEvent::Status { active: false });

        bridge.disconnect().await;
        assert!(rx.try_recv().is_err());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_close_reports_inactive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let _setup = text_of(&mut ws).await;
            ws.close(None).await.unwrap();
        });

        let bridge = bridge(format!("ws://{}", addr), 4096);
        let (tx, mut rx) = mpsc::channel(16);
        bridge.connect(input(vec![], true), tx).await.unwrap();

        assert_eq!(next_event(&mut rx).await, LiveEvent::Status { active: true });
        assert_eq!(next_event(&mut rx).await, LiveEvent::Status { active: false });
        assert_eq!(bridge.state().await, BridgeState::Disconnected);

        // Cleaning up after a remote close emits nothing further
        bridge.disconnect().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport_fault() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let bridge = bridge(format!("ws://127.0.0.1:{}", port), 4096);
        let (tx, mut rx) = mpsc::channel(4);

        let err = bridge.connect(input(vec![], false), tx).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(next_event(&mut rx).await, LiveEvent::Status { active: false });
        assert_eq!(bridge.state().await, BridgeState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_during_activation_ends_inactive() {
        let (tx, mut rx) = mpsc::channel(1);
        let lifecycle = Arc::new(Lifecycle {
            state: RwLock::new(BridgeState::Connecting),
            events: tx,
        });
        // Fill the channel so the activation report has to wait
        lifecycle.events.send(LiveEvent::Status { active: false }).await.unwrap();

        let activating = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.announce_active().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(lifecycle.get(), BridgeState::Active);

        let disconnecting = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.mark_disconnected("disconnect requested").await }
        });
        tokio::task::yield_now().await;
        assert_eq!(lifecycle.get(), BridgeState::Disconnected);

        let mut statuses = Vec::new();
        for _ in 0..4 {
            match next_event(&mut rx).await {
                LiveEvent::Status { active } => statuses.push(active),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(!activating.await.unwrap());
        disconnecting.await.unwrap();
        assert_eq!(statuses.iter().filter(|active| **active).count(), 1);
        assert_eq!(statuses.last(), Some(&false));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_before_connect() {
        let bridge = bridge("ws://127.0.0.1:9".to_string(), 4096);
        bridge.disconnect().await;
        bridge.disconnect().await;
        assert_eq!(bridge.state().await, BridgeState::Disconnected);
        assert!(!bridge.is_active().await);
    }

    #[tokio::test]
    async fn test_second_connect_is_rejected_while_active() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let bridge = bridge(format!("ws://{}", addr), 4096);
        let (tx, _rx) = mpsc::channel(16);
        bridge.connect(input(vec![], true), tx.clone()).await.unwrap();
        let err = bridge.connect(input(vec![], true), tx).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(bridge.is_active().await);
        bridge.disconnect().await;
        assert!(!bridge.is_active().await);
    }
}
