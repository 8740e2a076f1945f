//! Single-client streaming server
//!
//! Drives one device session from bind to release:
//! `Idle → Listening → DeviceConnected → ClientConnected → Streaming →
//! ShuttingDown → Closed`. Every loop step returns a `BridgeResult`; the first
//! error ends streaming and the server always goes through the same cleanup.

use crate::config::BridgeConfig;
use crate::framing::{encode_line, write_line};
use bridge_core::{
    decode_now, BridgeError, BridgeResult, ChannelBuffers, DeviceConnector, DeviceSession,
    MetricsPacket, ProcessedSample, RawSample,
};
use bridge_processing::MetricsEngine;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Packets between buffer diagnostics in the debug log
const STATS_LOG_INTERVAL: u64 = 50;

/// Lifecycle of a bridge server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    DeviceConnected,
    ClientConnected,
    Streaming,
    ShuttingDown,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::DeviceConnected => "device_connected",
            SessionState::ClientConnected => "client_connected",
            SessionState::Streaming => "streaming",
            SessionState::ShuttingDown => "shutting_down",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of one `run`
#[derive(Debug)]
pub struct RunSummary {
    pub session_id: Uuid,
    pub packets_sent: u64,
    pub samples_processed: u64,
    pub final_state: SessionState,
    /// Error that ended streaming, if any
    pub error: Option<BridgeError>,
    /// Release steps that failed during shutdown
    pub cleanup_failures: Vec<BridgeError>,
    /// ECG values held when the run ended
    pub ecg_buffered: usize,
    /// EDA values held when the run ended
    pub eda_buffered: usize,
}

impl RunSummary {
    /// True when the run ended without an error other than an interrupt
    pub fn is_clean(&self) -> bool {
        matches!(self.error, None | Some(BridgeError::Interrupted))
    }
}

/// Per-run processing context
struct StreamSession {
    buffers: ChannelBuffers,
    engine: MetricsEngine,
    packets_sent: u64,
    samples_processed: u64,
}

impl StreamSession {
    fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        Ok(Self {
            buffers: ChannelBuffers::new(config.buffer_capacity)?,
            engine: MetricsEngine::for_sampling_rate(f64::from(config.sampling_rate_hz)),
            packets_sent: 0,
            samples_processed: 0,
        })
    }

    /// Decode a batch into the buffers and package it with fresh metrics
    fn process_batch(&mut self, batch: &[RawSample]) -> MetricsPacket {
        let samples: Vec<ProcessedSample> = batch
            .iter()
            .map(|raw| {
                let sample = decode_now(raw);
                self.buffers.record(&sample);
                sample
            })
            .collect();
        self.samples_processed += samples.len() as u64;

        let metrics = self.engine.compute(&self.buffers);
        MetricsPacket {
            samples,
            heart_rate: metrics.heart_rate,
            stress_level: metrics.stress_level,
        }
    }

    fn log_buffer_stats(&self) {
        let (ecg, eda) = self.engine.buffer_stats(&self.buffers);
        debug!(
            packets = self.packets_sent,
            ecg_len = ecg.count,
            ecg_mean = ecg.mean,
            ecg_p2p = ecg.peak_to_peak,
            eda_len = eda.count,
            eda_mean = eda.mean,
            "Buffer statistics"
        );
    }
}

/// Await `fut` unless the token fires or the deadline passes first
async fn guarded<T, F>(
    cancel: &CancellationToken,
    deadline: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> BridgeResult<T>
where
    F: Future<Output = BridgeResult<T>>,
{
    let bounded = async {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(BridgeError::Timeout { operation })),
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Interrupted),
        result = bounded => result,
    }
}

/// Bridges one acquisition device to one TCP consumer
pub struct BridgeServer<C: DeviceConnector> {
    config: BridgeConfig,
    connector: C,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    cancel: CancellationToken,
    listener: Option<TcpListener>,
    device: Option<C::Session>,
    client: Option<TcpStream>,
    session: StreamSession,
    session_id: Uuid,
}

impl<C: DeviceConnector> BridgeServer<C> {
    pub fn new(config: BridgeConfig, connector: C) -> BridgeResult<Self> {
        Self::with_cancellation(config, connector, CancellationToken::new())
    }

    /// Server that stops when `cancel` fires
    pub fn with_cancellation(
        config: BridgeConfig,
        connector: C,
        cancel: CancellationToken,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let session = StreamSession::new(&config)?;
        let (state_tx, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            config,
            connector,
            state: SessionState::Idle,
            state_tx,
            cancel,
            listener: None,
            device: None,
            client: None,
            session,
            session_id: Uuid::new_v4(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Token that interrupts a running server
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Receiver that observes every state transition
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Bound address, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Bind the loopback listener. Calling it again returns the same address.
    pub fn bind(&mut self) -> BridgeResult<SocketAddr> {
        if self.state == SessionState::Closed {
            return Err(BridgeError::AlreadyClosed);
        }
        if let Some(listener) = &self.listener {
            return listener.local_addr().map_err(BridgeError::Bind);
        }

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.config.port));
        let socket = TcpSocket::new_v4().map_err(BridgeError::Bind)?;
        socket.set_reuseaddr(true).map_err(BridgeError::Bind)?;
        socket.bind(addr).map_err(BridgeError::Bind)?;
        let listener = socket.listen(1).map_err(BridgeError::Bind)?;
        let local = listener.local_addr().map_err(BridgeError::Bind)?;

        info!(addr = %local, "Listening for metrics client");
        self.listener = Some(listener);
        self.transition(SessionState::Listening);
        Ok(local)
    }

    /// Serve until the stream ends, then release everything
    ///
    /// Only `AlreadyClosed` is returned as an error; any failure during the
    /// run is reported in the summary.
    pub async fn run(&mut self) -> BridgeResult<RunSummary> {
        if self.state == SessionState::Closed {
            return Err(BridgeError::AlreadyClosed);
        }

        info!(session = %self.session_id, device = %self.config.device_address, "Starting bridge session");
        let error = match self.serve().await {
            Ok(()) => None,
            Err(BridgeError::Interrupted) => {
                info!("Streaming interrupted");
                Some(BridgeError::Interrupted)
            }
            Err(e) => {
                error!(error = %e, state = %self.state, "Streaming stopped");
                Some(e)
            }
        };

        let cleanup_failures = self.shutdown().await;

        Ok(RunSummary {
            session_id: self.session_id,
            packets_sent: self.session.packets_sent,
            samples_processed: self.session.samples_processed,
            final_state: self.state,
            error,
            cleanup_failures,
            ecg_buffered: self.session.buffers.ecg.len(),
            eda_buffered: self.session.buffers.eda.len(),
        })
    }

    async fn serve(&mut self) -> BridgeResult<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let cancel = self.cancel.clone();

        let device = guarded(
            &cancel,
            None,
            "device connection",
            self.connector.open(&self.config.device_address),
        )
        .await?;
        info!(device = %device.describe(), "Device link opened");

        let device = self.device.insert(device);
        guarded(
            &cancel,
            None,
            "acquisition start",
            device.start_acquisition(self.config.sampling_rate_hz, &self.config.channels),
        )
        .await?;
        info!(
            rate_hz = self.config.sampling_rate_hz,
            channels = ?self.config.channels,
            "Acquisition started"
        );
        self.transition(SessionState::DeviceConnected);

        let (stream, peer) = {
            let listener = self.listener.as_ref().ok_or_else(|| {
                BridgeError::Accept(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "listener is not bound",
                ))
            })?;
            guarded(&cancel, self.config.accept_timeout(), "client connection", async {
                listener.accept().await.map_err(BridgeError::Accept)
            })
            .await?
        };
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "Failed to disable Nagle on client socket");
        }
        info!(%peer, "Client connected");
        self.client = Some(stream);
        self.transition(SessionState::ClientConnected);

        self.transition(SessionState::Streaming);
        loop {
            if let Some(max) = self.config.max_packets {
                if self.session.packets_sent >= max {
                    info!(packets = self.session.packets_sent, "Packet limit reached");
                    return Ok(());
                }
            }
            self.stream_once(&cancel).await?;
        }
    }

    /// One iteration: read, decode, estimate, send
    async fn stream_once(&mut self, cancel: &CancellationToken) -> BridgeResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| BridgeError::read_failed("device is not connected"))?;
        let batch = guarded(
            cancel,
            self.config.read_timeout(),
            "device read",
            device.read_batch(self.config.batch_size),
        )
        .await?;

        let packet = self.session.process_batch(&batch);
        let line = encode_line(&packet)?;

        let client = self.client.as_mut().ok_or_else(|| {
            BridgeError::WriteFailed(io::Error::new(
                io::ErrorKind::NotConnected,
                "no client connected",
            ))
        })?;
        guarded(cancel, self.config.write_timeout(), "client write", write_line(client, &line))
            .await?;

        self.session.packets_sent += 1;
        debug!(
            packet = self.session.packets_sent,
            samples = packet.samples.len(),
            heart_rate = packet.heart_rate,
            stress_level = packet.stress_level,
            "Packet sent"
        );
        if self.session.packets_sent % STATS_LOG_INTERVAL == 0 {
            self.session.log_buffer_stats();
        }
        Ok(())
    }

    /// Release the device, client and listener
    ///
    /// Each step runs regardless of the others. Failures are logged and
    /// returned, never raised. On a closed server this does nothing.
    pub async fn shutdown(&mut self) -> Vec<BridgeError> {
        if self.state == SessionState::Closed {
            debug!("Shutdown on closed server ignored");
            return Vec::new();
        }
        self.transition(SessionState::ShuttingDown);

        let mut failures = Vec::new();

        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop().await {
                failures.push(BridgeError::CleanupFailed {
                    step: "device_stop",
                    reason: e.to_string(),
                });
            }
            device.close().await;
            info!(device = %device.describe(), "Device released");
        }

        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.shutdown().await {
                failures.push(BridgeError::CleanupFailed {
                    step: "client_shutdown",
                    reason: e.to_string(),
                });
            }
            debug!("Client connection closed");
        }

        if self.listener.take().is_some() {
            debug!("Listener released");
        }

        for failure in &failures {
            warn!(error = %failure, "Cleanup step failed");
        }

        self.transition(SessionState::Closed);
        info!(
            session = %self.session_id,
            packets = self.session.packets_sent,
            samples = self.session.samples_processed,
            "Bridge closed"
        );
        failures
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "State transition");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}
