//! HTTP collector for runtime profiling messages.
//!
//! Executing jobs report per-stage statistics with plain GET requests:
//!
//! - `/times?data=lineage;partitionId;parents;timeMillis` where `parents`
//!   is `parentLineage,pid1,pid2#parentLineage,pid...#`
//! - `/sizes?data=lineage:bytes;lineage:bytes;...`
//!
//! Handlers decode the payload and enqueue it; the response is `200 "ok"`
//! before the message is processed (fire-and-forget, the client treats
//! any other status as transient). A single worker task drains the queue
//! and is the sole writer to the shared profiler state. Malformed
//! payloads are logged and dropped - profiling is never fatal.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProfilingError, Result};

use super::DataflowProfiler;

/// Wait for in-flight messages before stopping the server.
pub const QUIESCENCE: Duration = Duration::from_secs(3);

/// One `/times` observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMsg {
    pub lineage: String,
    pub partition: i64,
    /// `(parent lineage, partition ids)` per upstream dependency
    pub parents: Vec<(String, Vec<i64>)>,
    pub time: u64,
}

/// One `/sizes` batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeMsg {
    pub entries: Vec<(String, u64)>,
}

/// Queue element between handlers and the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfilerMsg {
    Time(TimeMsg),
    Size(SizeMsg),
}

/// Decode `lineage;partitionId;parents;timeMillis`.
pub fn parse_time_payload(data: &str) -> Result<TimeMsg, ProfilingError> {
    let malformed = || ProfilingError::MalformedMessage {
        payload: data.to_string(),
    };
    let parts: Vec<&str> = data.split(';').collect();
    if parts.len() != 4 {
        return Err(malformed());
    }
    let lineage = parts[0].to_string();
    if lineage.is_empty() {
        return Err(malformed());
    }
    let partition: i64 = parts[1].parse().map_err(|_| malformed())?;
    let time: u64 = parts[3].parse().map_err(|_| malformed())?;

    let mut parents = Vec::new();
    for dep in parts[2].split('#').filter(|d| !d.is_empty()) {
        let mut fields = dep.split(',');
        let parent = fields.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        let mut pids = Vec::new();
        for pid in fields {
            pids.push(pid.parse::<i64>().map_err(|_| malformed())?);
        }
        parents.push((parent.to_string(), pids));
    }
    Ok(TimeMsg {
        lineage,
        partition,
        parents,
        time,
    })
}

/// Decode `lineage:bytes;lineage:bytes;...`.
pub fn parse_size_payload(data: &str) -> Result<SizeMsg, ProfilingError> {
    let malformed = || ProfilingError::MalformedMessage {
        payload: data.to_string(),
    };
    let mut entries = Vec::new();
    for entry in data.split(';').filter(|e| !e.is_empty()) {
        let (lineage, bytes) = entry.split_once(':').ok_or_else(malformed)?;
        if lineage.is_empty() {
            return Err(malformed());
        }
        entries.push((lineage.to_string(), bytes.parse().map_err(|_| malformed())?));
    }
    if entries.is_empty() {
        return Err(malformed());
    }
    Ok(SizeMsg { entries })
}

#[derive(Debug, Deserialize)]
struct DataParam {
    #[serde(default)]
    data: String,
}

type Tx = mpsc::UnboundedSender<ProfilerMsg>;

async fn times_handler(State(tx): State<Tx>, Query(params): Query<DataParam>) -> &'static str {
    match parse_time_payload(&params.data) {
        Ok(msg) => {
            let _ = tx.send(ProfilerMsg::Time(msg));
        }
        Err(e) => warn!(error = %e, "dropping malformed /times payload"),
    }
    "ok"
}

async fn sizes_handler(State(tx): State<Tx>, Query(params): Query<DataParam>) -> &'static str {
    match parse_size_payload(&params.data) {
        Ok(msg) => {
            let _ = tx.send(ProfilerMsg::Size(msg));
        }
        Err(e) => warn!(error = %e, "dropping malformed /sizes payload"),
    }
    "ok"
}

/// Running collector: HTTP server plus the single consumer worker.
pub struct Collector {
    port: u16,
    tx: Tx,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Collector {
    /// Bind the collector; port `0` picks a free port (tests).
    pub async fn start(profiler: Arc<Mutex<DataflowProfiler>>, port: u16) -> Result<Collector> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProfilerMsg>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/times", get(times_handler))
            .route("/sizes", get(sizes_handler))
            .with_state(tx.clone());

        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let bound = listener.local_addr()?.port();
        info!(port = bound, "profiling collector listening");

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "collector server terminated abnormally");
            }
        });

        let worker = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match profiler.lock() {
                    Ok(mut guard) => guard.handle(msg),
                    Err(poisoned) => poisoned.into_inner().handle(msg),
                }
            }
            debug!("collector worker drained");
        });

        Ok(Collector {
            port: bound,
            tx,
            shutdown_tx,
            server,
            worker,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Graceful stop: allow a quiescence window for stragglers, stop the
    /// server, then let the worker drain the remaining queue.
    pub async fn stop(self, quiescence: Duration) {
        tokio::time::sleep(quiescence).await;
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.server.await {
            warn!(error = %e, "collector server join failed");
        }
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "collector worker join failed");
        }
    }
}
