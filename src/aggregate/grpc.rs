//! The group spread over processes, talking gRPC.
//!
//! The coordinator hosts the `Collective` service. Participants call
//! `Preflight`, which parks until the coordinator has broadcast its verdict,
//! then `Contribute` once with their histogram. Contributions are forwarded
//! untouched into the coordinator's inbox, so a malformed block surfaces as
//! an error in the reduction rather than being dropped at the edge.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tonic::transport::server::TcpIncoming;
use tonic::transport::{Channel, Server};
use tonic::{Request, Response, Status};

use super::{wrong_role, Communicator, Message, Verdict};
use crate::wire::collective_client::CollectiveClient;
use crate::wire::collective_server::{Collective, CollectiveServer};
use crate::wire::{Ack, HistogramBlock, PreflightRequest, PreflightVerdict};
use crate::{HistError, Result, COORDINATOR};

/// How long an aborting coordinator waits for participants to fetch the
/// verdict before it shuts down anyway.
pub const DEFAULT_ABORT_LINGER: Duration = Duration::from_secs(30);

const CONNECT_RETRY: Duration = Duration::from_millis(250);

/////////////////////////////////////////////////////////////////////////////
// Coordinator side
/////////////////////////////////////////////////////////////////////////////

struct CollectiveService {
    size: usize,
    inbox: mpsc::UnboundedSender<HistogramBlock>,
    verdict: watch::Receiver<Option<Verdict>>,
    fetched: mpsc::UnboundedSender<usize>,
}

impl CollectiveService {
    fn check_rank(&self, rank: u32) -> Result<usize, Status> {
        let rank = rank as usize;
        if rank == COORDINATOR || rank >= self.size {
            return Err(Status::invalid_argument(format!(
                "rank {rank} is not a participant in a group of {}",
                self.size
            )));
        }
        Ok(rank)
    }
}

#[tonic::async_trait]
impl Collective for CollectiveService {
    async fn preflight(
        &self,
        request: Request<PreflightRequest>,
    ) -> Result<Response<PreflightVerdict>, Status> {
        let rank = self.check_rank(request.get_ref().rank)?;
        tracing::debug!(rank, "participant waiting for verdict");
        let mut verdict = self.verdict.clone();
        let decided = verdict
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Status::unavailable("coordinator went away before deciding"))?
            .clone();
        let decided = decided.ok_or_else(|| Status::internal("empty verdict"))?;
        let _ = self.fetched.send(rank);
        Ok(Response::new(decided.into()))
    }

    async fn contribute(
        &self,
        request: Request<HistogramBlock>,
    ) -> Result<Response<Ack>, Status> {
        let block = request.into_inner();
        self.check_rank(block.rank)?;
        self.inbox
            .send(block)
            .map_err(|_| Status::unavailable("coordinator is no longer receiving"))?;
        Ok(Response::new(Ack {}))
    }
}

/// Rank 0, serving the `Collective` service for the rest of the group.
pub struct GrpcCoordinator {
    size: usize,
    local_addr: SocketAddr,
    inbox: mpsc::UnboundedReceiver<HistogramBlock>,
    verdict_tx: watch::Sender<Option<Verdict>>,
    fetched: mpsc::UnboundedReceiver<usize>,
    abort_linger: Duration,
    stop: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<Result<(), tonic::transport::Error>>>,
}

impl GrpcCoordinator {
    /// Starts serving on `addr` for a group of `size` ranks.
    pub async fn bind(addr: SocketAddr, size: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HistError::Transport(format!("cannot listen on {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| HistError::Transport(format!("cannot listen on {addr}: {e}")))?;
        let incoming = TcpIncoming::from_listener(listener, true, None)
            .map_err(|e| HistError::Transport(format!("cannot listen on {addr}: {e}")))?;

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (fetched_tx, fetched) = mpsc::unbounded_channel();
        let (verdict_tx, verdict_rx) = watch::channel(None);
        let service = CollectiveService {
            size,
            inbox: inbox_tx,
            verdict: verdict_rx,
            fetched: fetched_tx,
        };

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(
            Server::builder()
                .add_service(CollectiveServer::new(service))
                .serve_with_incoming_shutdown(incoming, async {
                    let _ = stopped.await;
                }),
        );
        tracing::info!(%local_addr, size, "coordinator listening");

        Ok(Self {
            size,
            local_addr,
            inbox,
            verdict_tx,
            fetched,
            abort_linger: DEFAULT_ABORT_LINGER,
            stop: Some(stop),
            server: Some(server),
        })
    }

    pub fn with_abort_linger(mut self, linger: Duration) -> Self {
        self.abort_linger = linger;
        self
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the server and waits for in-flight calls to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(server) = self.server.take() {
            server
                .await
                .map_err(|e| HistError::Transport(format!("server task failed: {e}")))??;
        }
        Ok(())
    }

    /// Shuts down after a run, returning the run's own `outcome`.
    ///
    /// A failed run keeps its error; a shutdown failure is only logged then.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match (outcome, self.shutdown().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(stop_err)) => Err(stop_err),
            (Err(err), stop) => {
                if let Err(stop_err) = stop {
                    tracing::warn!(error = %stop_err, "coordinator shutdown failed");
                }
                Err(err)
            }
        }
    }

    /// Waits until every participant has picked up the verdict, or the
    /// linger runs out.
    async fn drain_fetches(&mut self) {
        let mut seen = HashSet::new();
        let deadline = Instant::now() + self.abort_linger;
        while seen.len() + 1 < self.size {
            match timeout(deadline.saturating_duration_since(Instant::now()), self.fetched.recv()).await {
                Ok(Some(rank)) => {
                    seen.insert(rank);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        fetched = seen.len(),
                        expected = self.size - 1,
                        "giving up on participants that never asked for the verdict"
                    );
                    break;
                }
            }
        }
    }
}

impl Drop for GrpcCoordinator {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[tonic::async_trait]
impl Communicator for GrpcCoordinator {
    fn rank(&self) -> usize {
        COORDINATOR
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast_verdict(&mut self, verdict: Verdict) -> Result<()> {
        let aborting = matches!(verdict, Verdict::Abort { .. });
        self.verdict_tx.send_replace(Some(verdict));
        if aborting {
            self.drain_fetches().await;
        }
        Ok(())
    }

    async fn await_verdict(&mut self) -> Result<Verdict> {
        Err(wrong_role("wait for its own verdict", COORDINATOR))
    }

    async fn send(&mut self, _message: Message) -> Result<()> {
        Err(wrong_role("send to itself", COORDINATOR))
    }

    async fn recv(&mut self) -> Result<Message> {
        let block = self
            .inbox
            .recv()
            .await
            .ok_or_else(|| HistError::Transport("collective service stopped".into()))?;
        Message::try_from(block)
    }
}

/////////////////////////////////////////////////////////////////////////////
// Participant side
/////////////////////////////////////////////////////////////////////////////

/// A rank other than 0, holding a client to the coordinator.
pub struct GrpcParticipant {
    rank: usize,
    size: usize,
    client: CollectiveClient<Channel>,
}

impl GrpcParticipant {
    /// Connects to the coordinator at `coordinator` (`host:port` or a full
    /// URI), retrying until `patience` runs out since the coordinator may
    /// still be starting.
    pub async fn connect(coordinator: &str, rank: usize, size: usize, patience: Duration) -> Result<Self> {
        if rank == COORDINATOR || rank >= size {
            return Err(HistError::Configuration(format!(
                "rank {rank} is not a participant in a group of {size}"
            )));
        }
        let endpoint = if coordinator.contains("://") {
            coordinator.to_string()
        } else {
            format!("http://{coordinator}")
        };
        let deadline = Instant::now() + patience;
        let client = loop {
            match CollectiveClient::connect(endpoint.clone()).await {
                Ok(client) => break client,
                Err(e) if Instant::now() < deadline => {
                    tracing::debug!(rank, %endpoint, error = %e, "coordinator not reachable yet");
                    sleep(CONNECT_RETRY).await;
                }
                Err(e) => {
                    return Err(HistError::Transport(format!(
                        "could not reach coordinator at {endpoint} within {patience:?}: {e}"
                    )))
                }
            }
        };
        tracing::info!(rank, %endpoint, "connected to coordinator");
        Ok(Self { rank, size, client })
    }
}

#[tonic::async_trait]
impl Communicator for GrpcParticipant {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast_verdict(&mut self, _verdict: Verdict) -> Result<()> {
        Err(wrong_role("broadcast a verdict", self.rank))
    }

    async fn await_verdict(&mut self) -> Result<Verdict> {
        let request = Request::new(PreflightRequest {
            rank: self.rank as u32,
        });
        let verdict = self.client.preflight(request).await?.into_inner();
        Verdict::try_from(verdict)
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        self.client
            .contribute(Request::new(HistogramBlock::from(message)))
            .await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message> {
        Err(wrong_role("receive histograms", self.rank))
    }
}
