//! A whole group inside one process, one tokio task per rank.
//!
//! Participants share one unbounded channel into the coordinator, so a send
//! never blocks, and the verdict is published on a watch channel.

use tokio::sync::{mpsc, watch};

use super::{wrong_role, Communicator, Message, Verdict};
use crate::{HistError, Result, COORDINATOR};

pub struct LocalComm {
    rank: usize,
    size: usize,
    /// Present only on the coordinator.
    inbox: Option<mpsc::UnboundedReceiver<Message>>,
    /// Present only on participants.
    outbox: Option<mpsc::UnboundedSender<Message>>,
    /// Present only on the coordinator.
    verdict_tx: Option<watch::Sender<Option<Verdict>>>,
    verdict_rx: watch::Receiver<Option<Verdict>>,
}

/// Creates `size` connected communicators, indexed by rank.
pub fn local_world(size: usize) -> Vec<LocalComm> {
    let (outbox, inbox) = mpsc::unbounded_channel();
    let (verdict_tx, verdict_rx) = watch::channel(None);
    let mut inbox = Some(inbox);
    let mut verdict_tx = Some(verdict_tx);
    (0..size)
        .map(|rank| {
            let coordinator = rank == COORDINATOR;
            LocalComm {
                rank,
                size,
                inbox: if coordinator { inbox.take() } else { None },
                outbox: (!coordinator).then(|| outbox.clone()),
                verdict_tx: if coordinator { verdict_tx.take() } else { None },
                verdict_rx: verdict_rx.clone(),
            }
        })
        .collect()
}

#[tonic::async_trait]
impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast_verdict(&mut self, verdict: Verdict) -> Result<()> {
        let tx = self
            .verdict_tx
            .as_ref()
            .ok_or_else(|| wrong_role("broadcast a verdict", self.rank))?;
        // send_replace succeeds even if every participant is already gone
        tx.send_replace(Some(verdict));
        Ok(())
    }

    async fn await_verdict(&mut self) -> Result<Verdict> {
        if self.verdict_tx.is_some() {
            return Err(wrong_role("wait for its own verdict", self.rank));
        }
        let verdict = self
            .verdict_rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                HistError::Transport("coordinator went away before deciding".into())
            })?
            .clone();
        verdict.ok_or_else(|| HistError::Transport("empty verdict".into()))
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        let outbox = self
            .outbox
            .as_ref()
            .ok_or_else(|| wrong_role("send to itself", self.rank))?;
        outbox
            .send(message)
            .map_err(|_| HistError::Transport("coordinator is no longer receiving".into()))
    }

    async fn recv(&mut self) -> Result<Message> {
        let rank = self.rank;
        let inbox = self
            .inbox
            .as_mut()
            .ok_or_else(|| wrong_role("receive histograms", rank))?;
        inbox
            .recv()
            .await
            .ok_or_else(|| HistError::Transport("every participant hung up".into()))
    }
}
