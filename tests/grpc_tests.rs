use std::net::SocketAddr;
use std::time::Duration;

use histlite::aggregate::grpc::{GrpcCoordinator, GrpcParticipant};
use histlite::aggregate::{reduce_to_coordinator, Communicator, Message, Verdict};
use histlite::driver::run_node;
use histlite::source::SourceFormat;
use histlite::{HistError, Histogram};
use tempfile::tempdir;

mod common;
use common::*;

const PATIENCE: Duration = Duration::from_secs(10);

async fn coordinator(size: usize) -> (GrpcCoordinator, String) {
    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let coordinator = GrpcCoordinator::bind(any_port, size).await.unwrap();
    let addr = coordinator.local_addr().to_string();
    (coordinator, addr)
}

#[tokio::test]
async fn full_run_over_grpc() {
    let dir = tempdir().unwrap();
    let xs: Vec<f32> = (0..41).map(|i| i as f32).collect();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &xs);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &xs);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let (mut root, addr) = coordinator(3).await;
    let mut workers = Vec::new();
    for rank in 1..3 {
        let job = job.clone();
        let addr = addr.clone();
        workers.push(tokio::spawn(async move {
            let mut comm = GrpcParticipant::connect(&addr, rank, 3, PATIENCE).await?;
            run_node(&mut comm, &job).await
        }));
    }

    let merged = run_node(&mut root, &job).await.unwrap().unwrap();
    for worker in workers {
        assert!(worker.await.unwrap().unwrap().is_none());
    }
    root.shutdown().await.unwrap();

    // 2i for i in 0..41: bins 0, 2, .., 78 once each, everything >= 80 in 79
    assert_eq!(merged.total(), 41);
    assert_eq!(merged.counts()[0], 1);
    assert_eq!(merged.counts()[1], 0);
    assert_eq!(merged.counts()[78], 1);
    assert_eq!(merged.counts()[79], 1);
    assert_eq!(read_report(&job.output).len(), 80);
}

#[tokio::test]
async fn abort_verdict_reaches_remote_participants() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &[1.0; 7]);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let (root, addr) = coordinator(2).await;
    let mut root = root.with_abort_linger(PATIENCE);
    let worker = {
        let job = job.clone();
        tokio::spawn(async move {
            let mut comm = GrpcParticipant::connect(&addr, 1, 2, PATIENCE).await?;
            run_node(&mut comm, &job).await
        })
    };

    let outcome = run_node(&mut root, &job).await;
    assert!(matches!(
        worker.await.unwrap(),
        Err(HistError::Configuration(_))
    ));
    // the run's own failure survives the shutdown
    assert!(matches!(
        root.finish(outcome).await,
        Err(HistError::Configuration(_))
    ));
}

#[tokio::test]
async fn finish_hands_back_a_successful_run() {
    let (root, _addr) = coordinator(2).await;
    assert_eq!(root.finish(Ok(7)).await.unwrap(), 7);
}

#[tokio::test]
async fn out_of_group_ranks_are_refused() {
    let (mut root, addr) = coordinator(2).await;
    assert!(matches!(
        GrpcParticipant::connect(&addr, 0, 2, PATIENCE).await,
        Err(HistError::Configuration(_))
    ));
    assert!(GrpcParticipant::connect(&addr, 2, 2, PATIENCE).await.is_err());

    // a participant that believes the group is bigger is refused by the server
    let mut stray = GrpcParticipant::connect(&addr, 5, 6, PATIENCE).await.unwrap();
    root.broadcast_verdict(Verdict::Proceed { total: 10 })
        .await
        .unwrap();
    assert!(matches!(
        stray.await_verdict().await,
        Err(HistError::Transport(_))
    ));
    assert!(stray
        .send(Message::Histogram {
            rank: 5,
            histogram: Histogram::from_counts(vec![1]).unwrap(),
        })
        .await
        .is_err());
    root.shutdown().await.unwrap();
}

#[tokio::test]
async fn silent_participant_times_out() {
    let (mut root, addr) = coordinator(2).await;
    let _idle = GrpcParticipant::connect(&addr, 1, 2, PATIENCE).await.unwrap();
    let err = reduce_to_coordinator(
        &mut root,
        Histogram::from_counts(vec![0; 4]).unwrap(),
        Some(Duration::from_millis(100)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HistError::Transport(_)), "{err}");
    root.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreachable_coordinator_gives_up() {
    // bind then drop to get a port nobody listens on
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let err = GrpcParticipant::connect(&addr, 1, 2, Duration::from_millis(300))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, HistError::Transport(_)), "{err}");
}
