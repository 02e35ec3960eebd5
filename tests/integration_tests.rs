use histlite::driver::run_local_group;
use histlite::source::SourceFormat;
use histlite::HistError;
use tempfile::tempdir;

mod common;
use common::*;

#[tokio::test]
async fn ones_split_over_two_ranks_land_in_bin_two() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &[1.0; 8]);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let outcomes = run_group(&job, 2).await;
    let merged = outcomes[0].as_ref().unwrap().as_ref().unwrap();
    assert!(matches!(outcomes[1], Ok(None)));
    assert_eq!(merged.num_bins(), 80);
    assert_eq!(merged.counts()[2], 8);
    assert_eq!(merged.total(), 8);

    let report = read_report(&job.output);
    assert_eq!(report.len(), 80);
    for (line, (bin, count)) in report.into_iter().enumerate() {
        assert_eq!(bin, line);
        assert_eq!(count, if bin == 2 { 8 } else { 0 });
    }
}

#[tokio::test]
async fn result_does_not_depend_on_group_size() {
    let dir = tempdir().unwrap();
    let xs: Vec<f32> = (0..97).map(|i| (i % 23) as f32 * 1.7).collect();
    let ys: Vec<f32> = (0..97).map(|i| (i % 11) as f32 * 3.1 - 5.0).collect();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &xs);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &ys);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let solo = run_group(&job, 1).await.remove(0).unwrap().unwrap();
    assert_eq!(solo.total(), 97);
    for participants in [2, 3, 7, 13, 97] {
        let merged = run_group(&job, participants)
            .await
            .remove(0)
            .unwrap()
            .unwrap();
        assert_eq!(merged, solo, "P={participants}");
    }
}

#[tokio::test]
async fn text_and_binary_inputs_agree() {
    let dir = tempdir().unwrap();
    let xs: Vec<f32> = (0..30).map(|i| i as f32 * 2.5).collect();
    let ys: Vec<f32> = (0..30).map(|i| 100.0 - i as f32 * 4.0).collect();

    let bin_job = job(
        dir.path(),
        write(dir.path(), "a.bin", SourceFormat::Binary, &xs),
        write(dir.path(), "b.bin", SourceFormat::Binary, &ys),
        SourceFormat::Binary,
    );
    let mut text_job = job(
        dir.path(),
        write(dir.path(), "a.txt", SourceFormat::Text, &xs),
        write(dir.path(), "b.txt", SourceFormat::Text, &ys),
        SourceFormat::Text,
    );
    text_job.output = dir.path().join("hist-text.txt");

    let from_bin = run_group(&bin_job, 4).await.remove(0).unwrap().unwrap();
    let from_text = run_group(&text_job, 4).await.remove(0).unwrap().unwrap();
    assert_eq!(from_bin, from_text);
    assert_eq!(from_bin.total(), 30);
}

#[tokio::test]
async fn too_many_participants_fails_before_reading() {
    let dir = tempdir().unwrap();
    // headers claim 3 elements but no bodies follow: any slice read would be
    // a short read, so a configuration error proves nothing was read
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    std::fs::write(&a, 3i32.to_ne_bytes()).unwrap();
    std::fs::write(&b, 3i32.to_ne_bytes()).unwrap();
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let outcomes = run_group(&job, 5).await;
    assert_eq!(outcomes.len(), 5);
    for outcome in outcomes {
        assert!(
            matches!(outcome, Err(HistError::Configuration(_))),
            "{outcome:?}"
        );
    }
    assert!(!job.output.exists());
}

#[tokio::test]
async fn mismatched_lengths_abort_every_rank() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &[1.0; 7]);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    for outcome in run_group(&job, 3).await {
        match outcome {
            Err(HistError::Configuration(msg)) => assert!(msg.contains("differ"), "{msg}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert!(!job.output.exists());
}

#[tokio::test]
async fn participant_short_read_fails_the_coordinator_fast() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    // declares 8 elements but only holds 5, so rank 1's slice [4, 8) is short
    let b = dir.path().join("b.bin");
    let mut raw = 8i32.to_ne_bytes().to_vec();
    for _ in 0..5 {
        raw.extend_from_slice(&1.0f32.to_ne_bytes());
    }
    std::fs::write(&b, raw).unwrap();
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let outcomes = run_group(&job, 2).await;
    assert!(matches!(
        outcomes[1],
        Err(HistError::ShortRead { offset: 4, end: 8, available: 5, .. })
    ));
    assert!(matches!(
        outcomes[0],
        Err(HistError::ParticipantFailed { rank: 1, .. })
    ));
    assert!(!job.output.exists());
}

#[tokio::test]
async fn local_group_runs_every_rank_in_one_process() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &[1.0; 8]);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    let merged = run_local_group(job.clone(), 2).await.unwrap();
    assert_eq!(merged.counts()[2], 8);
    assert_eq!(merged.total(), 8);
    assert_eq!(read_report(&job.output).len(), 80);

    assert!(matches!(
        run_local_group(job, 0).await,
        Err(HistError::Configuration(_))
    ));
}

#[tokio::test]
async fn local_group_reports_the_failure() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", SourceFormat::Binary, &[1.0; 8]);
    let b = write(dir.path(), "b.bin", SourceFormat::Binary, &[1.0; 6]);
    let job = job(dir.path(), a, b, SourceFormat::Binary);

    assert!(matches!(
        run_local_group(job, 3).await,
        Err(HistError::Configuration(_))
    ));
}
