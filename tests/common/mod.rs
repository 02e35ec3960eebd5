#![allow(dead_code)]

use std::path::{Path, PathBuf};

use histlite::aggregate::local::local_world;
use histlite::combine;
use histlite::driver::{run_node, Job};
use histlite::source::{binary, text, SourceFormat};
use histlite::{BinLayout, HistError, Histogram};

pub fn job(dir: &Path, a: PathBuf, b: PathBuf, format: SourceFormat) -> Job {
    Job {
        a,
        b,
        format,
        layout: BinLayout::new(80).unwrap(),
        kernel: combine::named("sum").unwrap(),
        output: dir.join("hist.txt"),
        receive_timeout: None,
    }
}

pub fn write(dir: &Path, name: &str, format: SourceFormat, values: &[f32]) -> PathBuf {
    let path = dir.join(name);
    match format {
        SourceFormat::Binary => binary::write_vector(&path, values).unwrap(),
        SourceFormat::Text => text::write_vector(&path, values).unwrap(),
    }
    path
}

/// Runs every rank of a local group and returns each rank's outcome.
pub async fn run_group(job: &Job, participants: usize) -> Vec<Result<Option<Histogram>, HistError>> {
    let handles: Vec<_> = local_world(participants)
        .into_iter()
        .map(|mut comm| {
            let job = job.clone();
            tokio::spawn(async move { run_node(&mut comm, &job).await })
        })
        .collect();
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

pub fn read_report(path: &Path) -> Vec<(usize, u64)> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (bin, count) = line.split_once(", ").unwrap();
            (bin.parse().unwrap(), count.parse().unwrap())
        })
        .collect()
}
