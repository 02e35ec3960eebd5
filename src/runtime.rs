//! Where this process sits in the group.
//!
//! The launcher that starts one process per participant also tells each one
//! its rank and the group size through the environment. Our own variables
//! win; the ones exported by common MPI launchers are accepted as fallbacks.

use std::env;

use crate::{HistError, Result};

const RANK_VARS: &[&str] = &["HISTLITE_RANK", "OMPI_COMM_WORLD_RANK", "PMI_RANK"];
const SIZE_VARS: &[&str] = &["HISTLITE_WORLD_SIZE", "OMPI_COMM_WORLD_SIZE", "PMI_SIZE"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct World {
    pub rank: usize,
    pub size: usize,
}

impl World {
    /// A group of one, used when no launcher is present.
    pub const SOLO: World = World { rank: 0, size: 1 };

    pub fn new(rank: usize, size: usize) -> Result<Self> {
        if size == 0 || rank >= size {
            return Err(HistError::Configuration(format!(
                "rank {rank} is outside a group of {size}"
            )));
        }
        Ok(Self { rank, size })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`World::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rank = first_set(&lookup, RANK_VARS)?;
        let size = first_set(&lookup, SIZE_VARS)?;
        match (rank, size) {
            (None, None) => Ok(Self::SOLO),
            (Some(rank), Some(size)) => Self::new(rank, size),
            _ => Err(HistError::Configuration(format!(
                "the launcher must set both a rank ({}) and a group size ({})",
                RANK_VARS.join(" / "),
                SIZE_VARS.join(" / ")
            ))),
        }
    }
}

fn first_set(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Result<Option<usize>> {
    for key in keys {
        if let Some(raw) = lookup(key) {
            let value = raw.trim().parse::<usize>().map_err(|_| {
                HistError::Configuration(format!("{key}={raw:?} is not a non-negative integer"))
            })?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}
