//! Sampling job: rounds of parallel walk generation with a checkpoint after
//! every round.
//!
//! Workers never share a table. Each one fills a private [`MetapathTable`]
//! from its own seeded RNG; the round's tables are merged before the
//! checkpoint is written, so a checkpoint always reflects whole rounds.
//!
//! Worker RNGs are keyed by the number of walks already in the table when the
//! round starts, not by the round's position in this call. A resumed job
//! therefore continues the stream instead of replaying the first leg.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::MetapathTable;
use crate::artifact::{Checkpointer, ResumeError};
use crate::graph::KnowledgeGraph;
use crate::sampler::{SamplerConfig, WalkError, WalkSampler};

/// Cooperative cancellation, checked between walks.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag, for signal handler registration.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JobConfig {
    /// Target number of absorbed walks, counting any resumed ones.
    pub num_walks: u64,
    pub checkpoint_every: u64,
    /// `None` draws a fresh seed (logged so the run can be replayed).
    pub seed: Option<u64>,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
    pub sampler: SamplerConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            num_walks: 1_000_000,
            checkpoint_every: 100_000_000,
            seed: None,
            threads: 0,
            sampler: SamplerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Walks in the table when the job ended (resumed walks included).
    pub absorbed: u64,
    /// Walks sampled by this job.
    pub sampled: u64,
    pub stopped: bool,
    pub seed: u64,
    pub rounds: u64,
    pub elapsed: Duration,
}

/// `offset` is the table's walk count at the start of the round; it grows
/// strictly from round to round, across resumes included.
fn worker_seed(seed: u64, offset: u64, worker: usize) -> u64 {
    seed ^ offset.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (worker as u64 + 1).wrapping_mul(0xbf58_476d_1ce4_e5b9)
}

/// Every metapath already in `table` must have been sampled at `length` hops.
fn check_resumed_length(table: &MetapathTable, length: usize) -> Result<(), ResumeError> {
    match table
        .iter()
        .map(|(key, _)| key.edges().len())
        .find(|&found| found != length)
    {
        Some(found) => Err(ResumeError::LengthMismatch {
            expected: length,
            found,
        }),
        None => Ok(()),
    }
}

/// Sample until `table` holds `config.num_walks` walks or `stop` fires.
///
/// A completed job also writes the final artifact. A stopped job leaves only
/// the working checkpoint, from which it can be resumed. A non-empty `table`
/// sampled at a different walk length is rejected before any walk is drawn.
pub fn run_sampling(
    graph: &KnowledgeGraph,
    config: &JobConfig,
    table: &mut MetapathTable,
    checkpointer: &mut Checkpointer,
    stop: &StopToken,
) -> Result<JobOutcome> {
    let sampler = WalkSampler::new(graph.adjacency(), config.sampler)?;
    check_resumed_length(table, config.sampler.length)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    let workers = pool.current_num_threads().max(1);
    let round_size = config.checkpoint_every.max(1);
    let start_absorbed = table.absorbed();

    tracing::info!(
        seed,
        workers,
        target = config.num_walks,
        resumed = start_absorbed,
        length = config.sampler.length,
        "sampling walks"
    );

    let start = Instant::now();
    let mut rounds: u64 = 0;
    while table.absorbed() < config.num_walks && !stop.is_stopped() {
        let quota = round_size.min(config.num_walks - table.absorbed());
        let per_worker = quota / workers as u64;
        let extra = quota % workers as u64;
        let offset = table.absorbed();

        let results: Vec<(MetapathTable, Option<WalkError>)> = pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|w| {
                    let n = per_worker + u64::from((w as u64) < extra);
                    let mut rng = StdRng::seed_from_u64(worker_seed(seed, offset, w));
                    let mut local = MetapathTable::new();
                    for _ in 0..n {
                        if stop.is_stopped() {
                            break;
                        }
                        match sampler.generate(&mut rng) {
                            Ok(walk) => {
                                local.absorb(&walk, graph.node_categories(), graph.one_hop());
                            }
                            Err(err) => return (local, Some(err)),
                        }
                    }
                    (local, None)
                })
                .collect()
        });

        let mut failure = None;
        for (local, err) in results {
            table.merge(local);
            if failure.is_none() {
                failure = err;
            }
        }
        rounds += 1;
        checkpointer.checkpoint(table);

        let secs = start.elapsed().as_secs_f64().max(f64::EPSILON);
        let sampled = table.absorbed() - start_absorbed;
        tracing::info!(
            absorbed = table.absorbed(),
            metapaths = table.len(),
            walks_per_sec = (sampled as f64 / secs) as u64,
            "sampling progress"
        );

        if let Some(err) = failure {
            return Err(err.into());
        }
    }

    let stopped = table.absorbed() < config.num_walks;
    if stopped {
        tracing::warn!(
            absorbed = table.absorbed(),
            target = config.num_walks,
            checkpoint = %checkpointer.working_path().display(),
            "sampling stopped early"
        );
    } else {
        checkpointer.write_final(table)?;
    }

    Ok(JobOutcome {
        absorbed: table.absorbed(),
        sampled: table.absorbed() - start_absorbed,
        stopped,
        seed,
        rounds,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_seeds_differ() {
        let a = worker_seed(7, 0, 0);
        let b = worker_seed(7, 0, 1);
        let c = worker_seed(7, 250, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, worker_seed(7, 0, 0));
    }

    #[test]
    fn resumed_table_must_match_walk_length() {
        let mut table = MetapathTable::new();
        assert!(check_resumed_length(&table, 3).is_ok());
        let two_hop = crate::aggregate::MetaWalk::new(vec![0, 1, 0], vec![1, -1]).unwrap();
        table.record(two_hop, crate::aggregate::WitnessSet::empty(), 4);
        assert!(check_resumed_length(&table, 2).is_ok());
        let err = check_resumed_length(&table, 3).unwrap_err();
        assert!(matches!(
            err,
            ResumeError::LengthMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn stop_token_is_shared_between_clones() {
        let token = StopToken::new();
        let clone = token.clone();
        clone.stop();
        assert!(token.is_stopped());
        assert!(token.flag().load(Ordering::Relaxed));
    }
}
