//! Running the deposit pass on a pool of worker threads.
//!
//! Chunk columns are moved into the pool with their task and handed back in
//! the result. The catalog and its generators are shared read-only; every
//! worker owns its own [`LcgRandom`], reseeded per source chunk by the pass.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use glam::IVec2;
use strata_voxel::{BlockPlacer, ChunkColumn, DirectPlacer};

use crate::pass::{DepositPass, NeighbourRegions, PassStats};
use crate::random::LcgRandom;

/// A chunk column waiting for its deposits.
pub struct DepositTask {
    /// Chunk x/z of `column`.
    pub chunk: IVec2,
    pub column: ChunkColumn,
    /// Placement callback used for every block of this chunk.
    pub placer: Box<dyn BlockPlacer + Send>,
    /// Regions of the source chunks around `chunk`.
    pub regions: NeighbourRegions,
}

impl DepositTask {
    /// A task that writes blocks straight into the column.
    pub fn new(chunk_x: i32, chunk_z: i32, column: ChunkColumn) -> Self {
        Self {
            chunk: IVec2::new(chunk_x, chunk_z),
            column,
            placer: Box::new(DirectPlacer),
            regions: NeighbourRegions::new(),
        }
    }

    /// Gates source chunks by `regions` instead of the column's own region.
    pub fn with_regions(mut self, regions: NeighbourRegions) -> Self {
        self.regions = regions;
        self
    }
}

/// A column with its deposits generated.
#[derive(Debug)]
pub struct DepositedChunk {
    pub chunk: IVec2,
    pub column: ChunkColumn,
    pub stats: PassStats,
    /// Time spent in the pass, in microseconds.
    pub generation_time_us: u64,
}

struct QueuedTask {
    task: DepositTask,
    cancelled: Arc<AtomicBool>,
}

/// Worker pool around a shared [`DepositPass`].
pub struct AsyncDepositPass {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<DepositedChunk>,
    active_tasks: Arc<DashMap<IVec2, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
}

impl AsyncDepositPass {
    /// Starts `thread_count` workers. At most `capacity` tasks may be queued
    /// and `capacity` results buffered.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned.
    pub fn new(pass: Arc<DepositPass>, world_seed: i64, thread_count: usize, capacity: usize) -> io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<QueuedTask>(capacity.max(1));
        let (result_sender, result_receiver) = bounded::<DepositedChunk>(capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));

        for index in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let pass = Arc::clone(&pass);

            std::thread::Builder::new()
                .name(format!("deposit-worker-{index}"))
                .spawn(move || {
                    let mut rand = LcgRandom::new(world_seed);
                    while let Ok(QueuedTask { mut task, cancelled }) = receiver.recv() {
                        if cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let start = std::time::Instant::now();
                        let stats = pass.generate_chunk(
                            &mut task.column,
                            task.placer.as_mut(),
                            task.chunk.x,
                            task.chunk.y,
                            &task.regions,
                            &mut rand,
                        );
                        let elapsed = start.elapsed().as_micros() as u64;

                        if !cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(DepositedChunk {
                                chunk: task.chunk,
                                column: task.column,
                                stats,
                                generation_time_us: elapsed,
                            });
                        }
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                    tracing::trace!("deposit worker {index} stopped");
                })?;
        }
        tracing::debug!(threads = thread_count.max(1), capacity, "deposit workers started");

        Ok(Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            in_flight,
        })
    }

    /// A pool sized to the machine, leaving two cores for other work.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_defaults(pass: Arc<DepositPass>, world_seed: i64) -> io::Result<Self> {
        let cpus = num_cpus::get().max(2);
        Self::new(pass, world_seed, (cpus - 2).max(1), 128)
    }

    /// Queues `task`. Hands the task back if the queue is full.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, task: DepositTask) -> Result<(), DepositTask> {
        let chunk = task.chunk;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_tasks.insert(chunk, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender.try_send(QueuedTask { task, cancelled }).map_err(|err| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            self.active_tasks.remove(&chunk);
            err.into_inner().task
        })
    }

    /// Cancels a queued or running task. A finished task is unaffected.
    pub fn cancel(&self, chunk: IVec2) {
        if let Some((_, cancelled)) = self.active_tasks.remove(&chunk) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Collects every finished chunk without blocking.
    pub fn drain_results(&self) -> Vec<DepositedChunk> {
        let mut results = Vec::new();
        while let Ok(done) = self.result_receiver.try_recv() {
            self.active_tasks.remove(&done.chunk);
            results.push(done);
        }
        results
    }

    /// Tasks queued or running.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn is_pending(&self, chunk: IVec2) -> bool {
        self.active_tasks.contains_key(&chunk)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use strata_voxel::{BlockDef, BlockRegistry, MapRegion};

    use super::*;
    use crate::generator::WorldDimensions;
    use crate::loader::DepositCatalog;
    use crate::registry::DepositGeneratorRegistry;

    const ORES: &str = r#"[{
        "code": "granite-ore",
        "generator": "disc-anywhere",
        "triesPerChunk": 2,
        "attributes": {
            "inBlock": { "code": "rock-*", "name": "rock" },
            "placeBlock": { "code": "ore-{rock}" },
            "radius": { "avg": 5, "var": 1 },
            "thickness": { "avg": 2 },
            "depth": { "avg": 0.4, "var": 0.1 }
        }
    }]"#;

    fn dims() -> WorldDimensions {
        WorldDimensions {
            chunk_size: 16,
            map_size_y: 64,
            sea_level: 32,
            region_size: 256,
            ore_map_scale: 16,
        }
    }

    fn setup() -> (Arc<DepositPass>, Arc<BlockRegistry>) {
        let mut blocks = BlockRegistry::new();
        blocks.register(BlockDef::solid("rock-granite")).unwrap();
        blocks.register(BlockDef::solid("ore-granite")).unwrap();
        let blocks = Arc::new(blocks);
        let registry = DepositGeneratorRegistry::with_defaults(dims(), Arc::clone(&blocks));
        let mut catalog = DepositCatalog::new();
        catalog.load_str("ores.json", ORES, &registry);
        (Arc::new(DepositPass::new(Arc::new(catalog), dims())), blocks)
    }

    fn column(blocks: &BlockRegistry) -> ChunkColumn {
        let rock = blocks.lookup_by_code("rock-granite").unwrap();
        let mut column = ChunkColumn::new(16, 64, Arc::new(MapRegion::flat(16)));
        for lx in 0..16 {
            for lz in 0..16 {
                column.fill_column(lx, lz, 0, 50, rock);
                column.set_heights(lx, lz, 49, 49);
            }
        }
        column
    }

    fn wait_for(pool: &AsyncDepositPass, expected: usize, timeout: Duration) -> Vec<DepositedChunk> {
        let mut results = Vec::new();
        let deadline = Instant::now() + timeout;
        while results.len() < expected && Instant::now() < deadline {
            results.extend(pool.drain_results());
            if results.len() < expected {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        results
    }

    #[test]
    fn test_all_submitted_chunks_come_back() {
        let (pass, blocks) = setup();
        let pool = AsyncDepositPass::new(pass, 42, 4, 64).unwrap();

        let mut submitted = 0;
        for x in 0..4 {
            for z in 0..4 {
                if pool.submit(DepositTask::new(x, z, column(&blocks))).is_ok() {
                    submitted += 1;
                }
            }
        }
        assert_eq!(submitted, 16);

        let results = wait_for(&pool, submitted, Duration::from_secs(30));
        assert_eq!(results.len(), submitted, "got {}/{submitted}", results.len());
        assert!(results.iter().all(|done| done.stats.source_chunks == 9));
    }

    #[test]
    fn test_worker_output_matches_synchronous_pass() {
        let (pass, blocks) = setup();
        let pool = AsyncDepositPass::new(Arc::clone(&pass), 42, 2, 8).unwrap();
        pool.submit(DepositTask::new(3, -1, column(&blocks))).ok().unwrap();

        let results = wait_for(&pool, 1, Duration::from_secs(10));
        assert_eq!(results.len(), 1);

        let mut expected = column(&blocks);
        let stats = pass.generate_chunk(
            &mut expected,
            &mut DirectPlacer,
            3,
            -1,
            &NeighbourRegions::new(),
            &mut LcgRandom::new(42),
        );
        assert_eq!(results[0].stats, stats);
        for y in 0..expected.chunk_count() {
            assert_eq!(results[0].column.chunk(y), expected.chunk(y));
        }
    }

    #[test]
    fn test_full_queue_hands_task_back() {
        let (pass, blocks) = setup();
        let pool = AsyncDepositPass::new(pass, 1, 1, 1).unwrap();

        let mut rejected = None;
        for x in 0..64 {
            if let Err(task) = pool.submit(DepositTask::new(x, 0, column(&blocks))) {
                rejected = Some(task);
                break;
            }
        }
        let task = rejected.expect("a one-slot queue should fill up");
        assert!(!pool.is_pending(task.chunk));
    }

    #[test]
    fn test_cancel_clears_pending() {
        let (pass, blocks) = setup();
        let pool = AsyncDepositPass::new(pass, 7, 1, 16).unwrap();
        let chunk = IVec2::new(50, 50);
        pool.submit(DepositTask::new(chunk.x, chunk.y, column(&blocks))).ok().unwrap();
        assert!(pool.is_pending(chunk));

        pool.cancel(chunk);
        assert!(!pool.is_pending(chunk));

        let deadline = Instant::now() + Duration::from_secs(10);
        while pool.in_flight_count() > 0 && Instant::now() < deadline {
            let _ = pool.drain_results();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.in_flight_count(), 0);
    }
}
