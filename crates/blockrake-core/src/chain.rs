//! The reader driver: fans block files across a worker pool and streams
//! every parsed block to one callback.
//!
//! Files are dispatched over a rendezvous channel; each worker drains its
//! current file sequentially before asking for the next, so parallelism is
//! across files only. Blocks from different workers arrive at the callback
//! interleaved and not globally height-ordered — the callback must be safe
//! to call concurrently from several threads.

use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;

use crate::blockfile::BlockFile;
use crate::error::CoreError;
use crate::index;
use crate::params::{ChainParams, MAINNET};
use crate::types::{Block, BlockFileRef};

/// Blocks between progress log lines per worker.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The node's blocks directory: `blk#####.dat` files plus `index/`.
    pub blocks_dir: PathBuf,
    /// Parallel block file workers; clamped to at least 1.
    pub workers: usize,
    /// Skip block files whose first height exceeds this. 0 means no limit.
    /// Heights inside admitted files are approximate, so this cap is
    /// file-granular; consumers filter on `Block::height` if they need more.
    pub max_height: u64,
}

/// An ordered view of the chain's block files, ready to stream.
pub struct Chain {
    params: &'static ChainParams,
    workers: usize,
    max_height: u64,
    block_files: Vec<BlockFileRef>,
}

impl Chain {
    /// Load the file list from the node's index. Fails when the index
    /// cannot be opened — without it there is no ordering and no work.
    pub fn new(config: Config) -> Result<Self, CoreError> {
        let block_files = index::block_files_ordered_by_height(&config.blocks_dir)?;
        Ok(Self {
            params: &MAINNET,
            workers: config.workers.max(1),
            max_height: config.max_height,
            block_files,
        })
    }

    pub fn block_file_count(&self) -> usize {
        self.block_files.len()
    }

    /// Read every block and invoke `on_block` exactly once per block, from
    /// worker threads. Returns once all files are drained and all workers
    /// have stopped.
    ///
    /// A framing or decode failure kills only the worker that hit it; the
    /// others finish their files. The first such failure is returned so
    /// callers know the stream was incomplete.
    pub fn load<F>(&self, on_block: F) -> Result<(), CoreError>
    where
        F: Fn(Block) + Send + Sync,
    {
        let (file_tx, file_rx) = crossbeam_channel::bounded::<BlockFileRef>(0);
        let failures: Mutex<Vec<CoreError>> = Mutex::new(Vec::new());

        tracing::info!(
            workers = self.workers,
            files = self.block_files.len(),
            max_height = self.max_height,
            "starting chain scan"
        );

        thread::scope(|scope| {
            for worker in 0..self.workers {
                let file_rx = file_rx.clone();
                let on_block = &on_block;
                let failures = &failures;
                let params = self.params;
                scope.spawn(move || {
                    while let Ok(file_ref) = file_rx.recv() {
                        if let Err(err) = drain_block_file(worker, file_ref, params, on_block) {
                            tracing::error!(worker, error = %err, "block file worker failed");
                            failures.lock().expect("failure list poisoned").push(err);
                        }
                    }
                });
            }
            drop(file_rx);

            for file_ref in &self.block_files {
                if self.max_height > 0 && file_ref.first_height > self.max_height {
                    tracing::debug!(
                        file = %file_ref.path.display(),
                        first_height = file_ref.first_height,
                        "skipping block file above height cap"
                    );
                    continue;
                }
                // Send fails only when every worker has died; stop feeding.
                if file_tx.send(file_ref.clone()).is_err() {
                    break;
                }
            }
            drop(file_tx);
        });

        let mut failures = failures.into_inner().expect("failure list poisoned");
        match failures.len() {
            0 => Ok(()),
            n => {
                tracing::error!(failed_files = n, "chain scan finished with failures");
                Err(failures.remove(0))
            }
        }
    }
}

/// Sequentially parse one block file, invoking the callback per block.
fn drain_block_file<F>(
    worker: usize,
    file_ref: BlockFileRef,
    params: &ChainParams,
    on_block: &F,
) -> Result<(), CoreError>
where
    F: Fn(Block),
{
    let mut file = BlockFile::new(file_ref);
    tracing::info!(worker, file = %file.path().display(), "starting block file");

    while let Some(block) = file.next_block(params)? {
        if block.height % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                worker,
                file = %file.path().display(),
                height = block.height,
                "progress"
            );
        }
        on_block(block);
    }

    Ok(())
}
