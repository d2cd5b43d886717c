use std::path::Path;

use anyhow::{Context, Result};
use claimdesk_core::ClaimMode;
use claimdesk_server::ReviewQueue;

use crate::cmd::runtime;

pub fn run(port: u16, seed: Option<&Path>, claim_mode: Option<ClaimMode>) -> Result<()> {
    let mut queue = match seed {
        Some(path) => ReviewQueue::load_seed(path)
            .with_context(|| format!("failed to load seed {}", path.display()))?,
        None => ReviewQueue::default(),
    };
    if let Some(mode) = claim_mode {
        queue.set_claim_mode(mode);
    }
    tracing::info!(pending = queue.pending_count(), "review queue ready");

    runtime()?.block_on(claimdesk_server::serve(queue, port))
}
