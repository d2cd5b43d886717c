use anyhow::{Context, Result};
use claimdesk_client::StoreChange;
use tokio::sync::broadcast::error::RecvError;

use crate::cmd::{runtime, Remote};
use crate::output::claim_label;

/// Follow the queue live and print each change until interrupted or the
/// server closes the stream.
pub fn run(remote: &Remote) -> Result<()> {
    let api = remote.api()?;
    let session = remote.session_builder(&api)?.build()?;

    runtime()?.block_on(async {
        let count = session.load_queue().await?;
        println!("Watching {count} pending reviewable(s) on {}", remote.server);

        let mut changes = session.store().subscribe();
        let _live = session.subscribe();
        let feed = api
            .connect_events()
            .await
            .context("failed to open event stream")?;
        let mut follower = session.follow(feed);

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) => print_change(&session, &change),
                    Err(RecvError::Lagged(n)) => tracing::warn!("missed {n} queue changes"),
                    Err(RecvError::Closed) => break,
                },
                _ = &mut follower => {
                    println!("Event stream closed.");
                    break;
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn print_change(session: &claimdesk_client::ModeratorSession, change: &StoreChange) {
    match change {
        StoreChange::Updated(id) => {
            if let Some(r) = session.store().get(*id) {
                println!("updated  {id}  v{}  claimed by {}", r.version, claim_label(&r));
            }
        }
        StoreChange::Removed(ids) => {
            for id in ids {
                println!("removed  {id}");
            }
        }
        StoreChange::Counts(counts) => {
            if let Some(n) = counts.reviewable_count {
                println!("pending  {n}");
            }
        }
        StoreChange::Reloaded => println!("reloaded {} reviewable(s)", session.store().len()),
    }
}
