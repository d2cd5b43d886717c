use anyhow::Result;
use claimdesk_core::ReviewableId;

use crate::cmd::{runtime, Remote};
use crate::output::print_json;

/// Claim (or with `release`, unclaim) the topic of reviewable `id`.
pub fn run(remote: &Remote, id: u64, release: bool) -> Result<()> {
    let api = remote.api()?;
    let session = remote.session_builder(&api)?.build()?;
    let id = ReviewableId(id);

    runtime()?.block_on(async {
        session.load_queue().await?;
        if release {
            session.unclaim(id).await?;
            if remote.json {
                print_json(&serde_json::json!({ "id": id, "claimed_by": null }))?;
            } else {
                println!("Released the topic of reviewable {id}.");
            }
        } else {
            let claim = session.claim(id).await?;
            if remote.json {
                print_json(&serde_json::json!({ "id": id, "claimed_by": claim }))?;
            } else {
                println!("Claimed the topic of reviewable {id} as {}.", claim.user.username);
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
