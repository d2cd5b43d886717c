use anyhow::{Context, Result};
use claimdesk_client::ReviewApi;
use claimdesk_core::ReviewableId;

use crate::cmd::{runtime, Remote};
use crate::output::{claim_label, print_json, print_table, reviewable_row, REVIEWABLE_HEADERS};

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn list(remote: &Remote) -> Result<()> {
    let api = remote.api()?;
    let items = runtime()?
        .block_on(api.list())
        .context("failed to load review queue")?;

    if remote.json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("Review queue is empty.");
        return Ok(());
    }
    let now = chrono::Utc::now();
    let rows: Vec<Vec<String>> = items.iter().map(|r| reviewable_row(r, now)).collect();
    print_table(REVIEWABLE_HEADERS, &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

pub fn show(remote: &Remote, id: u64) -> Result<()> {
    let api = remote.api()?;
    let r = runtime()?
        .block_on(api.fetch(ReviewableId(id)))
        .with_context(|| format!("failed to load reviewable {id}"))?;

    if remote.json {
        return print_json(&r);
    }

    println!("Reviewable {} ({})", r.id, r.reviewable_type);
    println!("  status:     {}", r.status);
    println!("  version:    {}", r.version);
    if let Some(topic) = r.topic_id {
        println!("  topic:      {topic}");
    }
    println!("  claimed by: {}", claim_label(&r));
    if let Some(user) = &r.target_created_by {
        println!("  author:     {} ({})", user.username, user.id);
    }
    if let Some(reason) = &r.reject_reason {
        println!("  rejected:   {reason}");
    }
    if !r.actions.is_empty() {
        println!("  actions:");
        for action in &r.actions {
            let mut notes = Vec::new();
            if let Some(client) = &action.client_action {
                notes.push(format!("client: {client}"));
            }
            if action.confirm_message.is_some() {
                notes.push("confirm".to_string());
            }
            if action.require_reject_reason {
                notes.push("needs --reason".to_string());
            }
            if notes.is_empty() {
                println!("    {}", action.server_action);
            } else {
                println!("    {}  [{}]", action.server_action, notes.join(", "));
            }
        }
    }
    Ok(())
}
