use chrono::{DateTime, Utc};
use claimdesk_core::Reviewable;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Print rows under a header, each column padded to its widest cell.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.to_vec()));
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));
    for row in rows {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}

pub const REVIEWABLE_HEADERS: &[&str] =
    &["ID", "TYPE", "STATUS", "VER", "TOPIC", "CLAIMED BY", "AGE", "ACTIONS"];

pub fn reviewable_row(r: &Reviewable, now: DateTime<Utc>) -> Vec<String> {
    vec![
        r.id.to_string(),
        r.reviewable_type.clone(),
        r.status.to_string(),
        r.version.to_string(),
        r.topic_id.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
        claim_label(r),
        age(r.created_at, now),
        r.actions
            .iter()
            .map(|a| a.server_action.as_str())
            .collect::<Vec<_>>()
            .join(","),
    ]
}

pub fn claim_label(r: &Reviewable) -> String {
    match &r.claimed_by {
        Some(c) if c.automatic => format!("{} (auto)", c.user.username),
        Some(c) => c.user.username.clone(),
        None => "-".into(),
    }
}

/// Compact age such as `45s`, `12m`, `3h` or `2d`.
pub fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - since).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    }
}
