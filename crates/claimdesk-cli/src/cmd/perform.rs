use std::sync::Arc;

use anyhow::{bail, Context, Result};
use claimdesk_client::{AbortReason, PerformOutcome, StaticForm};
use claimdesk_core::config::{REJECT_REASON_WORKFLOW, REVISE_AND_REJECT_POST};
use claimdesk_core::ReviewableId;
use serde_json::{Map, Value};

use crate::cmd::{runtime, Remote};
use crate::output::print_json;

/// Parse `key=value` pairs. Values that parse as JSON keep their type;
/// anything else is a string.
pub fn parse_fields(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("invalid field '{pair}': expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid field '{pair}': empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

pub fn run(
    remote: &Remote,
    id: u64,
    action: &str,
    reason: Option<&str>,
    fields: &[String],
) -> Result<()> {
    let fields = parse_fields(fields)?;
    let mut answers = fields.clone();
    if let Some(reason) = reason {
        answers.insert("reject_reason".into(), Value::String(reason.to_string()));
    }

    let api = remote.api()?;
    let config = remote.coordinator_config()?;
    let reject_form = match reason {
        Some(_) => StaticForm::new(answers.clone()),
        None => StaticForm::dismissed(),
    };
    let mut builder = remote
        .session_builder(&api)?
        .form(REJECT_REASON_WORKFLOW, Arc::new(reject_form))
        .form(REVISE_AND_REJECT_POST, Arc::new(StaticForm::new(answers.clone())));
    for (_, workflow) in config.action_workflows() {
        if workflow != REJECT_REASON_WORKFLOW && workflow != REVISE_AND_REJECT_POST {
            builder = builder.form(workflow, Arc::new(StaticForm::new(answers.clone())));
        }
    }
    let session = builder.build()?;

    let id = ReviewableId(id);
    let outcome = runtime()?.block_on(async {
        session.load_queue().await?;
        if !session.store().contains(id) {
            bail!("reviewable {id} is not in the pending queue");
        }
        Ok::<_, anyhow::Error>(session.perform(id, action, fields).await?)
    })?;

    match outcome {
        PerformOutcome::Completed(completion) => {
            if remote.json {
                return print_json(&completion.result);
            }
            println!("Performed {action} on reviewable {id}.");
            if let Some(count) = completion.result.reviewable_count {
                println!("{count} reviewable(s) remaining.");
            }
            Ok(())
        }
        PerformOutcome::Aborted(reason) => bail!("{action} not performed: {}", describe(reason)),
    }
}

fn describe(reason: AbortReason) -> &'static str {
    match reason {
        AbortReason::ClaimRefused => "the topic is claimed by another moderator",
        AbortReason::ConfirmationDismissed => "confirmation dismissed",
        AbortReason::FormDismissed => "a rejection reason is required (--reason)",
        AbortReason::WorkflowIncomplete => "the client workflow did not complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_keep_json_types() {
        let fields = parse_fields(&[
            "send_email=false".to_string(),
            "note=looks fine".to_string(),
            "category_id=4".to_string(),
        ])
        .unwrap();
        assert_eq!(fields["send_email"], json!(false));
        assert_eq!(fields["note"], json!("looks fine"));
        assert_eq!(fields["category_id"], json!(4));
    }

    #[test]
    fn fields_need_a_key() {
        assert!(parse_fields(&["novalue".to_string()]).is_err());
        assert!(parse_fields(&["=1".to_string()]).is_err());
    }
}
