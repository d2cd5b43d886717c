use crate::error::{CoreError, Result};
use crate::types::ClaimMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Form workflow that collects a rejection reason.
pub const REJECT_REASON_WORKFLOW: &str = "reject_reason";

/// Server action with a built-in form workflow of the same name.
pub const REVISE_AND_REJECT_POST: &str = "revise_and_reject_post";

/// Action→workflow mappings that ship with the client and cannot be
/// overridden by registration.
pub const BUILTIN_ACTION_WORKFLOWS: &[(&str, &str)] =
    &[(REVISE_AND_REJECT_POST, REVISE_AND_REJECT_POST)];

// ---------------------------------------------------------------------------
// ConfigFile
// ---------------------------------------------------------------------------

/// On-disk shape of a coordinator config (YAML).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub claim_mode: ClaimMode,
    #[serde(default)]
    pub action_workflows: BTreeMap<String, String>,
    #[serde(default)]
    pub type_params: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// CoordinatorConfig
// ---------------------------------------------------------------------------

/// Registration state for one moderator session, built once and then
/// shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    claim_mode: ClaimMode,
    action_workflows: BTreeMap<String, String>,
    type_params: BTreeMap<String, Vec<String>>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            claim_mode: ClaimMode::default(),
            action_workflows: builtin_workflows(),
            type_params: BTreeMap::new(),
        }
    }
}

fn builtin_workflows() -> BTreeMap<String, String> {
    BUILTIN_ACTION_WORKFLOWS
        .iter()
        .map(|(a, w)| (a.to_string(), w.to_string()))
        .collect()
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(data)?;
        Self::from_file(file)
    }

    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let mut builder = Self::builder().claim_mode(file.claim_mode);
        for (action, workflow) in file.action_workflows {
            builder = builder.action_workflow(action, workflow);
        }
        for (reviewable_type, params) in file.type_params {
            for param in params {
                builder = builder.type_param(reviewable_type.clone(), param);
            }
        }
        builder.build()
    }

    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            claim_mode: self.claim_mode,
            action_workflows: self.action_workflows.clone(),
            type_params: self.type_params.clone(),
        }
    }

    pub fn claim_mode(&self) -> ClaimMode {
        self.claim_mode
    }

    /// Form workflow registered for a server action, if any.
    pub fn workflow_for(&self, server_action: &str) -> Option<&str> {
        self.action_workflows.get(server_action).map(String::as_str)
    }

    pub fn action_workflows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.action_workflows
            .iter()
            .map(|(a, w)| (a.as_str(), w.as_str()))
    }

    /// Extra fields forwarded from a reviewable of this type into perform
    /// payloads.
    pub fn type_params(&self, reviewable_type: &str) -> &[String] {
        self.type_params
            .get(reviewable_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// CoordinatorConfigBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    claim_mode: ClaimMode,
    action_workflows: Vec<(String, String)>,
    type_params: Vec<(String, String)>,
}

impl CoordinatorConfigBuilder {
    pub fn claim_mode(mut self, mode: ClaimMode) -> Self {
        self.claim_mode = mode;
        self
    }

    /// Map a server action to a form workflow.
    pub fn action_workflow(mut self, action: impl Into<String>, workflow: impl Into<String>) -> Self {
        self.action_workflows.push((action.into(), workflow.into()));
        self
    }

    /// Forward `param` from reviewables of `reviewable_type` into perform
    /// payloads.
    pub fn type_param(mut self, reviewable_type: impl Into<String>, param: impl Into<String>) -> Self {
        self.type_params.push((reviewable_type.into(), param.into()));
        self
    }

    pub fn build(self) -> Result<CoordinatorConfig> {
        let mut action_workflows = builtin_workflows();
        for (action, workflow) in self.action_workflows {
            if action.is_empty() || workflow.is_empty() {
                return Err(CoreError::InvalidConfig(
                    "action workflow mappings need both an action and a workflow".into(),
                ));
            }
            if let Some((_, builtin)) = BUILTIN_ACTION_WORKFLOWS.iter().find(|(a, _)| *a == action) {
                return Err(CoreError::ReservedWorkflow {
                    action,
                    workflow: builtin.to_string(),
                });
            }
            action_workflows.insert(action, workflow);
        }

        let mut type_params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (reviewable_type, param) in self.type_params {
            if param.is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "empty parameter name for type {reviewable_type}"
                )));
            }
            let params = type_params.entry(reviewable_type).or_default();
            if !params.contains(&param) {
                params.push(param);
            }
        }

        Ok(CoordinatorConfig {
            claim_mode: self.claim_mode,
            action_workflows,
            type_params,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
