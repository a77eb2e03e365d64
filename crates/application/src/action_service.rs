use std::sync::Arc;

use dynakit_core::{AppError, AppResult};
use dynakit_domain::{
    ActionFieldMapping, ActionInput, ActionOutput, SUCCESS_MESSAGE, ValidatedActionInput,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::action_ports::{ActionSideEffect, OrganizationService};

mod execution;

/// Failure message for an absent or null action payload.
pub const MISSING_INPUT_MESSAGE: &str = "Input cannot be null or undefined";

/// Context prefix applied to failures raised while reading or writing the target record.
pub const ACTION_LOGIC_ERROR_PREFIX: &str = "error in action logic";

/// Runs the read, mutate, write and follow-up workflow for one action input.
///
/// Every failure is reported as a failed [`ActionOutput`]; `execute` never returns an error.
#[derive(Clone)]
pub struct ActionExecutor {
    organization_service: Arc<dyn OrganizationService>,
    field_mapping: ActionFieldMapping,
    side_effect: Option<Arc<dyn ActionSideEffect>>,
    action_name: String,
}

impl ActionExecutor {
    /// Creates an executor with the default field mapping and no side effect.
    #[must_use]
    pub fn new(organization_service: Arc<dyn OrganizationService>) -> Self {
        Self {
            organization_service,
            field_mapping: ActionFieldMapping::default(),
            side_effect: None,
            action_name: "DynamicsAction".to_owned(),
        }
    }

    /// Overrides the record fields written by the action.
    #[must_use]
    pub fn with_field_mapping(mut self, field_mapping: ActionFieldMapping) -> Self {
        self.field_mapping = field_mapping;
        self
    }

    /// Adds the best-effort follow-up run when the activation flag is set.
    #[must_use]
    pub fn with_side_effect(mut self, side_effect: Arc<dyn ActionSideEffect>) -> Self {
        self.side_effect = Some(side_effect);
        self
    }

    /// Sets the action name used in log output.
    #[must_use]
    pub fn with_action_name(mut self, action_name: impl Into<String>) -> Self {
        self.action_name = action_name.into();
        self
    }

    /// Returns the action name used in log output.
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.action_name.as_str()
    }

    /// Executes the action for a typed input.
    pub async fn execute(&self, input: ActionInput) -> ActionOutput {
        info!(action = %self.action_name, "starting action execution");

        let validated = match input.validate() {
            Ok(validated) => validated,
            Err(error) => return self.fail(error, "action input rejected"),
        };

        match self.execute_action_logic(&validated).await {
            Ok(result) => {
                info!(
                    action = %self.action_name,
                    logical_name = %validated.target().logical_name(),
                    record_id = %validated.target().id(),
                    "action completed successfully"
                );
                ActionOutput::success(result)
            }
            Err(error) => self.fail(error, "action failed"),
        }
    }

    /// Executes the action for a raw JSON payload.
    ///
    /// An absent or null payload and a payload that does not match the input shape both fail
    /// before the organization service is called.
    pub async fn execute_payload(&self, payload: Option<Value>) -> ActionOutput {
        let payload = match payload {
            Some(Value::Null) | None => {
                return self.fail(
                    AppError::Validation(MISSING_INPUT_MESSAGE.to_owned()),
                    "action input rejected",
                );
            }
            Some(payload) => payload,
        };

        match serde_json::from_value::<ActionInput>(payload) {
            Ok(input) => self.execute(input).await,
            Err(error) => self.fail(
                AppError::Validation(format!("invalid action input: {error}")),
                "action input rejected",
            ),
        }
    }

    fn fail(&self, error: AppError, reason: &str) -> ActionOutput {
        match &error {
            AppError::Validation(_) => {
                warn!(action = %self.action_name, error = %error, "{reason}");
            }
            _ => {
                error!(action = %self.action_name, error = %error, "{reason}");
            }
        }

        ActionOutput::failure(error.message())
    }

    async fn execute_action_logic(&self, input: &ValidatedActionInput) -> AppResult<String> {
        self.update_target(input).await.map_err(|error| {
            AppError::Internal(format!("{ACTION_LOGIC_ERROR_PREFIX}: {}", error.message()))
        })?;

        if input.is_active() {
            self.run_side_effect(input).await;
        }

        Ok(SUCCESS_MESSAGE.to_owned())
    }
}
