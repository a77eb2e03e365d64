use dynakit_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RecordReference;

/// Result message returned by a successful action.
pub const SUCCESS_MESSAGE: &str = "Action executed successfully";

/// Result message carried alongside the error message of a failed action.
pub const ACTION_FAILED_RESULT: &str = "Action failed";

/// Raw action parameters as received from a caller.
///
/// Every field is optional on the wire; [`ActionInput::validate`] enforces the invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    /// Record the action reads and updates.
    pub target_entity: Option<RecordReference>,
    /// Free-text message written to the record.
    pub message: Option<String>,
    /// Activation flag; also gates the best-effort side effect.
    pub is_active: Option<bool>,
    /// Optional non-negative counter.
    pub count: Option<i64>,
}

impl ActionInput {
    /// Checks the action invariants in order and returns the validated form.
    pub fn validate(self) -> AppResult<ValidatedActionInput> {
        let target = self
            .target_entity
            .filter(RecordReference::has_id)
            .ok_or_else(|| AppError::Validation("Target entity is required".to_owned()))?;

        let message = self
            .message
            .and_then(|message| NonEmptyString::new(message).ok())
            .ok_or_else(|| {
                AppError::Validation("Message is required and cannot be empty".to_owned())
            })?;

        let count = match self.count {
            Some(count) => Some(u64::try_from(count).map_err(|_| {
                AppError::Validation("Count must be a positive number".to_owned())
            })?),
            None => None,
        };

        Ok(ValidatedActionInput {
            target,
            message,
            is_active: self.is_active.unwrap_or(false),
            count,
        })
    }
}

/// Action parameters that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedActionInput {
    target: RecordReference,
    message: NonEmptyString,
    is_active: bool,
    count: Option<u64>,
}

impl ValidatedActionInput {
    /// Returns the target record reference.
    #[must_use]
    pub fn target(&self) -> &RecordReference {
        &self.target
    }

    /// Returns the non-empty message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the activation flag, false when absent.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the counter, zero when absent.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.unwrap_or(0)
    }
}

/// Record state written by the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Active record.
    Active,
    /// Inactive record.
    Inactive,
}

impl RecordState {
    /// Maps the activation flag to a record state.
    #[must_use]
    pub fn from_flag(is_active: bool) -> Self {
        if is_active { Self::Active } else { Self::Inactive }
    }

    /// Returns the option value stored in the state field.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Active => 0,
            Self::Inactive => 1,
        }
    }
}

/// Names of the record fields the action writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFieldMapping {
    description_field: String,
    count_field: String,
    state_field: String,
}

impl ActionFieldMapping {
    /// Creates a validated field mapping.
    pub fn new(
        description_field: impl Into<String>,
        count_field: impl Into<String>,
        state_field: impl Into<String>,
    ) -> AppResult<Self> {
        let description_field = NonEmptyString::new(description_field)?;
        let count_field = NonEmptyString::new(count_field)?;
        let state_field = NonEmptyString::new(state_field)?;

        let names = [
            description_field.as_str(),
            count_field.as_str(),
            state_field.as_str(),
        ];
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(AppError::Validation(
                "action field mapping must use distinct field names".to_owned(),
            ));
        }

        Ok(Self {
            description_field: description_field.into(),
            count_field: count_field.into(),
            state_field: state_field.into(),
        })
    }

    /// Returns the field receiving the message.
    #[must_use]
    pub fn description_field(&self) -> &str {
        self.description_field.as_str()
    }

    /// Returns the field receiving the counter.
    #[must_use]
    pub fn count_field(&self) -> &str {
        self.count_field.as_str()
    }

    /// Returns the field receiving the record state.
    #[must_use]
    pub fn state_field(&self) -> &str {
        self.state_field.as_str()
    }

    /// Derives the partial update written back to the target record.
    #[must_use]
    pub fn build_update(&self, input: &ValidatedActionInput) -> Map<String, Value> {
        let mut update = Map::new();
        update.insert(
            self.description_field.clone(),
            Value::String(input.message().to_owned()),
        );
        update.insert(self.count_field.clone(), Value::from(input.count()));
        update.insert(
            self.state_field.clone(),
            Value::from(RecordState::from_flag(input.is_active()).code()),
        );
        update
    }
}

impl Default for ActionFieldMapping {
    fn default() -> Self {
        Self {
            description_field: "description".to_owned(),
            count_field: "customcount".to_owned(),
            state_field: "statecode".to_owned(),
        }
    }
}

/// Outcome of one action execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Action completed.
    Succeeded {
        /// Confirmation message.
        result: String,
    },
    /// Action failed validation or execution.
    Failed {
        /// Failure description.
        error_message: String,
    },
}

/// Structured action result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ActionOutputPayload", try_from = "ActionOutputPayload")]
pub struct ActionOutput {
    outcome: ActionOutcome,
}

impl ActionOutput {
    /// Creates a success output.
    #[must_use]
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            outcome: ActionOutcome::Succeeded {
                result: result.into(),
            },
        }
    }

    /// Creates a failure output.
    #[must_use]
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            outcome: ActionOutcome::Failed {
                error_message: error_message.into(),
            },
        }
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> &ActionOutcome {
        &self.outcome
    }

    /// Returns the numeric status code: 1 for success, 0 for failure.
    #[must_use]
    pub fn status(&self) -> u8 {
        match self.outcome {
            ActionOutcome::Succeeded { .. } => 1,
            ActionOutcome::Failed { .. } => 0,
        }
    }

    /// Returns whether the action succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status() == 1
    }

    /// Returns the result message.
    #[must_use]
    pub fn result(&self) -> &str {
        match &self.outcome {
            ActionOutcome::Succeeded { result } => result.as_str(),
            ActionOutcome::Failed { .. } => ACTION_FAILED_RESULT,
        }
    }

    /// Returns the error message of a failed action.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ActionOutcome::Succeeded { .. } => None,
            ActionOutcome::Failed { error_message } => Some(error_message.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionOutputPayload {
    result: String,
    status: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl From<ActionOutput> for ActionOutputPayload {
    fn from(output: ActionOutput) -> Self {
        let status = output.status();
        match output.outcome {
            ActionOutcome::Succeeded { result } => Self {
                result,
                status,
                error_message: None,
            },
            ActionOutcome::Failed { error_message } => Self {
                result: ACTION_FAILED_RESULT.to_owned(),
                status,
                error_message: Some(error_message),
            },
        }
    }
}

impl TryFrom<ActionOutputPayload> for ActionOutput {
    type Error = AppError;

    fn try_from(payload: ActionOutputPayload) -> AppResult<Self> {
        match payload.status {
            1 => Ok(Self::success(payload.result)),
            0 => Ok(Self::failure(payload.error_message.unwrap_or_default())),
            other => Err(AppError::Validation(format!(
                "action output status must be 0 or 1, got {other}"
            ))),
        }
    }
}
