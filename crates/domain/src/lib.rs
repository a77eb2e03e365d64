//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod record;

pub use action::{
    ACTION_FAILED_RESULT, ActionFieldMapping, ActionInput, ActionOutcome, ActionOutput,
    RecordState, SUCCESS_MESSAGE, ValidatedActionInput,
};
pub use record::{Record, RecordReference};
