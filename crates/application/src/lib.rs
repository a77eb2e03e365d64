//! Application services and ports.

#![forbid(unsafe_code)]

mod action_ports;
mod action_service;
mod related_record_side_effect;

pub use action_ports::{ActionSideEffect, ColumnSet, OrganizationService};
pub use action_service::{ACTION_LOGIC_ERROR_PREFIX, ActionExecutor, MISSING_INPUT_MESSAGE};
pub use related_record_side_effect::RelatedRecordSideEffect;
