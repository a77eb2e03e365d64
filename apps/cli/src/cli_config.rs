use std::env;

use dynakit_core::{AppError, AppResult};
use dynakit_domain::ActionFieldMapping;
use reqwest::Url;
use serde_json::{Map, Value};

/// Related record created by the best-effort side effect.
#[derive(Debug, Clone, PartialEq)]
pub struct SideEffectConfig {
    pub logical_name: String,
    pub attribute_templates: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub service_url: Url,
    pub service_token: Option<String>,
    pub timeout_seconds: u64,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
    pub action_name: String,
    pub field_mapping: ActionFieldMapping,
    pub side_effect: Option<SideEffectConfig>,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_url = required_var(&lookup, "ORG_SERVICE_URL")?;
        let service_url = Url::parse(service_url.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid ORG_SERVICE_URL '{service_url}': {error}"))
        })?;
        let service_token = non_empty_var(&lookup, "ORG_SERVICE_TOKEN");

        let timeout_seconds = parse_var::<u64, _>(&lookup, "ORG_SERVICE_TIMEOUT_SECONDS", 15)?;
        let max_attempts = parse_var::<u8, _>(&lookup, "ORG_SERVICE_MAX_ATTEMPTS", 3)?;
        let retry_backoff_ms = parse_var::<u64, _>(&lookup, "ORG_SERVICE_RETRY_BACKOFF_MS", 200)?;

        if timeout_seconds == 0 {
            return Err(AppError::Validation(
                "ORG_SERVICE_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if max_attempts == 0 {
            return Err(AppError::Validation(
                "ORG_SERVICE_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        let action_name =
            non_empty_var(&lookup, "ACTION_NAME").unwrap_or_else(|| "DynamicsAction".to_owned());

        let defaults = ActionFieldMapping::default();
        let field_mapping = ActionFieldMapping::new(
            non_empty_var(&lookup, "ACTION_DESCRIPTION_FIELD")
                .unwrap_or_else(|| defaults.description_field().to_owned()),
            non_empty_var(&lookup, "ACTION_COUNT_FIELD")
                .unwrap_or_else(|| defaults.count_field().to_owned()),
            non_empty_var(&lookup, "ACTION_STATE_FIELD")
                .unwrap_or_else(|| defaults.state_field().to_owned()),
        )?;

        let side_effect = match non_empty_var(&lookup, "ACTION_SIDE_EFFECT_ENTITY") {
            Some(logical_name) => {
                let attribute_templates = non_empty_var(&lookup, "ACTION_SIDE_EFFECT_ATTRIBUTES")
                    .map(|raw| parse_attribute_templates(raw.as_str()))
                    .transpose()?
                    .unwrap_or_default();

                Some(SideEffectConfig {
                    logical_name,
                    attribute_templates,
                })
            }
            None => None,
        };

        Ok(Self {
            service_url,
            service_token,
            timeout_seconds,
            max_attempts,
            retry_backoff_ms,
            action_name,
            field_mapping,
            side_effect,
        })
    }
}

fn parse_attribute_templates(raw: &str) -> AppResult<Map<String, Value>> {
    serde_json::from_str::<Map<String, Value>>(raw).map_err(|error| {
        AppError::Validation(format!(
            "ACTION_SIDE_EFFECT_ATTRIBUTES must be a JSON object: {error}"
        ))
    })
}

fn required_var<F>(lookup: &F, name: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty_var(lookup, name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn non_empty_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty_var(lookup, name) {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
