use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dynakit_application::{ActionExecutor, OrganizationService, RelatedRecordSideEffect};
use dynakit_core::{AppError, AppResult};
use dynakit_domain::ActionOutput;
use dynakit_infrastructure::{HttpOrganizationService, HttpOrganizationServiceConfig};
use dynakit_scaffold::{ScaffoldRequest, Scaffolder};
use serde_json::Value;
use tracing::info;

use crate::cli_config::CliConfig;

pub struct NewProjectArgs {
    pub action_name: String,
    pub company: String,
    pub entity_logical_name: String,
    pub service_url: String,
    pub dir: Option<PathBuf>,
    pub force: bool,
}

pub async fn run(input: &str) -> AppResult<ExitCode> {
    let config = CliConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    info!(
        action = %config.action_name,
        service_url = %config.service_url,
        max_attempts = config.max_attempts,
        "running action"
    );

    let service = Arc::new(HttpOrganizationService::new(
        http_client,
        HttpOrganizationServiceConfig {
            base_url: config.service_url.clone(),
            bearer_token: config.service_token.clone(),
            max_attempts: config.max_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
        },
    ));
    let executor = build_executor(service, &config)?;

    let raw_payload = read_input(input)?;
    let output = match parse_payload(raw_payload.as_str()) {
        Ok(payload) => executor.execute_payload(payload).await,
        Err(error) => ActionOutput::failure(error),
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|error| AppError::Internal(format!("failed to encode action output: {error}")))?;
    println!("{rendered}");

    Ok(if output.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn new_project(args: NewProjectArgs) -> AppResult<ExitCode> {
    let request = ScaffoldRequest::new(
        args.action_name,
        args.company,
        args.entity_logical_name,
        args.service_url,
    )?;
    let directory = args
        .dir
        .unwrap_or_else(|| PathBuf::from(request.action_name()));

    let written = Scaffolder::new()?.write_to(&directory, &request, args.force)?;
    for path in written {
        println!("created {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn build_executor(
    service: Arc<dyn OrganizationService>,
    config: &CliConfig,
) -> AppResult<ActionExecutor> {
    let mut executor = ActionExecutor::new(service)
        .with_field_mapping(config.field_mapping.clone())
        .with_action_name(config.action_name.clone());

    if let Some(side_effect) = &config.side_effect {
        executor = executor.with_side_effect(Arc::new(RelatedRecordSideEffect::new(
            side_effect.logical_name.clone(),
            side_effect.attribute_templates.clone(),
        )?));
    }

    Ok(executor)
}

fn read_input(input: &str) -> AppResult<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|error| AppError::Internal(format!("failed to read standard input: {error}")))?;
        return Ok(buffer);
    }

    std::fs::read_to_string(input)
        .map_err(|error| AppError::Validation(format!("failed to read input '{input}': {error}")))
}

/// Blank input is treated as an absent payload.
fn parse_payload(raw: &str) -> Result<Option<Value>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<Value>(raw)
        .map(Some)
        .map_err(|error| format!("invalid action input: {error}"))
}
