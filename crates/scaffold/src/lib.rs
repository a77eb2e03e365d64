//! Project scaffolding for new record actions.
//!
//! Templates use named variables rendered by minijinja in strict mode, so a generated file never
//! contains an unresolved placeholder: a missing variable fails generation instead.

#![forbid(unsafe_code)]

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dynakit_core::{AppError, AppResult};
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::{info, warn};

const ENV_TEMPLATE: &str = include_str!("../templates/env.j2");
const INPUT_TEMPLATE: &str = include_str!("../templates/input.json.j2");
const README_TEMPLATE: &str = include_str!("../templates/README.md.j2");

/// Generated files: template name and output path relative to the project directory.
const PROJECT_FILES: [(&str, &str); 3] = [
    ("env", ".env"),
    ("input", "input.json"),
    ("readme", "README.md"),
];

/// Default organization service root written into generated projects.
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/api";

/// Named values substituted into project templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaffoldRequest {
    action_name: String,
    company: String,
    entity_logical_name: String,
    service_url: String,
}

impl ScaffoldRequest {
    /// Creates a validated scaffold request.
    pub fn new(
        action_name: impl Into<String>,
        company: impl Into<String>,
        entity_logical_name: impl Into<String>,
        service_url: impl Into<String>,
    ) -> AppResult<Self> {
        let action_name = identifier("action name", action_name.into())?;
        let company = identifier("company", company.into())?;
        let entity_logical_name = identifier("entity logical name", entity_logical_name.into())?;

        let service_url: String = service_url.into();
        let service_url = service_url.trim().to_owned();
        if service_url.is_empty() || service_url.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "service url must be non-empty and contain no whitespace".to_owned(),
            ));
        }

        Ok(Self {
            action_name,
            company,
            entity_logical_name,
            service_url,
        })
    }

    /// Returns the action name.
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.action_name.as_str()
    }
}

fn identifier(label: &str, value: String) -> AppResult<String> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} must not be empty")));
    }

    if !value
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '_' || character == '-')
    {
        return Err(AppError::Validation(format!(
            "{label} '{value}' may only contain ASCII letters, digits, '_' and '-'"
        )));
    }

    Ok(value)
}

/// One rendered project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the project directory.
    pub relative_path: &'static str,
    /// Rendered file contents.
    pub contents: String,
}

/// Renders and writes action project skeletons.
pub struct Scaffolder {
    environment: Environment<'static>,
}

impl Scaffolder {
    /// Creates a scaffolder with the built-in project templates.
    pub fn new() -> AppResult<Self> {
        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);
        environment.set_auto_escape_callback(|_| AutoEscape::None);
        environment.set_keep_trailing_newline(true);

        for (name, source) in [
            ("env", ENV_TEMPLATE),
            ("input", INPUT_TEMPLATE),
            ("readme", README_TEMPLATE),
        ] {
            environment.add_template(name, source).map_err(|error| {
                AppError::Internal(format!("invalid built-in template '{name}': {error}"))
            })?;
        }

        Ok(Self { environment })
    }

    /// Renders every project file for a request.
    pub fn render(&self, request: &ScaffoldRequest) -> AppResult<Vec<RenderedFile>> {
        PROJECT_FILES
            .iter()
            .map(|&(template_name, relative_path)| -> AppResult<RenderedFile> {
                let contents = self
                    .environment
                    .get_template(template_name)
                    .and_then(|template| template.render(request))
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to render '{relative_path}' from template '{template_name}': {error}"
                        ))
                    })?;

                Ok(RenderedFile {
                    relative_path,
                    contents,
                })
            })
            .collect()
    }

    /// Renders the project and writes it below `directory`.
    ///
    /// Existing files are left untouched and reported as a conflict unless `overwrite` is set.
    /// When a write fails, files created by this call are removed again.
    pub fn write_to(
        &self,
        directory: &Path,
        request: &ScaffoldRequest,
        overwrite: bool,
    ) -> AppResult<Vec<PathBuf>> {
        let files = self.render(request)?;

        if !overwrite {
            let existing: Vec<String> = files
                .iter()
                .map(|file| directory.join(file.relative_path))
                .filter(|path| path.exists())
                .map(|path| path.display().to_string())
                .collect();
            if !existing.is_empty() {
                return Err(AppError::Conflict(format!(
                    "refusing to overwrite existing files: {}",
                    existing.join(", ")
                )));
            }
        }

        fs::create_dir_all(directory).map_err(|error| {
            AppError::Internal(format!(
                "failed to create project directory '{}': {error}",
                directory.display()
            ))
        })?;

        let mut written = Vec::with_capacity(files.len());
        let mut created = Vec::new();
        for file in files {
            let path = directory.join(file.relative_path);
            let existed = path.exists();
            let result = write_file(&path, file.contents.as_str(), overwrite);
            if !existed && path.is_file() {
                created.push(path.clone());
            }
            if let Err(error) = result {
                remove_created(&created);
                return Err(error);
            }
            written.push(path);
        }

        info!(
            action_name = %request.action_name,
            directory = %directory.display(),
            file_count = written.len(),
            "action project scaffolded"
        );

        Ok(written)
    }
}

/// Without `overwrite` the file must not exist yet; the check and the write are one open call.
fn write_file(path: &Path, contents: &str, overwrite: bool) -> AppResult<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options
        .open(path)
        .and_then(|mut handle| handle.write_all(contents.as_bytes()))
        .map_err(|error| match error.kind() {
            ErrorKind::AlreadyExists => AppError::Conflict(format!(
                "refusing to overwrite existing file: {}",
                path.display()
            )),
            _ => AppError::Internal(format!("failed to write '{}': {error}", path.display())),
        })
}

/// Rolls back files created by a failed scaffold run. Files that existed before are kept.
fn remove_created(paths: &[PathBuf]) {
    for path in paths {
        if let Err(error) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %error, "failed to remove partial scaffold file");
        }
    }
}
