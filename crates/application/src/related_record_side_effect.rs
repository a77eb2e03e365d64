use async_trait::async_trait;
use dynakit_core::{AppError, AppResult, NonEmptyString};
use dynakit_domain::ValidatedActionInput;
use minijinja::{Environment, UndefinedBehavior, context};
use serde_json::{Map, Value};
use tracing::info;

use crate::action_ports::{ActionSideEffect, OrganizationService};

/// Side effect that creates one related record from attribute templates.
///
/// String attribute values are minijinja templates rendered against `target.logical_name`,
/// `target.id`, `message`, `count` and `is_active`. Other JSON values are copied unchanged.
pub struct RelatedRecordSideEffect {
    logical_name: NonEmptyString,
    attribute_templates: Map<String, Value>,
    environment: Environment<'static>,
}

impl RelatedRecordSideEffect {
    /// Creates a side effect for the given related record type.
    ///
    /// Templates are parsed eagerly so syntax errors surface at configuration time.
    pub fn new(
        logical_name: impl Into<String>,
        attribute_templates: Map<String, Value>,
    ) -> AppResult<Self> {
        let logical_name = NonEmptyString::new(logical_name)?;
        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);

        for (attribute, template) in &attribute_templates {
            if let Value::String(source) = template {
                environment
                    .template_from_str(source)
                    .map_err(|error| {
                        AppError::Validation(format!(
                            "invalid template for related record attribute '{attribute}': {error}"
                        ))
                    })?;
            }
        }

        Ok(Self {
            logical_name,
            attribute_templates,
            environment,
        })
    }

    /// Renders the attributes of the related record for one action input.
    pub fn render_attributes(
        &self,
        input: &ValidatedActionInput,
    ) -> AppResult<Map<String, Value>> {
        let target = input.target();
        let template_context = context! {
            target => context! {
                logical_name => target.logical_name(),
                id => target.id(),
            },
            message => input.message(),
            count => input.count(),
            is_active => input.is_active(),
        };

        let mut attributes = Map::new();
        for (attribute, template) in &self.attribute_templates {
            let value = match template {
                Value::String(source) => {
                    let rendered = self
                        .environment
                        .render_str(source, &template_context)
                        .map_err(|error| {
                            AppError::Validation(format!(
                                "failed to render related record attribute '{attribute}': {error}"
                            ))
                        })?;
                    Value::String(rendered)
                }
                other => other.clone(),
            };
            attributes.insert(attribute.clone(), value);
        }

        Ok(attributes)
    }
}

#[async_trait]
impl ActionSideEffect for RelatedRecordSideEffect {
    fn describe(&self) -> &str {
        self.logical_name.as_str()
    }

    async fn apply(
        &self,
        service: &dyn OrganizationService,
        input: &ValidatedActionInput,
    ) -> AppResult<()> {
        let attributes = self.render_attributes(input)?;
        let created_id = service
            .create(self.logical_name.as_str(), attributes)
            .await?;

        info!(
            logical_name = %self.logical_name.as_str(),
            record_id = %created_id,
            "related record created"
        );
        Ok(())
    }
}
