use tracing::{debug, warn};

use super::*;
use crate::action_ports::ColumnSet;

impl ActionExecutor {
    pub(super) async fn update_target(&self, input: &ValidatedActionInput) -> AppResult<()> {
        let target = input.target();

        debug!(
            action = %self.action_name,
            logical_name = %target.logical_name(),
            record_id = %target.id(),
            "retrieving target record"
        );
        let record = self
            .organization_service
            .retrieve(target.logical_name(), target.id(), &ColumnSet::All)
            .await?;
        debug!(
            action = %self.action_name,
            attribute_count = record.attributes().len(),
            "target record retrieved"
        );

        let update = self.field_mapping.build_update(input);

        debug!(
            action = %self.action_name,
            logical_name = %target.logical_name(),
            record_id = %target.id(),
            "updating target record"
        );
        self.organization_service
            .update(target.logical_name(), target.id(), update)
            .await?;
        debug!(action = %self.action_name, "target record updated");

        Ok(())
    }

    pub(super) async fn run_side_effect(&self, input: &ValidatedActionInput) {
        let Some(side_effect) = self.side_effect.as_ref() else {
            debug!(action = %self.action_name, "no side effect configured");
            return;
        };

        debug!(
            action = %self.action_name,
            side_effect = %side_effect.describe(),
            "running side effect"
        );

        if let Err(error) = side_effect
            .apply(self.organization_service.as_ref(), input)
            .await
        {
            warn!(
                action = %self.action_name,
                side_effect = %side_effect.describe(),
                error = %error,
                "side effect failed; action outcome unaffected"
            );
        }
    }
}
