use async_trait::async_trait;
use dynakit_core::AppResult;
use dynakit_domain::ValidatedActionInput;

use super::OrganizationService;

/// Optional follow-up operation run after the target record was updated.
///
/// Failures are reported to the caller but never fail the action itself.
#[async_trait]
pub trait ActionSideEffect: Send + Sync {
    /// Returns a short label used in log output.
    fn describe(&self) -> &str;

    /// Runs the follow-up operation for one validated action input.
    async fn apply(
        &self,
        service: &dyn OrganizationService,
        input: &ValidatedActionInput,
    ) -> AppResult<()>;
}
