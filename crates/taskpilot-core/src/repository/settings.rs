//! Settings repository trait definition.

use taskpilot_types::error::RepositoryError;
use taskpilot_types::settings::AssistantSettings;

/// Repository trait for the persisted [`AssistantSettings`].
pub trait SettingsRepository: Send + Sync {
    /// Load the current settings. Missing keys take their defaults.
    fn get(
        &self,
    ) -> impl std::future::Future<Output = Result<AssistantSettings, RepositoryError>> + Send;

    /// Persist the full settings object.
    fn save(
        &self,
        settings: &AssistantSettings,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
