//! Model client abstractions for TaskPilot.
//!
//! - `ModelClient`: RPITIT trait for concrete wire clients
//! - `BoxModelClient`: object-safe wrapper for runtime provider selection
//! - `ModelConnector`: builds a client from the current settings per request

pub mod box_client;
pub mod client;

use taskpilot_types::error::AiCallError;
use taskpilot_types::settings::AssistantSettings;

use self::box_client::BoxModelClient;

/// Builds a model client from settings.
///
/// Called once per remote request so that settings edited mid-session
/// take effect on the next request.
pub trait ModelConnector: Send + Sync {
    fn connect(&self, settings: &AssistantSettings) -> Result<BoxModelClient, AiCallError>;
}
