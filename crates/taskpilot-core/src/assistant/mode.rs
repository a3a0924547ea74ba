//! Backend selection.

use taskpilot_types::settings::{AssistantMode, AssistantSettings};

/// Remote when a non-blank credential is configured, otherwise Local.
pub fn select_mode(settings: &AssistantSettings) -> AssistantMode {
    if settings.credential().is_some() {
        AssistantMode::Remote
    } else {
        AssistantMode::Local
    }
}
