use overlay_view::{ViewConfig, ViewError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    #[serde(flatten)]
    pub view: ViewConfig,
    /// Oldest events are dropped once this many are waiting to be drained.
    pub max_pending_events: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            view: ViewConfig::default(),
            max_pending_events: 1024,
        }
    }
}

impl OverlayConfig {
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.max_pending_events == 0 {
            return Err(ViewError::ZeroSetting("max_pending_events"));
        }
        self.view.validate()
    }
}
