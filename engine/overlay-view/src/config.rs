use serde::{Deserialize, Serialize};

use crate::ViewError;

/// Tuning for unit layout, virtualization and paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Extra units rendered on each side of the visible range.
    pub overscan: usize,
    /// Size assumed for a unit until it has been measured.
    pub estimated_unit_size: f64,
    /// Unit size, in tokens, for documents without sentence ranges.
    pub tokens_per_unit: usize,
    /// Units per page in the paged (non-virtualized) variant.
    pub elements_per_page: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            overscan: 1,
            estimated_unit_size: 120.0,
            tokens_per_unit: 200,
            elements_per_page: 100,
        }
    }
}

impl ViewConfig {
    pub fn validate(&self) -> Result<(), ViewError> {
        if !(self.estimated_unit_size.is_finite() && self.estimated_unit_size > 0.0) {
            return Err(ViewError::InvalidEstimate(self.estimated_unit_size));
        }
        if self.tokens_per_unit == 0 {
            return Err(ViewError::ZeroSetting("tokens_per_unit"));
        }
        if self.elements_per_page == 0 {
            return Err(ViewError::ZeroSetting("elements_per_page"));
        }
        Ok(())
    }
}
