use overlay_protocol::ViewportWindow;
use tracing::{debug, trace};

use crate::config::ViewConfig;

/// Windowing over a list of lazily measured units.
///
/// Every unit starts at the configured estimate; [`Scheduler::measure`]
/// replaces the estimate once the unit has been mounted and laid out. Unit
/// starts are kept as cumulative offsets so the visible range is two binary
/// searches away.
#[derive(Debug, Clone)]
pub struct Scheduler {
    overscan: usize,
    estimate: f64,
    sizes: Vec<f64>,
    measured: Vec<bool>,
    /// `offsets[i]` is the start of unit `i`; the last entry is the total height.
    offsets: Vec<f64>,
    scroll_offset: f64,
    viewport_height: f64,
    window: Option<ViewportWindow>,
}

impl Scheduler {
    pub fn new(unit_count: usize, config: &ViewConfig) -> Self {
        let mut scheduler = Self {
            overscan: config.overscan,
            estimate: config.estimated_unit_size,
            sizes: Vec::new(),
            measured: Vec::new(),
            offsets: vec![0.0],
            scroll_offset: 0.0,
            viewport_height: 0.0,
            window: None,
        };
        scheduler.set_unit_count(unit_count);
        scheduler
    }

    pub fn unit_count(&self) -> usize {
        self.sizes.len()
    }

    /// Replaces the unit list. Measurements belong to the previous units and
    /// are discarded.
    pub fn set_unit_count(&mut self, unit_count: usize) {
        self.sizes = vec![self.estimate; unit_count];
        self.measured = vec![false; unit_count];
        self.rebuild_offsets(0);
        debug!(unit_count, "scheduler reset");
        self.recompute();
    }

    /// Returns true when the window changed.
    pub fn set_scroll_offset(&mut self, offset: f64) -> bool {
        self.scroll_offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.recompute()
    }

    /// Returns true when the window changed.
    pub fn resize(&mut self, viewport_height: f64) -> bool {
        self.viewport_height = if viewport_height.is_finite() { viewport_height.max(0.0) } else { 0.0 };
        self.recompute()
    }

    /// Records the real size of a mounted unit. Returns true when the total
    /// height changed.
    pub fn measure(&mut self, unit: usize, size: f64) -> bool {
        if unit >= self.sizes.len() || !size.is_finite() || size < 0.0 {
            trace!(unit, size, "ignoring measurement");
            return false;
        }
        self.measured[unit] = true;
        if self.sizes[unit] == size {
            return false;
        }
        self.sizes[unit] = size;
        self.rebuild_offsets(unit);
        self.recompute();
        true
    }

    pub fn is_measured(&self, unit: usize) -> bool {
        self.measured.get(unit).copied().unwrap_or(false)
    }

    pub fn total_virtual_height(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Start offset of `unit`, for scroll-to-unit.
    pub fn unit_offset(&self, unit: usize) -> Option<f64> {
        (unit < self.sizes.len()).then(|| self.offsets[unit])
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn window(&self) -> Option<ViewportWindow> {
        self.window
    }

    /// Units to mount: the visible range widened by the overscan on each side.
    pub fn visible_unit_indices(&self) -> Vec<usize> {
        match self.window {
            Some(w) => {
                let first = w.first_visible_unit.saturating_sub(w.overscan);
                let last = w.last_visible_unit.saturating_add(w.overscan).min(self.sizes.len() - 1);
                (first..=last).collect()
            }
            None => Vec::new(),
        }
    }

    fn rebuild_offsets(&mut self, from: usize) {
        let n = self.sizes.len();
        self.offsets.resize(n + 1, 0.0);
        for i in from..n {
            self.offsets[i + 1] = self.offsets[i] + self.sizes[i];
        }
    }

    fn recompute(&mut self) -> bool {
        let n = self.sizes.len();
        let next = if n == 0 {
            None
        } else {
            let top = self.scroll_offset;
            let bottom = top + self.viewport_height;

            // Units that end at or above the top edge are scrolled past.
            let first = self.offsets[1..].partition_point(|&end| end <= top).min(n - 1);
            // Units that start above the bottom edge are (at least partly) in view.
            let started = self.offsets[..n].partition_point(|&start| start < bottom);
            let last = started.saturating_sub(1).max(first);

            Some(ViewportWindow {
                first_visible_unit: first,
                last_visible_unit: last,
                overscan: self.overscan,
            })
        };

        let changed = next != self.window;
        self.window = next;
        changed
    }
}
