//! Coalesces pan input so the viewport moves at most once per frame.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanDelta {
    pub dx: f64,
    pub dy: f64,
}

/// Pending delta plus whether a frame has already been requested for it.
#[derive(Debug, Default)]
pub struct PanAccumulator {
    pending: Option<PanDelta>,
    scheduled: bool,
}

impl PanAccumulator {
    /// Add to the pending delta. Returns `true` when the caller has to request a frame.
    pub fn push(&mut self, dx: f64, dy: f64) -> bool {
        let pending = self.pending.get_or_insert_with(PanDelta::default);
        pending.dx += dx;
        pending.dy += dy;
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    /// The frame request failed; the next push must try again.
    pub fn unschedule(&mut self) {
        self.scheduled = false;
    }

    #[cfg(test)]
    fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn take(&mut self) -> Option<PanDelta> {
        self.scheduled = false;
        self.pending.take()
    }
}

pub type SharedPan = Rc<RefCell<PanAccumulator>>;

/// Something that can run the flush on the next animation frame.
pub trait FrameRequest {
    /// Returns `false` if no frame could be scheduled.
    fn request_frame(&self) -> bool;
}

pub struct GestureAggregator<F> {
    pending: SharedPan,
    frames: F,
}

impl<F: FrameRequest> GestureAggregator<F> {
    pub fn new(pending: SharedPan, frames: F) -> Self {
        Self { pending, frames }
    }

    pub fn pan(&self, dx: f64, dy: f64) {
        let needs_frame = self.pending.borrow_mut().push(dx, dy);
        if needs_frame && !self.frames.request_frame() {
            self.pending.borrow_mut().unschedule();
        }
    }

    /// Wheel deltas scroll content, so the map moves the opposite way.
    pub fn wheel(&self, delta_x: f64, delta_y: f64) {
        self.pan(-delta_x, -delta_y);
    }
}

/// Turns successive pointer positions into deltas while a drag is active.
#[derive(Debug, Default)]
pub struct DragTracker {
    last: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn track(&mut self, x: f64, y: f64, active: bool) -> Option<PanDelta> {
        if !active {
            self.last = None;
            return None;
        }
        let delta = self.last.map(|(last_x, last_y)| PanDelta {
            dx: x - last_x,
            dy: y - last_y,
        });
        self.last = Some((x, y));
        delta
    }

    pub fn release(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::viewport::{MapGeometry, Size, Viewport};
    use hexworld_shared::TileMetrics;

    #[derive(Default)]
    struct CountingFrames {
        requests: Cell<usize>,
        fail: bool,
    }

    impl FrameRequest for &CountingFrames {
        fn request_frame(&self) -> bool {
            self.requests.set(self.requests.get() + 1);
            !self.fail
        }
    }

    #[test]
    fn deltas_within_a_frame_are_summed() {
        let frames = CountingFrames::default();
        let pending = SharedPan::default();
        let aggregator = GestureAggregator::new(pending.clone(), &frames);

        aggregator.pan(-50.0, -20.0);
        aggregator.pan(10.0, 5.0);

        assert_eq!(frames.requests.get(), 1);
        assert_eq!(
            pending.borrow_mut().take(),
            Some(PanDelta { dx: -40.0, dy: -15.0 })
        );
        assert_eq!(pending.borrow_mut().take(), None);
    }

    #[test]
    fn flushed_delta_moves_viewport_once() {
        let frames = CountingFrames::default();
        let pending = SharedPan::default();
        let aggregator = GestureAggregator::new(pending.clone(), &frames);
        let geometry = MapGeometry::new(TileMetrics::new(52.0, 60.0), 100, 100);
        let size = Size::new(400.0, 400.0);
        let mut viewport = Viewport::default();

        aggregator.pan(-50.0, -20.0);
        aggregator.pan(10.0, 5.0);
        if let Some(delta) = pending.borrow_mut().take() {
            viewport.apply_pan(delta.dx, delta.dy, &geometry, size);
        }
        assert_eq!((viewport.offset.x, viewport.offset.y), (-40.0, -15.0));

        // A new frame is requested only after the flush.
        aggregator.pan(-1.0, 0.0);
        assert_eq!(frames.requests.get(), 2);
    }

    #[test]
    fn zero_delta_leaves_viewport_unchanged() {
        let frames = CountingFrames::default();
        let pending = SharedPan::default();
        let aggregator = GestureAggregator::new(pending.clone(), &frames);
        let geometry = MapGeometry::new(TileMetrics::new(52.0, 60.0), 100, 100);
        let size = Size::new(400.0, 400.0);
        let mut viewport = Viewport::default();
        viewport.apply_pan(-100.0, -100.0, &geometry, size);
        let before = viewport.clone();

        aggregator.pan(0.0, 0.0);
        if let Some(delta) = pending.borrow_mut().take() {
            viewport.apply_pan(delta.dx, delta.dy, &geometry, size);
        }
        assert_eq!(viewport, before);
    }

    #[test]
    fn failed_frame_request_is_retried_on_next_input() {
        let frames = CountingFrames {
            fail: true,
            ..CountingFrames::default()
        };
        let pending = SharedPan::default();
        let aggregator = GestureAggregator::new(pending.clone(), &frames);

        aggregator.pan(1.0, 1.0);
        assert!(!pending.borrow().is_scheduled());
        aggregator.pan(1.0, 1.0);
        assert_eq!(frames.requests.get(), 2);
        assert_eq!(pending.borrow_mut().take(), Some(PanDelta { dx: 2.0, dy: 2.0 }));
    }

    #[test]
    fn wheel_moves_map_against_scroll_direction() {
        let frames = CountingFrames::default();
        let pending = SharedPan::default();
        let aggregator = GestureAggregator::new(pending.clone(), &frames);
        aggregator.wheel(30.0, -12.0);
        assert_eq!(pending.borrow_mut().take(), Some(PanDelta { dx: -30.0, dy: 12.0 }));
    }

    #[test]
    fn drag_tracker_reports_deltas_only_while_active() {
        let mut drag = DragTracker::default();
        assert_eq!(drag.track(10.0, 10.0, true), None);
        assert_eq!(drag.track(14.0, 7.0, true), Some(PanDelta { dx: 4.0, dy: -3.0 }));
        assert_eq!(drag.track(20.0, 20.0, false), None);
        assert_eq!(drag.track(25.0, 25.0, true), None);
        drag.release();
        assert_eq!(drag.track(30.0, 30.0, true), None);
    }
}
