use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::gesture::FrameRequest;

/// Runs a callback on the next `requestAnimationFrame`.
///
/// Repeated requests before the frame fires collapse into one callback.
/// Dropping the scheduler cancels a pending frame.
pub struct FrameScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl FrameScheduler {
    pub fn new(on_frame: impl Fn() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = inner.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            inner_cb.scheduled.set(false);
            inner_cb.raf_id.set(None);
            on_frame();
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    /// Schedule the callback unless a frame is already pending.
    /// Returns `false` when no frame could be requested.
    pub fn request(&self) -> bool {
        if self.inner.scheduled.get() {
            return true;
        }
        let cb_ref = self.inner.callback.borrow();
        let (Some(cb), Some(window)) = (cb_ref.as_ref(), self.inner.window.as_ref()) else {
            return false;
        };
        match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => {
                self.inner.scheduled.set(true);
                self.inner.raf_id.set(Some(id));
                true
            }
            Err(err) => {
                tracing::warn!(?err, "requestAnimationFrame failed");
                false
            }
        }
    }
}

impl FrameRequest for FrameScheduler {
    fn request_frame(&self) -> bool {
        self.request()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
        // Break the callback->inner reference cycle on teardown.
        self.inner.callback.borrow_mut().take();
    }
}
