mod app;
mod config;
mod error_view;
mod gesture;
mod layer_selector;
mod logging;
mod map_view;
mod paint;
mod progress_view;
mod render_loop;
mod settings;
mod status_bar;
mod viewport;
mod visibility;
mod world_stream;

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn main() {
    console_error_panic_hook::set_once();
    logging::init();

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let mount_target = document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body());
    let Some(target) = mount_target else {
        tracing::error!("no mount target for the map");
        return;
    };

    tracing::info!(api = config::api_address(), "starting hexworld client");
    APP_MOUNT_HANDLE.with(move |slot| {
        // Drop any previous mount so its effects stop touching the shared signals.
        let _old = slot.borrow_mut().take();
        let handle = mount_to(target, app::App);
        *slot.borrow_mut() = Some(Box::new(handle));
    });
}
