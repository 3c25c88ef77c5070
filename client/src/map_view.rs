use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MouseEvent, TouchEvent, WheelEvent};

use crate::app::{DetailedSvg, SelectedTile, WorldState};
use crate::gesture::{DragTracker, GestureAggregator, PanDelta, SharedPan};
use crate::layer_selector::LayerSelector;
use crate::paint::{Background, hex_points, segment_paint, tile_paint};
use crate::render_loop::FrameScheduler;
use crate::status_bar::StatusBar;
use crate::viewport::{MapGeometry, Size, Viewport};
use crate::visibility::{ResolveOptions, VisibilityCache, VisibleSet};

/// Measured size of the map container, shared with the overlays.
#[derive(Clone, Copy)]
pub(crate) struct ViewportSize(pub RwSignal<Size>);

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

fn unbind_resize() {
    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("resize", old.handler.as_ref().unchecked_ref());
        }
    });
}

fn window_dimensions() -> Size {
    let Some(window) = web_sys::window() else {
        return Size::new(1200.0, 800.0);
    };
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    Size::new(width, height)
}

/// Container size, or the window size while the container has no layout yet.
fn measure(el: &web_sys::HtmlDivElement) -> Size {
    let rect = el.get_bounding_client_rect();
    if rect.width() > 0.0 && rect.height() > 0.0 {
        Size::new(rect.width(), rect.height())
    } else {
        window_dimensions()
    }
}

fn local_point(container: NodeRef<leptos::html::Div>, client_x: f64, client_y: f64) -> (f64, f64) {
    container
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (client_x - rect.left(), client_y - rect.top())
        })
        .unwrap_or((client_x, client_y))
}

fn set_body_overscroll(value: &str) {
    let Some(body) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body())
    else {
        return;
    };
    let _ = body.style().set_property("overscroll-behavior", value);
}

#[component]
pub fn MapView() -> impl IntoView {
    let WorldState(ingestion) = expect_context();
    let SelectedTile(selected) = expect_context();
    let DetailedSvg(detailed_svg) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let container_ref = NodeRef::<leptos::html::Div>::new();
    let size: RwSignal<Size> = RwSignal::new(Size::default());
    provide_context(ViewportSize(size));

    let depth = Memo::new(move |_| viewport.with(|vp| vp.selected_depth));
    let zoomed_out = Memo::new(move |_| viewport.with(|vp| vp.zoomed_out));
    let geometry = Memo::new(move |_| {
        let depth = depth.get();
        ingestion.with(|state| MapGeometry::for_layer(state.world(), depth))
    });

    // Streamed rows, a new layer or a resize can leave the offset out of range.
    Effect::new(move || {
        let geometry = geometry.get();
        let size = size.get();
        let mut next = viewport.get_untracked();
        next.refit(&geometry, size);
        if next != viewport.get_untracked() {
            viewport.set(next);
        }
    });

    let cache = StoredValue::new(VisibilityCache::default());
    let visible = Memo::new(move |_| {
        let vp = viewport.get();
        let size = size.get();
        let metrics = geometry.get().metrics;
        let options = ResolveOptions {
            include_tiles: !vp.zoomed_out,
            ..ResolveOptions::default()
        };
        ingestion.with(|state| {
            let Some(grid) = state.world().layer(vp.selected_depth) else {
                return VisibleSet::default();
            };
            cache
                .try_update_value(|cache| cache.resolve(grid, &metrics, &vp, size, options).clone())
                .unwrap_or_default()
        })
    });

    Effect::new(move || {
        visible.with(|set| {
            let depth = viewport.with_untracked(|vp| vp.selected_depth);
            let loaded = ingestion
                .with_untracked(|state| state.world().layer(depth).map(|grid| grid.segment_count()))
                .unwrap_or_default();
            tracing::debug!(
                segments = set.segments.len(),
                loaded,
                tiles = set.tiles.len(),
                bounds = %set.bounds.key(),
                computations = cache.try_with_value(|cache| cache.computations()).unwrap_or_default(),
                "visible set changed"
            );
        });
    });

    // Measure on mount and whenever the window resizes.
    Effect::new(move || {
        let Some(el) = container_ref.get() else {
            return;
        };
        let measured = measure(&el);
        if size.get_untracked() != measured {
            size.set(measured);
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        unbind_resize();
        let handler = Closure::<dyn Fn()>::new(move || {
            if let Some(el) = container_ref.get_untracked() {
                let measured = measure(&el);
                if size.get_untracked() != measured {
                    size.set(measured);
                }
            }
        });
        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding { window, handler });
            });
        }
    });
    on_cleanup(unbind_resize);

    set_body_overscroll("none");
    on_cleanup(|| set_body_overscroll(""));

    // --- Gesture pipeline: input -> pending delta -> one flush per frame ---

    let pending = SharedPan::default();
    let frames = {
        let pending = pending.clone();
        FrameScheduler::new(move || {
            let Some(delta) = pending.borrow_mut().take() else {
                return;
            };
            if delta == PanDelta::default() {
                return;
            }
            let (Some(geometry), Some(size)) = (geometry.try_get_untracked(), size.try_get_untracked()) else {
                return;
            };
            let _ = viewport.try_update(|vp| vp.apply_pan(delta.dx, delta.dy, &geometry, size));
        })
    };
    let gestures = Rc::new(GestureAggregator::new(pending, frames));
    let drag = Rc::new(RefCell::new(DragTracker::default()));

    let on_mouse_move = {
        let gestures = gestures.clone();
        let drag = drag.clone();
        move |e: MouseEvent| {
            let (x, y) = (e.client_x() as f64, e.client_y() as f64);
            let panning = e.meta_key() || e.ctrl_key();
            let delta = drag.borrow_mut().track(x, y, panning);
            if let Some(delta) = delta {
                gestures.pan(delta.dx, delta.dy);
            }
            if panning {
                return;
            }

            let vp = viewport.get_untracked();
            if vp.zoomed_out {
                return;
            }
            let (local_x, local_y) = local_point(container_ref, x, y);
            let metrics = geometry.get_untracked().metrics;
            let hit = ingestion.with_untracked(|state| {
                state
                    .world()
                    .layer(vp.selected_depth)
                    .and_then(|grid| vp.tile_at(grid, &metrics, local_x, local_y))
            });
            if hit != selected.get_untracked() {
                selected.set(hit);
            }
        }
    };

    let on_mouse_leave = {
        let drag = drag.clone();
        move |_: MouseEvent| {
            drag.borrow_mut().release();
            if selected.get_untracked().is_some() {
                selected.set(None);
            }
        }
    };

    let on_click = move |e: MouseEvent| {
        if !e.shift_key() {
            return;
        }
        let geometry = geometry.get_untracked();
        let size = size.get_untracked();
        viewport.update(|vp| vp.toggle_zoom_out(&geometry, size));
        selected.set(None);
    };

    let on_wheel = {
        let gestures = gestures.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            gestures.wheel(e.delta_x(), e.delta_y());
        }
    };

    let on_touch_start = {
        let drag = drag.clone();
        move |e: TouchEvent| {
            let mut drag = drag.borrow_mut();
            drag.release();
            if let Some(touch) = e.touches().get(0) {
                let _ = drag.track(touch.client_x() as f64, touch.client_y() as f64, true);
            }
        }
    };

    let on_touch_move = {
        let gestures = gestures.clone();
        let drag = drag.clone();
        move |e: TouchEvent| {
            let touches = e.touches();
            if touches.length() != 1 {
                drag.borrow_mut().release();
                return;
            }
            e.prevent_default();
            let Some(touch) = touches.get(0) else {
                return;
            };
            let delta = drag
                .borrow_mut()
                .track(touch.client_x() as f64, touch.client_y() as f64, true);
            if let Some(delta) = delta {
                gestures.pan(delta.dx, delta.dy);
            }
        }
    };

    let on_touch_end = {
        let drag = drag.clone();
        move |_: TouchEvent| drag.borrow_mut().release()
    };

    let layer_style = move || {
        let vp = viewport.get();
        let map = geometry.get().map;
        format!(
            "position: absolute; left: 0; top: 0; width: {}px; height: {}px; transform-origin: 0 0; transform: translate({}px, {}px) scale({});",
            map.width, map.height, vp.offset.x, vp.offset.y, vp.zoom
        )
    };

    let selection_points = Memo::new(move |_| {
        let index = selected.get()?;
        let depth = depth.get();
        let metrics = geometry.get().metrics;
        ingestion.with(|state| {
            let tile = state.world().layer(depth)?.tile(index)?;
            Some(hex_points(&metrics, tile.coordinate.row, tile.coordinate.column))
        })
    });

    view! {
        <div style="position: absolute; inset: 0; display: flex; flex-direction: column;">
            <div
                node_ref=container_ref
                style="position: relative; flex: 1; overflow: hidden; touch-action: none; user-select: none;"
                on:mousemove=on_mouse_move
                on:mouseleave=on_mouse_leave
                on:click=on_click
                on:wheel=on_wheel
                on:touchstart=on_touch_start
                on:touchmove=on_touch_move
                on:touchend=on_touch_end
            >
                <div class="world" style=layer_style>
                    <For
                        each=move || {
                            let depth = depth.get();
                            visible.get().segments.into_iter().map(|index| (depth, index)).collect::<Vec<_>>()
                        }
                        key=|item| *item
                        children=move |(depth, index)| {
                            let paint = Memo::new(move |_| {
                                let zoomed_out = zoomed_out.get();
                                let detailed = detailed_svg.get();
                                let metrics = geometry.get_untracked().metrics;
                                ingestion.with_untracked(|state| {
                                    let segment = state.world().layer(depth)?.segment(index)?;
                                    Some(segment_paint(&metrics, segment, zoomed_out, detailed))
                                })
                            });
                            move || {
                                paint.get().map(|paint| {
                                    let style = format!(
                                        "position: absolute; left: {}px; top: {}px; width: {}px; height: {}px; pointer-events: none;",
                                        paint.left, paint.top, paint.width, paint.height
                                    );
                                    match paint.background {
                                        Background::Svg(svg) => view! {
                                            <div class="segment" data-key=paint.key style=style inner_html=svg />
                                        }
                                        .into_any(),
                                        Background::Image(src) => view! {
                                            <img class="segment" data-key=paint.key style=style src=src alt="" draggable="false" />
                                        }
                                        .into_any(),
                                        Background::None => view! {
                                            <div class="segment" data-key=paint.key style=style />
                                        }
                                        .into_any(),
                                    }
                                })
                            }
                        }
                    />
                    <svg
                        class="tiles"
                        style="position: absolute; left: 0; top: 0; overflow: visible; pointer-events: none;"
                        width=move || geometry.get().map.width.to_string()
                        height=move || geometry.get().map.height.to_string()
                    >
                        <For
                            each=move || {
                                let depth = depth.get();
                                visible.get().tiles.into_iter().map(|index| (depth, index)).collect::<Vec<_>>()
                            }
                            key=|item| *item
                            children=move |(depth, index)| {
                                let metrics = geometry.get_untracked().metrics;
                                ingestion
                                    .with_untracked(|state| {
                                        state.world().layer(depth)?.tile(index).map(|tile| tile_paint(&metrics, tile))
                                    })
                                    .map(|paint| view! {
                                        <polygon
                                            class=paint.class
                                            points=paint.points
                                            data-key=paint.key
                                            fill="transparent"
                                            stroke="rgba(255,255,255,0.06)"
                                        />
                                    })
                            }
                        />
                        {move || selection_points.get().map(|points| view! {
                            <polygon
                                class="selection"
                                points=points
                                fill="rgba(245,197,66,0.12)"
                                stroke="#f5c542"
                                stroke-width="3"
                            />
                        })}
                    </svg>
                </div>
                <LayerSelector />
            </div>
            <StatusBar />
        </div>
    }
}
