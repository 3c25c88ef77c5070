use leptos::prelude::*;

use hexworld_shared::World;

use crate::app::{SelectedTile, WorldState};
use crate::map_view::ViewportSize;
use crate::viewport::{MapGeometry, Viewport};

/// `(depth, label)` for every streamed layer, shallowest first.
pub fn layer_options(world: &World) -> Vec<(u32, String)> {
    world
        .layers
        .values()
        .map(|grid| {
            let label = if grid.name.is_empty() {
                format!("Layer {}", grid.depth)
            } else {
                grid.name.clone()
            };
            (grid.depth, label)
        })
        .collect()
}

/// Depth switcher. Hidden while the world has a single layer.
#[component]
pub fn LayerSelector() -> impl IntoView {
    let WorldState(ingestion) = expect_context();
    let SelectedTile(selected) = expect_context();
    let ViewportSize(size) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let options = Memo::new(move |_| ingestion.with(|state| layer_options(state.world())));
    let current = Memo::new(move |_| viewport.with(|vp| vp.selected_depth));

    let select = move |depth: u32| {
        if current.get_untracked() == depth {
            return;
        }
        let geometry = ingestion.with_untracked(|state| MapGeometry::for_layer(state.world(), depth));
        let size = size.get_untracked();
        selected.set(None);
        viewport.update(|vp| vp.select_depth(depth, &geometry, size));
        tracing::debug!(depth, "layer selected");
    };

    view! {
        <Show when=move || options.with(|options| options.len() > 1)>
            <div style="position: absolute; top: 12px; right: 12px; display: flex; flex-direction: column; gap: 4px; background: #13161f; border: 1px solid #282c3e; border-radius: 6px; padding: 6px; font-size: 0.75rem;">
                {move || {
                    options
                        .get()
                        .into_iter()
                        .map(|(depth, label)| {
                            let active = move || current.get() == depth;
                            view! {
                                <button
                                    style="border: none; border-radius: 4px; padding: 3px 10px; text-align: left; cursor: pointer; font: inherit;"
                                    style:background=move || if active() { "#1a1d2a" } else { "transparent" }
                                    style:color=move || if active() { "#f5c542" } else { "#c9c4b8" }
                                    on:click=move |_| select(depth)
                                >
                                    {label}
                                </button>
                            }
                        })
                        .collect_view()
                }}
            </div>
        </Show>
    }
}
