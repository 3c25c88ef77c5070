use leptos::prelude::*;

use hexworld_shared::{TileIndex, World};

use crate::app::{DetailedSvg, LoadState, LoadStatus, PanModeSetting, SelectedTile, WorldState};
use crate::viewport::{PanMode, Viewport};

#[derive(Debug, Clone, PartialEq)]
pub struct TileSummary {
    pub key: String,
    pub terrain_id: String,
    pub terrain_name: Option<String>,
    pub movement_penalty: Option<i32>,
}

pub fn tile_summary(world: &World, depth: u32, index: TileIndex) -> Option<TileSummary> {
    let tile = world.layer(depth)?.tile(index)?;
    let terrain = world.terrain(&tile.terrain_id);
    Some(TileSummary {
        key: tile.display_key(),
        terrain_id: tile.terrain_id.clone(),
        terrain_name: terrain.map(|t| t.name.clone()).filter(|name| !name.is_empty()),
        movement_penalty: terrain.map(|t| t.movement_penalty),
    })
}

fn toggle_style(active: bool) -> &'static str {
    if active {
        "background: #1a1d2a; border: 1px solid rgba(245,197,66,0.4); color: #f5c542; border-radius: 4px; padding: 2px 8px; cursor: pointer; font: inherit;"
    } else {
        "background: #13161f; border: 1px solid #282c3e; color: #5a5860; border-radius: 4px; padding: 2px 8px; cursor: pointer; font: inherit;"
    }
}

#[component]
pub fn StatusBar() -> impl IntoView {
    let WorldState(ingestion) = expect_context();
    let LoadStatus(load_state) = expect_context();
    let SelectedTile(selected) = expect_context();
    let PanModeSetting(pan_mode) = expect_context();
    let DetailedSvg(detailed_svg) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let summary = Memo::new(move |_| {
        let index = selected.get()?;
        let depth = viewport.with(|vp| vp.selected_depth);
        ingestion.with(|state| tile_summary(state.world(), depth, index))
    });
    let streaming = Memo::new(move |_| load_state.get() == LoadState::Streaming);

    view! {
        <div style="display: flex; align-items: center; gap: 16px; height: 32px; padding: 0 12px; background: #13161f; border-top: 1px solid #282c3e; font-size: 0.75rem;">
            <div style="flex: 1; display: flex; gap: 14px; min-width: 0;">
                {move || match summary.get() {
                    Some(summary) => view! {
                        <span style="color: #e2e0d8;">{summary.key}</span>
                        <span>{summary.terrain_name.unwrap_or(summary.terrain_id)}</span>
                        <span style="color: #5a5860;">
                            {summary.movement_penalty.map(|p| format!("movement +{p}%"))}
                        </span>
                    }
                    .into_any(),
                    None => view! { <span style="color: #5a5860;">"Hover a tile"</span> }.into_any(),
                }}
            </div>
            {move || streaming.get().then(|| view! {
                <span style="color: #f5c542; animation: pulse-dot 1.5s ease-in-out infinite;">"streaming\u{2026}"</span>
            })}
            <button
                style=move || toggle_style(pan_mode.get() == PanMode::Discrete)
                title="Snap panning to whole tiles"
                on:click=move |_| {
                    pan_mode.update(|mode| {
                        *mode = match *mode {
                            PanMode::Continuous => PanMode::Discrete,
                            PanMode::Discrete => PanMode::Continuous,
                        }
                    })
                }
            >
                "Snap"
            </button>
            <button
                style=move || toggle_style(detailed_svg.get())
                title="Render segments from SVG"
                on:click=move |_| detailed_svg.update(|v| *v = !*v)
            >
                "SVG"
            </button>
        </div>
    }
}
