use futures::future::{AbortHandle, Abortable};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use hexworld_shared::{IngestError, Ingestion, TileIndex};

use crate::config;
use crate::error_view::ErrorView;
use crate::map_view::MapView;
use crate::progress_view::ProgressView;
use crate::settings::{self, Settings};
use crate::viewport::{PanMode, Viewport};
use crate::world_stream::{WorldRequest, stream_world};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadState {
    Connecting,
    /// The map is visible while further chunks keep arriving.
    Streaming,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Progress,
    Map,
    Error(String),
}

/// Newtype wrappers so each signal gets a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct WorldState(pub RwSignal<Ingestion>);
#[derive(Clone, Copy)]
pub(crate) struct LoadStatus(pub RwSignal<LoadState>);
#[derive(Clone, Copy)]
pub(crate) struct SelectedTile(pub RwSignal<Option<TileIndex>>);
#[derive(Clone, Copy)]
pub(crate) struct PanModeSetting(pub RwSignal<PanMode>);
#[derive(Clone, Copy)]
pub(crate) struct DetailedSvg(pub RwSignal<bool>);

/// Physical screen size, used to size segments for this device.
fn screen_dimensions() -> (f64, f64) {
    let Some(screen) = web_sys::window().and_then(|window| window.screen().ok()) else {
        return (0.0, 0.0);
    };
    let width = screen.width().map(f64::from).unwrap_or(0.0);
    let height = screen.height().map(f64::from).unwrap_or(0.0);
    (width, height)
}

fn start_world_stream(ingestion: RwSignal<Ingestion>, load_state: RwSignal<LoadState>) -> AbortHandle {
    let (abort, registration) = AbortHandle::new_pair();
    let (width, height) = screen_dimensions();
    let request = WorldRequest::sample(config::optimal_segment_tiles(width, height));

    spawn_local(async move {
        let session = stream_world(request, move |event| {
            let step = ingestion
                .try_update(|state| state.apply(event))
                .unwrap_or(Err(IngestError::Truncated))?;
            if step.world_changed
                && load_state.get_untracked() == LoadState::Connecting
                && ingestion.with_untracked(|state| state.world().has_segments())
            {
                load_state.set(LoadState::Streaming);
            }
            Ok(step)
        });
        match Abortable::new(session, registration).await {
            Ok(Ok(())) => {
                let chunks = ingestion.with_untracked(Ingestion::chunks);
                tracing::info!(chunks, "world loaded");
                load_state.set(LoadState::Loaded);
            }
            Ok(Err(err)) => {
                tracing::error!(%err, "world stream failed");
                load_state.set(LoadState::Failed(err.to_string()));
            }
            Err(_) => tracing::debug!("world stream aborted"),
        }
    });
    abort
}

#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = settings::load();
    let ingestion: RwSignal<Ingestion> = RwSignal::new(Ingestion::new());
    let load_state: RwSignal<LoadState> = RwSignal::new(LoadState::Connecting);
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::with_pan_mode(saved.pan_mode));
    let selected: RwSignal<Option<TileIndex>> = RwSignal::new(None);
    let pan_mode: RwSignal<PanMode> = RwSignal::new(saved.pan_mode);
    let detailed_svg: RwSignal<bool> = RwSignal::new(saved.detailed_svg);

    provide_context(viewport);
    provide_context(WorldState(ingestion));
    provide_context(LoadStatus(load_state));
    provide_context(SelectedTile(selected));
    provide_context(PanModeSetting(pan_mode));
    provide_context(DetailedSvg(detailed_svg));

    // Persist settings to localStorage on any change
    Effect::new(move || {
        settings::save(&Settings {
            pan_mode: pan_mode.get(),
            detailed_svg: detailed_svg.get(),
        });
    });

    Effect::new(move || {
        let mode = pan_mode.get();
        if viewport.with_untracked(|vp| vp.pan_mode != mode) {
            viewport.update(|vp| vp.set_pan_mode(mode));
        }
    });

    // Fall back to the first streamed layer when the selected one doesn't exist.
    Effect::new(move || {
        let first = ingestion.with(|state| {
            let world = state.world();
            let current = viewport.with_untracked(|vp| vp.selected_depth);
            if world.layer(current).is_some() {
                None
            } else {
                world.depths().next()
            }
        });
        if let Some(depth) = first {
            selected.set(None);
            viewport.update(|vp| vp.selected_depth = depth);
        }
    });

    let abort = start_world_stream(ingestion, load_state);
    on_cleanup(move || abort.abort());

    let has_segments = Memo::new(move |_| ingestion.with(|state| state.world().has_segments()));
    let screen = Memo::new(move |_| match load_state.get() {
        LoadState::Failed(message) => Screen::Error(message),
        _ if has_segments.get() => Screen::Map,
        _ => Screen::Progress,
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #0c0e17; color: #e2e0d8; font-family: 'JetBrains Mono', monospace;">
            {move || match screen.get() {
                Screen::Error(message) => view! { <ErrorView message=message /> }.into_any(),
                Screen::Map => view! { <MapView /> }.into_any(),
                Screen::Progress => view! { <ProgressView /> }.into_any(),
            }}
        </div>
    }
}
