use leptos::prelude::*;

use hexworld_shared::{Stage, StageState};

use crate::app::WorldState;

/// Whole-number percentage for a `0.0..=1.0` fraction.
pub fn format_percentage(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    format!("{:.0}%", fraction * 100.0)
}

/// Right-hand detail for a stage row: subtitle while it runs, duration once done.
pub fn stage_detail(stage: &Stage) -> Option<String> {
    match (stage.state, stage.duration_ms, stage.subtitle.as_ref()) {
        (StageState::Done, Some(ms), _) => Some(format!("{ms:.0} ms")),
        (_, _, Some(subtitle)) if !subtitle.is_empty() => Some(subtitle.clone()),
        _ => None,
    }
}

fn stage_marker(state: StageState) -> (&'static str, &'static str) {
    match state {
        StageState::Waiting => ("\u{25CB}", "#5a5860"),
        StageState::Running => ("\u{25D4}", "#f5c542"),
        StageState::Done => ("\u{25CF}", "#6fcf97"),
    }
}

/// Shown until the first segments arrive.
#[component]
pub fn ProgressView() -> impl IntoView {
    let WorldState(ingestion) = expect_context();
    let progress = Memo::new(move |_| ingestion.with(|state| state.progress().cloned()));

    view! {
        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center;">
            <div style="width: 360px; background: #13161f; border: 1px solid #282c3e; border-radius: 8px; padding: 18px 20px;">
                <div style="display: flex; justify-content: space-between; font-size: 0.9rem; margin-bottom: 10px;">
                    <span>"Generating world"</span>
                    <span style="color: #f5c542;">
                        {move || format_percentage(progress.get().map(|p| p.percentage).unwrap_or(0.0))}
                    </span>
                </div>
                <div style="height: 4px; background: #1f2330; border-radius: 2px; overflow: hidden; margin-bottom: 14px;">
                    <div
                        style="height: 100%; background: #f5c542; transition: width 0.2s;"
                        style:width=move || format_percentage(progress.get().map(|p| p.percentage).unwrap_or(0.0))
                    />
                </div>
                <ul style="list-style: none; padding: 0; margin: 0; font-size: 0.78rem;">
                    {move || {
                        progress
                            .get()
                            .map(|p| p.stages)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|stage| {
                                let (marker, color) = stage_marker(stage.state);
                                let detail = stage_detail(&stage);
                                view! {
                                    <li style="display: flex; gap: 8px; padding: 3px 0;">
                                        <span style:color=color>{marker}</span>
                                        <span style="flex: 1;">{stage.title}</span>
                                        <span style="color: #5a5860;">{detail}</span>
                                    </li>
                                }
                            })
                            .collect_view()
                    }}
                </ul>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_clamped_and_rounded() {
        assert_eq!(format_percentage(0.256), "26%");
        assert_eq!(format_percentage(1.5), "100%");
        assert_eq!(format_percentage(f64::NAN), "0%");
    }

    #[test]
    fn stage_detail_prefers_duration_when_done() {
        let mut stage = Stage {
            title: "Terrain".into(),
            subtitle: Some("layer 2 of 5".into()),
            state: StageState::Running,
            duration_ms: None,
        };
        assert_eq!(stage_detail(&stage).as_deref(), Some("layer 2 of 5"));

        stage.state = StageState::Done;
        stage.duration_ms = Some(812.4);
        assert_eq!(stage_detail(&stage).as_deref(), Some("812 ms"));

        stage.subtitle = None;
        stage.duration_ms = None;
        assert_eq!(stage_detail(&stage), None);
    }
}
