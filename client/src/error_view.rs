use leptos::prelude::*;

#[component]
pub fn ErrorView(message: String) -> impl IntoView {
    view! {
        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center;">
            <div
                role="alert"
                style="max-width: 420px; background: #1a1216; border: 1px solid #5c2a33; border-radius: 8px; padding: 16px 20px;"
            >
                <div style="font-size: 0.9rem; font-weight: 700; color: #ff7a85; margin-bottom: 6px;">
                    "Could not load the world"
                </div>
                <div style="font-size: 0.78rem; color: #c9c4b8; word-break: break-word;">{message}</div>
            </div>
        </div>
    }
}
