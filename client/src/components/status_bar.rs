//! Connection status indicator shown in the chat header.

use leptos::prelude::*;

use crate::state::chat::{ChatState, status_class, status_label};

/// Status indicator: a colored dot plus the nested status text.
#[component]
pub fn StatusBar() -> impl IntoView {
    let chat = expect_context::<RwSignal<ChatState>>();

    let class = move || status_class(chat.with(|c| c.connection));
    let label = move || status_label(chat.with(|c| c.connection));

    view! {
        <div id="connectionStatus" class=class>
            <span class="status-dot"></span>
            <span class="status-text">{label}</span>
        </div>
    }
}
