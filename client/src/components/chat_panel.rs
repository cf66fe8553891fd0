//! Message history and the message form.

use leptos::prelude::*;

use crate::net::chat_client::{ChatClient, NOT_CONNECTED_ALERT};
use crate::state::chat::ChatState;
use crate::util::render::render_message;
use frames::SendError;

/// Chat panel showing message history and the form for sending new messages.
///
/// The form is disabled unless the session is connected. Every entry goes
/// through `render_message`, so inserted markup is already escaped.
#[component]
pub fn ChatPanel() -> impl IntoView {
    let chat = expect_context::<RwSignal<ChatState>>();
    let client = expect_context::<ChatClient>();
    let current_user = client.user();

    let input = RwSignal::new(String::new());
    let messages_ref = NodeRef::<leptos::html::Div>::new();
    let input_ref = NodeRef::<leptos::html::Input>::new();

    // Keep the newest message in view.
    Effect::new(move || {
        let _ = chat.with(|c| c.messages.len());

        #[cfg(feature = "hydrate")]
        {
            if let Some(el) = messages_ref.get() {
                let scroll_height = el.scroll_height();
                el.set_scroll_top(scroll_height);
            }
        }
    });

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        match client.send_message(&input.get_untracked()) {
            Ok(()) => {
                input.set(String::new());
                #[cfg(feature = "hydrate")]
                {
                    if let Some(el) = input_ref.get_untracked() {
                        let _ = el.focus();
                    }
                }
            }
            Err(SendError::Empty) => {}
            Err(SendError::NotConnected | SendError::Closed) => alert_not_connected(),
        }
    };

    let enabled = move || chat.with(ChatState::input_enabled);
    let placeholder = move || chat.with(ChatState::input_placeholder);

    view! {
        <div class="chat-panel">
            <div id="messageArea" class="message-area" node_ref=messages_ref>
                {move || {
                    chat.with(|c| {
                        c.messages
                            .iter()
                            .map(|msg| {
                                let rendered = render_message(msg, &current_user);
                                view! {
                                    <div class="message-container">
                                        <div class=rendered.class() inner_html=rendered.to_html()></div>
                                    </div>
                                }
                            })
                            .collect::<Vec<_>>()
                    })
                }}
            </div>

            <form id="messageForm" class="message-form" on:submit=on_submit>
                <input
                    id="messageInput"
                    class="message-input"
                    type="text"
                    autocomplete="off"
                    node_ref=input_ref
                    placeholder=placeholder
                    disabled=move || !enabled()
                    prop:value=move || input.get()
                    on:input=move |ev| input.set(event_target_value(&ev))
                />
                <button id="sendButton" class="send-button" type="submit" disabled=move || !enabled()>
                    "Enviar"
                </button>
            </form>
        </div>
    }
}

/// Blocking alert for sends attempted without a connection.
fn alert_not_connected() {
    #[cfg(feature = "hydrate")]
    {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(NOT_CONNECTED_ALERT);
        }
    }

    #[cfg(not(feature = "hydrate"))]
    {
        leptos::logging::warn!("{NOT_CONNECTED_ALERT}");
    }
}
