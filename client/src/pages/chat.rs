//! Chat page: header with the status indicator above the chat panel.

use leptos::prelude::*;
use leptos_meta::Title;
use leptos_router::components::Redirect;
use leptos_router::hooks::use_query_map;

use crate::components::chat_panel::ChatPanel;
use crate::components::status_bar::StatusBar;
use crate::net::chat_client::ChatClient;
use crate::pages::login::MISSING_USER_ERROR;
use crate::state::chat::ChatState;
use crate::state::user::CurrentUser;
use frames::SessionConfig;

/// Chat page for the user named by the `usuario` query parameter.
///
/// Creates the page's `ChatClient`, starts its transport in the browser, loads
/// the stored history, and sends DISCONNECT when the page unloads. A blank
/// username redirects back to the login page.
#[component]
pub fn ChatPage() -> impl IntoView {
    let query = use_query_map();
    let user = query.with_untracked(|q| CurrentUser::from_param(q.get("usuario").as_deref()));
    let Some(user) = user else {
        let path = format!("/?error={MISSING_USER_ERROR}");
        return view! { <Redirect path=path/> }.into_any();
    };

    let chat = expect_context::<RwSignal<ChatState>>();
    chat.set(ChatState::default());

    let (client, rx) = ChatClient::new(user.name(), SessionConfig::default());
    provide_context(client.clone());

    #[cfg(feature = "hydrate")]
    {
        crate::net::chat_client::spawn_chat_client(client.clone(), rx, chat);
        leptos::task::spawn_local(async move {
            let history = crate::net::history::fetch_history(None).await;
            chat.update(|c| c.seed_history(history));
        });

        let on_unload = client.clone();
        let unload = window_event_listener(leptos::ev::beforeunload, move |_| on_unload.disconnect());
        on_cleanup(move || {
            unload.remove();
            client.disconnect();
        });
    }

    #[cfg(not(feature = "hydrate"))]
    {
        // Server render: no transport.
        let _ = (client, rx);
    }

    let name = user.name().to_owned();
    view! {
        <Title text=format!("KodiChat - {name}")/>
        <div class="chat-page">
            <header class="chat-header">
                <h1>"KodiChat"</h1>
                <span class="chat-user">{name.clone()}</span>
                <StatusBar/>
            </header>
            <ChatPanel/>
        </div>
    }
    .into_any()
}
