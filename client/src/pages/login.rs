//! Login page: pick a username and enter the chat.

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

/// Query value the chat page redirects back with when no username was given.
pub const MISSING_USER_ERROR: &str = "usuario_requerido";

/// Login page. Submitting the form loads `/chat?usuario=<name>`.
#[component]
pub fn LoginPage() -> impl IntoView {
    let query = use_query_map();
    let missing_user = move || query.with(|q| q.get("error").as_deref() == Some(MISSING_USER_ERROR));

    view! {
        <div class="login-page">
            <h1>"KodiChat"</h1>
            <p>"Chat en tiempo real"</p>
            <Show when=missing_user>
                <p class="login-error">"Debes ingresar un nombre de usuario."</p>
            </Show>
            <form class="login-form" method="get" action="/chat">
                <input
                    class="login-input"
                    type="text"
                    name="usuario"
                    placeholder="Tu nombre"
                    maxlength="50"
                    required=true
                    autofocus=true
                />
                <button type="submit" class="login-button">
                    "Entrar al chat"
                </button>
            </form>
        </div>
    }
}
