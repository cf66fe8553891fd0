//! Topic broker: client registry, subscriptions, and fan-out.
//!
//! DESIGN
//! ======
//! A client is registered when its CONNECT succeeds and unregistered when
//! its socket loop ends. Publishing wraps the body in one MESSAGE frame per
//! matching subscription and pushes it onto the subscriber's channel. Routing
//! is exact destination match; there are no wildcards.

use frames::{Command, Frame, header};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{AppState, ConnectedClient};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("client not registered: {0}")]
    UnknownClient(Uuid),
    #[error("subscription id already in use: {0}")]
    DuplicateSubscription(String),
    #[error("no subscription with id: {0}")]
    NoSuchSubscription(String),
}

// =============================================================================
// REGISTRY
// =============================================================================

pub async fn register(state: &AppState, client_id: Uuid, tx: mpsc::Sender<Frame>) {
    state.clients.write().await.insert(client_id, ConnectedClient::new(tx));
    info!(%client_id, "broker: client registered");
}

/// Remove a client and drop its subscriptions. Returns the username it announced.
pub async fn unregister(state: &AppState, client_id: Uuid) -> Option<String> {
    let removed = state.clients.write().await.remove(&client_id)?;
    info!(%client_id, subscriptions = removed.subscriptions.len(), "broker: client unregistered");
    removed.user
}

/// Remember the username a client announced.
///
/// # Errors
///
/// Returns [`BrokerError::UnknownClient`] if the client is not registered.
pub async fn set_user(state: &AppState, client_id: Uuid, user: &str) -> Result<(), BrokerError> {
    let mut clients = state.clients.write().await;
    let client = clients.get_mut(&client_id).ok_or(BrokerError::UnknownClient(client_id))?;
    client.user = Some(user.to_owned());
    Ok(())
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// Subscribe a client to `destination` under the client-chosen id.
///
/// # Errors
///
/// Fails if the client is unknown or already uses `subscription_id`.
pub async fn subscribe(
    state: &AppState,
    client_id: Uuid,
    subscription_id: &str,
    destination: &str,
) -> Result<(), BrokerError> {
    let mut clients = state.clients.write().await;
    let client = clients.get_mut(&client_id).ok_or(BrokerError::UnknownClient(client_id))?;
    if client.subscriptions.contains_key(subscription_id) {
        return Err(BrokerError::DuplicateSubscription(subscription_id.to_owned()));
    }
    client
        .subscriptions
        .insert(subscription_id.to_owned(), destination.to_owned());
    info!(%client_id, subscription_id, destination, "broker: subscribed");
    Ok(())
}

/// # Errors
///
/// Fails if the client is unknown or has no subscription with that id.
pub async fn unsubscribe(state: &AppState, client_id: Uuid, subscription_id: &str) -> Result<(), BrokerError> {
    let mut clients = state.clients.write().await;
    let client = clients.get_mut(&client_id).ok_or(BrokerError::UnknownClient(client_id))?;
    client
        .subscriptions
        .remove(subscription_id)
        .ok_or_else(|| BrokerError::NoSuchSubscription(subscription_id.to_owned()))?;
    info!(%client_id, subscription_id, "broker: unsubscribed");
    Ok(())
}

// =============================================================================
// PUBLISH
// =============================================================================

/// Deliver `body` to every subscription on `destination`.
///
/// Returns the number of MESSAGE frames queued. Delivery is best-effort: a
/// subscriber whose channel is full or closed is skipped.
pub async fn publish(state: &AppState, destination: &str, content_type: &str, body: &str) -> usize {
    let clients = state.clients.read().await;
    let mut delivered = 0;

    for (client_id, client) in clients.iter() {
        for (subscription_id, subscribed_to) in &client.subscriptions {
            if subscribed_to != destination {
                continue;
            }
            let frame = message_frame(destination, subscription_id, state.next_message_id(), content_type, body);
            if client.tx.try_send(frame).is_ok() {
                delivered += 1;
            } else {
                debug!(%client_id, destination, "broker: subscriber channel unavailable");
            }
        }
    }

    debug!(destination, delivered, "broker: published");
    delivered
}

fn message_frame(destination: &str, subscription_id: &str, message_id: u64, content_type: &str, body: &str) -> Frame {
    Frame::new(Command::Message)
        .with_header(header::DESTINATION, destination)
        .with_header(header::SUBSCRIPTION, subscription_id)
        .with_header(header::MESSAGE_ID, message_id.to_string())
        .with_header(header::CONTENT_TYPE, content_type)
        .with_body(body)
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
