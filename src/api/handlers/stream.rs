//! Subscriber stream endpoint.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use axum::Router;
use axum::routing::get;
use futures_util::{StreamExt, stream};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::app_state::AppState;

/// `GET /stream`: Open a server-sent event subscription.
///
/// Sends the stored snapshot immediately if one exists, then each
/// telemetry snapshot as a `data:` event. A `:heartbeat` comment is sent
/// every heartbeat interval regardless of telemetry traffic. The
/// subscriber is deregistered when the client disconnects.
#[utoipa::path(
    get,
    path = "/stream",
    tag = "Telemetry",
    summary = "Subscribe to telemetry",
    description = "Long-lived `text/event-stream` response. Each `data:` event carries one telemetry snapshot as JSON.",
    responses(
        (status = 200, description = "Event stream opened", content_type = "text/event-stream", body = String),
    )
)]
pub async fn stream_handler(State(state): State<AppState>) -> impl IntoResponse {
    let subscriber = state.streams.subscribe().await;
    tracing::info!(
        connection_id = %subscriber.id(),
        clients = state.streams.local_count(),
        "subscriber connected"
    );

    let period = state.config.heartbeat_interval;
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let heartbeats = IntervalStream::new(ticks).map(|_| Event::default().comment("heartbeat"));

    // The heartbeat timer lives inside the response stream and is dropped
    // with it on disconnect or shutdown.
    let events = stream::select(subscriber.map(|frame| Event::default().data(frame)), heartbeats)
        .map(Ok::<_, Infallible>)
        .take_until(state.shutdown.clone().cancelled_owned());

    ([("x-accel-buffering", "no")], Sse::new(events))
}

/// Stream routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/stream", get(stream_handler))
}
