use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::{get, post},
    Json,
    Router,
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::modules::submission_dispatcher::{
    submission::{SubmissionOutcome, SubmissionRequest},
    SubmissionDispatcher,
};

pub struct AppState {
    pub dispatcher: SubmissionDispatcher,
    // Peers allowed to name the client in X-Forwarded-For
    pub trusted_proxies: Vec<IpAddr>,
}

// Routes the landing page talks to. Serve with connect info so the
// peer address is available for rate limiting.
pub fn router(dispatcher: SubmissionDispatcher, trusted_proxies: Vec<IpAddr>) -> Router {
    Router::new()
        .route("/api/waitlist", post(submit_waitlist))
        .route("/health", get(health))
        .with_state(Arc::new(AppState { dispatcher, trusted_proxies }))
}

async fn submit_waitlist(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(mut request): Json<SubmissionRequest>,
) -> Json<SubmissionOutcome> {
    request.caller_identifier = caller_identifier(&headers, peer, &state.trusted_proxies);
    Json(state.dispatcher.submit(&request).await)
}

async fn health() -> &'static str {
    "ok"
}

// The peer IP, unless the peer is a trusted proxy. Then the rightmost
// X-Forwarded-For hop that is not itself a trusted proxy, since hops to the
// left of it were written by the client and can be anything.
pub fn caller_identifier(headers: &HeaderMap, peer: SocketAddr, trusted_proxies: &[IpAddr]) -> String {
    let is_trusted = |ip: IpAddr| trusted_proxies.contains(&ip);

    if !is_trusted(peer.ip()) {
        return peer.ip().to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .rsplit(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .find(|hop| !hop.parse::<IpAddr>().map_or(false, is_trusted))
                .map(str::to_string)
        })
        .unwrap_or_else(|| peer.ip().to_string())
}
