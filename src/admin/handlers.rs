use axum::{extract::State, Json};
use serde::Serialize;

use super::AdminState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct NamespaceSessions {
    pub namespace: String,
    pub ttl_secs: u64,
    pub active: usize,
    pub armed: usize,
    pub expired: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_sessions(State(state): State<AdminState>) -> Json<Vec<NamespaceSessions>> {
    let sessions = state
        .managers
        .iter()
        .map(|manager| {
            let summary = manager.summary();
            NamespaceSessions {
                namespace: manager.prefix().to_string(),
                ttl_secs: manager.ttl().as_secs(),
                active: summary.active,
                armed: summary.armed,
                expired: summary.expired,
            }
        })
        .collect();

    Json(sessions)
}
