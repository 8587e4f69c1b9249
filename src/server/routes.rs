use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::{ApiError, RelayError};
use crate::model::mode::{Direction, Mode};
use crate::relay::TickRelay;

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: Mode,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub symbol: String,
    pub mode: Mode,
    pub direction: Direction,
    pub current_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price: Option<f64>,
    pub mode: Mode,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct DirectionResponse {
    pub direction: Direction,
}

/// GET /health. Answers as long as the process is up; upstream
/// reachability never gates it.
pub async fn health(State(relay): State<Arc<TickRelay>>) -> Json<HealthResponse> {
    let snap = relay.snapshot();
    Json(HealthResponse {
        status: "ok",
        symbol: relay.symbol().to_string(),
        mode: snap.mode,
        direction: snap.direction,
        current_price: snap.current_price,
    })
}

/// GET /mode.
pub async fn get_mode(State(relay): State<Arc<TickRelay>>) -> Json<ModeResponse> {
    let snap = relay.snapshot();
    Json(ModeResponse {
        mode: snap.mode,
        direction: snap.direction,
    })
}

/// POST /mode with `{"flag": 0|1}` (0 = manual, 1 = live). Anything else
/// is rejected before any state is touched.
pub async fn set_mode(
    State(relay): State<Arc<TickRelay>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ModeResponse>, ApiError> {
    let flag = body.get("flag").and_then(serde_json::Value::as_i64);
    let target = match flag {
        Some(flag) => Mode::from_flag(flag)?,
        None => {
            return Err(RelayError::InvalidArgument(
                "missing or non-integer 'flag'".to_string(),
            )
            .into())
        }
    };
    let snap = relay.set_mode(target);
    Ok(Json(ModeResponse {
        mode: snap.mode,
        direction: snap.direction,
    }))
}

/// GET /price. `price` is null until the first accepted tick.
pub async fn get_price(State(relay): State<Arc<TickRelay>>) -> Json<PriceResponse> {
    let snap = relay.snapshot();
    Json(PriceResponse {
        price: snap.current_price,
        mode: snap.mode,
        direction: snap.direction,
    })
}

/// POST /direction with `{"direction": "up"|"down"|"none"}`.
pub async fn set_direction(
    State(relay): State<Arc<TickRelay>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DirectionResponse>, ApiError> {
    let direction = match body.get("direction").and_then(serde_json::Value::as_str) {
        Some(raw) => raw.parse::<Direction>()?,
        None => {
            return Err(RelayError::InvalidArgument(
                "missing or non-string 'direction'".to_string(),
            )
            .into())
        }
    };
    relay.set_direction(direction);
    Ok(Json(DirectionResponse { direction }))
}
