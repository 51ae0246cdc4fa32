use axum::{Json, Router, routing::post};
use qg_core::{QuizConfig, challenge};
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/challenges/encode", post(encode))
        .route("/challenges/decode", post(decode))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeCode {
    pub code: String,
}

/// Turn a quiz configuration into a shareable code
///
/// Only configs that decode back unchanged get a code.
async fn encode(Json(config): Json<QuizConfig>) -> Result<Json<ChallengeCode>, ApiError> {
    config.check()?;
    Ok(Json(ChallengeCode {
        code: challenge::encode(&config),
    }))
}

/// Read back the configuration inside a code
async fn decode(Json(request): Json<ChallengeCode>) -> Result<Json<QuizConfig>, ApiError> {
    let result = challenge::decode(&request.code);
    crate::metrics::record_challenge_decode(result.is_ok());
    Ok(Json(result?))
}
