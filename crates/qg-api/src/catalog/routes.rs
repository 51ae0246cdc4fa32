//! Static choices offered in setup

use axum::{Json, Router, extract::Path, routing::get};
use qg_core::{
    Difficulty, Language,
    model::{AVAILABLE_MODELS, DEFAULT_MODEL},
    topics,
};
use serde::Serialize;

use crate::{ApiState, error::ApiError};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/models", get(models))
        .route("/topics/{language}", get(topics_for))
        .route("/difficulties/{language}", get(difficulties))
}

#[derive(Debug, Serialize)]
pub struct Models {
    pub models: &'static [&'static str],
    pub default: &'static str,
}

async fn models() -> Json<Models> {
    Json(Models {
        models: AVAILABLE_MODELS,
        default: DEFAULT_MODEL,
    })
}

#[derive(Debug, Serialize)]
pub struct Topics {
    pub language: Language,
    pub topics: &'static [&'static str],
}

fn parse_language(language: &str) -> Result<Language, ApiError> {
    language
        .parse()
        .map_err(|e: qg_core::model::ParseEnumError| ApiError::Validation(e.to_string()))
}

async fn topics_for(Path(language): Path<String>) -> Result<Json<Topics>, ApiError> {
    let language = parse_language(&language)?;
    Ok(Json(Topics {
        language,
        topics: topics::for_language(language),
    }))
}

#[derive(Debug, Serialize)]
pub struct DifficultyOption {
    pub value: Difficulty,
    pub label: &'static str,
}

/// Difficulty levels with their labels in `language`
async fn difficulties(
    Path(language): Path<String>,
) -> Result<Json<Vec<DifficultyOption>>, ApiError> {
    let language = parse_language(&language)?;
    Ok(Json(
        Difficulty::ALL
            .into_iter()
            .map(|value| DifficultyOption {
                value,
                label: value.label(language),
            })
            .collect(),
    ))
}
