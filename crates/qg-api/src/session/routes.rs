use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use qg_core::{GenerationRequest, InputMode, Phase, ProgressSlot, Session, SessionView};
use uuid::Uuid;
use validator::Validate;

use super::model::{
    AddFilesRequest, AnswerRequest, CreateSessionRequest, CreatedSession, ResumeRequest,
    SetupChanges, SetupPatch,
};
use crate::{ApiState, error::ApiError, middleware::rate_limit};

pub fn routes() -> Router<ApiState> {
    // Each call costs a model invocation
    let generate_routes = Router::new()
        .route("/sessions/{id}/generate", post(generate))
        .layer(crate::make_rate_limit_layer!(
            rate_limit::GENERATE_REPLENISH_SECONDS,
            rate_limit::GENERATE_BURST_SIZE
        ));

    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/resume", post(resolve_resume))
        .route("/sessions/{id}/setup", patch(update_setup))
        .route("/sessions/{id}/topic/random", post(random_topic))
        .route("/sessions/{id}/files", post(add_files))
        .route("/sessions/{id}/files/{index}", delete(remove_file))
        .route("/sessions/{id}/answer", post(select_answer))
        .route("/sessions/{id}/next", post(next_question))
        .route("/sessions/{id}/exit", post(exit))
        .route("/sessions/{id}/review", post(review))
        .route("/sessions/{id}/review/back", post(back_to_results))
        .route("/sessions/{id}/reset", post(reset))
        .merge(generate_routes)
}

/// Run `action` on a session under its lock and return the resulting view
async fn with_session<T>(
    state: &ApiState,
    id: Uuid,
    action: impl FnOnce(&mut Session) -> Result<T, ApiError>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.sessions.get(id)?;
    let mut entry = handle.lock().await;
    entry.touch();
    action(&mut entry.session)?;
    Ok(Json(entry.session.view()))
}

/// Open a session, reopening saved progress when an id is given
async fn create_session(
    State(state): State<ApiState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreatedSession>), ApiError> {
    let id = body.and_then(|Json(request)| request.id).unwrap_or_else(Uuid::new_v4);

    let slot = ProgressSlot::for_session(state.store.clone(), id);
    let handle = state.sessions.insert(id, Session::open(slot))?;
    let entry = handle.lock().await;
    tracing::info!(session_id = %id, phase = %entry.session.phase(), "Session opened");

    Ok((
        StatusCode::CREATED,
        Json(CreatedSession {
            id,
            view: entry.session.view(),
        }),
    ))
}

async fn get_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |_| Ok(())).await
}

/// Drop a live session; saved progress stays available for reopening
///
/// A generation still running for it is invalidated, so its result cannot
/// reach the slot a reopened session now owns.
async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let handle = state.sessions.remove(id).ok_or(ApiError::SessionNotFound)?;
    handle.lock().await.session.close();
    tracing::info!(session_id = %id, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_resume(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResumeRequest>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.resolve_resume(request.resume)?)).await
}

async fn update_setup(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SetupPatch>,
) -> Result<Json<SessionView>, ApiError> {
    let changes = patch.into_changes()?;
    with_session(&state, id, |s| apply_setup(s, changes)).await
}

/// Setup fields need the setup phase; the language can change at any time
/// and is applied last so a rejected patch changes nothing.
fn apply_setup(session: &mut Session, changes: SetupChanges) -> Result<(), ApiError> {
    let SetupChanges {
        language,
        topic,
        num_questions,
        difficulty,
        model,
        input_mode,
        challenge_code,
    } = changes;

    if let Some(mode) = input_mode {
        session.set_input_mode(mode)?;
    }
    if let Some(topic) = topic {
        session.set_topic(topic)?;
    }
    if let Some(count) = num_questions {
        session.set_num_questions(count)?;
    }
    if let Some(difficulty) = difficulty {
        session.set_difficulty(difficulty)?;
    }
    if let Some(model) = model {
        session.set_model(model)?;
    }
    if let Some(code) = challenge_code {
        session.set_challenge_code_input(code)?;
    }
    if let Some(language) = language {
        session.set_language(language);
    }
    Ok(())
}

async fn random_topic(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.random_topic()?.len())).await
}

async fn add_files(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddFilesRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let uploads = request.into_uploads()?;
    with_session(&state, id, |s| Ok(s.add_files(uploads)?)).await
}

async fn remove_file(
    State(state): State<ApiState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.remove_file(index)?)).await
}

/// Generate a quiz for the session's current setup
///
/// The session lock is released while the generator runs. The call itself
/// runs on its own task so that a client hanging up cannot leave the session
/// stuck in the generating phase.
async fn generate(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.sessions.get(id)?;

    let (ticket, mode) = {
        let mut entry = handle.lock().await;
        entry.touch();
        if entry.session.phase() == Phase::Generating {
            return Err(ApiError::GenerationInProgress);
        }

        let mode = entry.session.setup().input_mode;
        let ticket = entry.session.begin_generation()?;
        if mode == InputMode::Challenge {
            crate::metrics::record_challenge_decode(ticket.is_some());
        }
        match ticket {
            Some(ticket) => (ticket, mode),
            None => return Ok(Json(entry.session.view())),
        }
    };

    let generator = state.generator.clone();
    let task = tokio::spawn(async move {
        let request = GenerationRequest::from_config(&ticket.config);
        let start = Instant::now();
        let result = generator.generate(&request).await;
        let elapsed = start.elapsed().as_secs_f64();

        let mut entry = handle.lock().await;
        let completion = entry.session.complete_generation(ticket.id, result);
        entry.touch();
        crate::metrics::record_generation(
            mode,
            crate::metrics::completion_outcome(completion),
            elapsed,
        );
        entry.session.view()
    });

    task.await
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("generation task failed: {e}")))
}

async fn select_answer(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<SessionView>, ApiError> {
    request.validate()?;
    with_session(&state, id, |s| Ok(s.select_answer(&request.option)?)).await
}

async fn next_question(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.next_question()?)).await
}

/// Abandon the run; the client asks the user for confirmation first
async fn exit(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.exit()?)).await
}

async fn review(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.review()?)).await
}

async fn back_to_results(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.back_to_results()?)).await
}

async fn reset(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    with_session(&state, id, |s| Ok(s.reset()?)).await
}
