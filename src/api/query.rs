use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::ax_state::AppState;
use crate::models::context::QueryRequest;

/// 接收用户提问，驱动 RAG 管线并返回答案。
/// 管线内部的预期失败（无匹配、表缺失等）以 200 + 说明文本返回，
/// 只有非法输入才走 4xx
pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> impl IntoResponse {
    let question = payload.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Question cannot be empty" })),
        )
            .into_response();
    }

    info!("收到用户提问: {}", question);
    let result = state.pipeline.answer(question).await;

    Json(json!({ "answer": result.answer, "sql": result.sql })).into_response()
}
