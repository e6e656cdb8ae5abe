use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ax_state::AppState;
use crate::models::context::BootstrapRequest;
use crate::models::schema::{TemplateMetadata, TrainRecord, VectorRecord};

const UPSERT_BATCH_SIZE: usize = 100;

/// 将训练集中的 (question, sql, table_id) 三元组全量写入向量索引。
/// 处理流程：读 JSONL -> 批量嵌入 -> 分批 upsert
pub async fn bootstrap_index(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BootstrapRequest>,
) -> impl IntoResponse {
    let data_file = payload
        .data_file
        .unwrap_or_else(|| state.config.train_data_file.clone());

    info!(
        "开始构建索引 {}，数据文件: {}",
        state.config.pinecone_index_name, data_file
    );

    let content = match tokio::fs::read_to_string(&data_file).await {
        Ok(c) => c,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("无法读取数据文件 {}: {}", data_file, e) })),
            )
                .into_response()
        }
    };

    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TrainRecord>(line) {
            Ok(r) => records.push(r),
            Err(e) => warn!("训练集第 {} 行解析失败，已跳过: {}", i + 1, e),
        }
    }
    info!("加载 {} 条训练记录", records.len());

    let questions: Vec<String> = records.iter().map(|r| r.question.clone()).collect();
    let embeddings = match state.embedder.embed_batch(questions).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("嵌入计算失败: {}", e) })),
            )
                .into_response()
        }
    };

    let vectors: Vec<VectorRecord> = records
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (record, values))| VectorRecord {
            id: format!("query_{}", i),
            values,
            metadata: TemplateMetadata {
                question: record.question.clone(),
                sql: record.sql.to_string(),
                table_id: record
                    .table_id
                    .clone()
                    .unwrap_or_else(|| "unknown_table".to_string()),
            },
        })
        .collect();

    let total = vectors.len();
    for chunk in vectors.chunks(UPSERT_BATCH_SIZE) {
        if let Err(e) = state.index.upsert(chunk.to_vec()).await {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("向量写入失败: {}", e) })),
            )
                .into_response();
        }
    }

    info!("索引构建完成，共写入 {} 条向量", total);
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "upserted": total })),
    )
        .into_response()
}
