use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{error, info, instrument, warn};

use crate::core::normalizer::normalize;
use crate::core::refiner::SqlRefiner;
use crate::core::retriever::Retriever;
use crate::core::templater::build_sql;
use crate::core::validator::is_select_statement;
use crate::infra::db::execute_query;
use crate::infra::schema::SchemaResolver;

/// 管线对外的唯一输出：最终 SQL 与结果（行数据或失败说明）。
/// sql 为空串表示上游阶段失败，没有产出 SQL
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub sql: String,
    pub answer: Value,
}

/// 各阶段的失败分类，全部在 answer() 边界收敛为 PipelineResult
#[derive(Debug)]
pub enum PipelineError {
    /// 索引无相似模板，预期内的正常结果
    NoMatch,
    /// table_id 在目录/库中都找不到对应表结构
    SchemaNotFound(String),
    /// 索引里存的模板载荷无法解码
    MetadataMalformed(String),
    /// 生成模型不可达、超时或返回不可用内容
    RefinementFailed(String),
    /// 存储层拒绝或执行出错，保留当时的 SQL
    ExecutionFailed { sql: String, message: String },
    Internal(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NoMatch => write!(f, "no relevant template found"),
            PipelineError::SchemaNotFound(t) => write!(f, "table metadata not found: {}", t),
            PipelineError::MetadataMalformed(msg) => {
                write!(f, "template metadata malformed: {}", msg)
            }
            PipelineError::RefinementFailed(msg) => write!(f, "sql refinement failed: {}", msg),
            PipelineError::ExecutionFailed { message, .. } => {
                write!(f, "sql execution failed: {}", message)
            }
            PipelineError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    /// 面向用户的失败说明
    fn user_message(&self) -> String {
        match self {
            PipelineError::NoMatch => "No relevant data found in the database.".to_string(),
            PipelineError::SchemaNotFound(_) => "Table metadata not found.".to_string(),
            PipelineError::MetadataMalformed(_) => {
                "An error occurred while decoding the stored query template.".to_string()
            }
            PipelineError::RefinementFailed(_) => {
                "An error occurred while calling the language model.".to_string()
            }
            PipelineError::ExecutionFailed { message, .. } => {
                format!("An error occurred while querying the database: {}", message)
            }
            PipelineError::Internal(_) => {
                "An unexpected error occurred while processing your request.".to_string()
            }
        }
    }

    fn final_sql(&self) -> String {
        match self {
            PipelineError::ExecutionFailed { sql, .. } => sql.clone(),
            _ => String::new(),
        }
    }
}

/// 检索增强的 SQL 合成管线：
/// 嵌入 → 检索 → 表结构解析 → 模板渲染 → 模型精炼 → 清理 → 执行
pub struct QueryPipeline {
    retriever: Retriever,
    schema: SchemaResolver,
    refiner: SqlRefiner,
    db: SqlitePool,
}

impl QueryPipeline {
    pub fn new(
        retriever: Retriever,
        schema: SchemaResolver,
        refiner: SqlRefiner,
        db: SqlitePool,
    ) -> Self {
        Self {
            retriever,
            schema,
            refiner,
            db,
        }
    }

    /// 任何阶段失败都转换为结果值，不会越过管线边界向上抛
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str) -> PipelineResult {
        match self.run(question).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    PipelineError::NoMatch => warn!("检索无匹配"),
                    PipelineError::Internal(msg) => error!("管线内部错误: {}", msg),
                    other => warn!("管线提前结束: {}", other),
                }
                PipelineResult {
                    sql: e.final_sql(),
                    answer: Value::String(e.user_message()),
                }
            }
        }
    }

    async fn run(&self, question: &str) -> Result<PipelineResult, PipelineError> {
        let template = self
            .retriever
            .retrieve_top_match(question)
            .await?
            .ok_or(PipelineError::NoMatch)?;

        let schema = self
            .schema
            .resolve(&template.table_id)
            .await
            .map_err(|e| PipelineError::Internal(format!("表结构解析失败: {}", e)))?
            .ok_or_else(|| PipelineError::SchemaNotFound(template.table_id.clone()))?;

        let initial_sql = build_sql(&template.query, &schema);
        info!("初始 SQL: {} (模板得分 {:.4})", initial_sql, template.score);

        let refined = self
            .refiner
            .refine(question, &initial_sql)
            .await
            .map_err(|e| PipelineError::RefinementFailed(e.to_string()))?;

        let cleaned = normalize(&refined);
        info!("清理后的 SQL: {}", cleaned);

        if !is_select_statement(&cleaned) {
            return Err(PipelineError::ExecutionFailed {
                sql: cleaned,
                message: "only SELECT statements are allowed".to_string(),
            });
        }

        let rows = match execute_query(&self.db, &cleaned).await {
            Ok(rows) => rows,
            Err(e) => {
                return Err(PipelineError::ExecutionFailed {
                    sql: cleaned,
                    message: e.to_string(),
                })
            }
        };

        Ok(PipelineResult {
            sql: cleaned,
            answer: Value::Array(rows),
        })
    }
}
