use std::sync::Arc;
use tracing::{info, warn};

use crate::core::pipeline::PipelineError;
use crate::core::templater::StructuredQuery;
use crate::infra::embedding::Embedder;
use crate::infra::pinecone::VectorIndex;
use crate::models::schema::TemplateMetadata;

const TOP_K: usize = 1;

/// 检索命中的模板（top-1），附带索引给出的相似度得分
#[derive(Debug, Clone)]
pub struct RetrievedTemplate {
    pub table_id: String,
    pub query: StructuredQuery,
    pub score: f32,
}

/// 相似模板检索器：嵌入问题并在向量索引中取最近邻
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    index_name: String,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        index_name: String,
        min_score: Option<f32>,
    ) -> Self {
        Self {
            embedder,
            index,
            index_name,
            min_score,
        }
    }

    /// Ok(None) 表示索引无匹配，是正常结果而非错误；
    /// 元数据损坏（无法解码的模板）单独归类为 MetadataMalformed
    pub async fn retrieve_top_match(
        &self,
        question: &str,
    ) -> Result<Option<RetrievedTemplate>, PipelineError> {
        let vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| PipelineError::Internal(format!("问题向量化失败: {}", e)))?;

        let matches = self
            .index
            .query_top_k(vector, TOP_K)
            .await
            .map_err(|e| PipelineError::Internal(format!("向量索引查询失败: {}", e)))?;

        let Some(best) = matches.into_iter().next() else {
            warn!("索引 {} 未返回任何匹配", self.index_name);
            return Ok(None);
        };

        if let Some(threshold) = self.min_score {
            if best.score < threshold {
                warn!(
                    "最优匹配得分 {:.4} 低于阈值 {:.4}，按无匹配处理",
                    best.score, threshold
                );
                return Ok(None);
            }
        }

        let metadata = best
            .metadata
            .ok_or_else(|| PipelineError::MetadataMalformed("匹配结果缺少 metadata".to_string()))?;
        let metadata: TemplateMetadata = serde_json::from_value(metadata)
            .map_err(|e| PipelineError::MetadataMalformed(format!("metadata 字段不完整: {}", e)))?;
        let query = StructuredQuery::parse(&metadata.sql)
            .map_err(|e| PipelineError::MetadataMalformed(format!("sql 模板解码失败: {}", e)))?;

        info!(
            "检索命中: id={}, table_id={}, score={:.4}, 模板问题 \"{}\"",
            best.id, metadata.table_id, best.score, metadata.question
        );

        Ok(Some(RetrievedTemplate {
            table_id: metadata.table_id,
            query,
            score: best.score,
        }))
    }
}
