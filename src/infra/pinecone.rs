use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::schema::{VectorMatch, VectorRecord};

/// 向量索引的两个消费操作：近邻检索与写入
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query_top_k(&self, vector: Vec<f32>, top_k: usize) -> anyhow::Result<Vec<VectorMatch>>;
    async fn upsert(&self, records: Vec<VectorRecord>) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct QueryBody {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    // matches 缺失或为空都表示无结果，不是错误
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    vectors: &'a [VectorRecord],
}

/// Pinecone 数据面 REST 客户端
pub struct PineconeClient {
    http: Client,
    api_key: String,
    index_host: String,
}

impl PineconeClient {
    pub fn new(api_key: String, index_host: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            index_host: index_host.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn query_top_k(&self, vector: Vec<f32>, top_k: usize) -> anyhow::Result<Vec<VectorMatch>> {
        let url = format!("{}/query", self.index_host);
        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&QueryBody {
                vector,
                top_k,
                include_metadata: true,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone 查询失败 (status {}): {}", status, text);
        }

        let body: QueryResponse = resp.json().await?;
        Ok(body.matches)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> anyhow::Result<()> {
        let url = format!("{}/vectors/upsert", self.index_host);
        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&UpsertBody { vectors: &records })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone upsert 失败 (status {}): {}", status, text);
        }
        info!("已写入 {} 条向量", records.len());
        Ok(())
    }
}
