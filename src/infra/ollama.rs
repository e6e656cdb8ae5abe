use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// 生成式模型调用接口：输入 prompt，返回原始响应文本（可能是分段 JSON）
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String>;
}

/// Ollama /api/generate 传输层。超时固定在客户端上，失败不重试
pub struct OllamaClient {
    http: Client,
    api_url: String,
}

impl OllamaClient {
    pub fn new(api_url: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http, api_url })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        info!("向 Ollama 发送请求, model={}", model);
        let resp = self
            .http
            .post(&self.api_url)
            .json(&json!({ "model": model, "prompt": prompt }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("调用 Ollama 失败: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama 服务返回错误 (status {}): {}", status, text);
        }
        Ok(resp.text().await?)
    }
}
