use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;
use tracing::info;

/// 文本向量化接口，隔离具体模型实现
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// 进程内加载的 all-MiniLM-L6-v2 模型，进程启动时初始化一次
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub fn new() -> anyhow::Result<Self> {
        info!("正在加载嵌入模型 all-MiniLM-L6-v2 ...");
        let mut options = InitOptions::default();
        options.model_name = EmbeddingModel::AllMiniLML6V2;
        let model = TextEmbedding::try_new(options)
            .map_err(|e| anyhow::anyhow!("嵌入模型初始化失败: {}", e))?;
        info!("嵌入模型加载完成");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow::anyhow!("嵌入结果为空"))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut guard = self.model.lock().unwrap();
        guard
            .embed(texts, None)
            .map_err(|e| anyhow::anyhow!("文本向量化失败: {}", e))
    }
}
