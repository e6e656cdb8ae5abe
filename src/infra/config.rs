use std::env;

/// 表结构解析策略的部署开关
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaSource {
    /// 启动时整体加载表目录文件
    Catalog,
    /// 每次请求通过 PRAGMA 即时探测
    Live,
}

/// 进程级配置，启动时从环境变量读取一次并注入各组件
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub ollama_api_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub pinecone_api_key: String,
    pub pinecone_index_host: String,
    pub pinecone_index_name: String,
    /// 低于该得分的检索结果按无匹配处理；不设置则不做阈值过滤
    pub similarity_min_score: Option<f32>,
    pub schema_source: SchemaSource,
    pub tables_file: String,
    pub train_data_file: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let schema_source = match env::var("SCHEMA_SOURCE").as_deref() {
            Ok("catalog") => SchemaSource::Catalog,
            _ => SchemaSource::Live,
        };

        let similarity_min_score = match env::var("SIMILARITY_MIN_SCORE") {
            Ok(v) => Some(
                v.parse::<f32>()
                    .map_err(|e| anyhow::anyhow!("SIMILARITY_MIN_SCORE 配置无效: {}", e))?,
            ),
            Err(_) => None,
        };

        let ollama_timeout_secs = match env::var("OLLAMA_TIMEOUT_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("OLLAMA_TIMEOUT_SECS 配置无效: {}", e))?,
            Err(_) => 60,
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            ollama_api_url: env::var("OLLAMA_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434/api/generate".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            ollama_timeout_secs,
            pinecone_api_key: env::var("PINECONE_API_KEY")
                .map_err(|_| anyhow::anyhow!("PINECONE_API_KEY must be set"))?,
            pinecone_index_host: env::var("PINECONE_INDEX_HOST")
                .map_err(|_| anyhow::anyhow!("PINECONE_INDEX_HOST must be set"))?,
            pinecone_index_name: env::var("PINECONE_INDEX_NAME")
                .unwrap_or_else(|_| "text-to-sql-index".to_string()),
            similarity_min_score,
            schema_source,
            tables_file: env::var("TABLES_FILE").unwrap_or_else(|_| "data/tables.json".to_string()),
            train_data_file: env::var("TRAIN_DATA_FILE")
                .unwrap_or_else(|_| "data/train.jsonl".to_string()),
        })
    }
}
