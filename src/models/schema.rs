use serde::{Deserialize, Serialize};

/// 表结构记录：headers 的顺序即模板中列索引的寻址顺序
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaRecord {
    pub table_id: String,
    pub headers: Vec<String>,
}

/// 向量索引条目附带的元数据载荷
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TemplateMetadata {
    pub question: String,
    /// JSON 编码的查询模板（StructuredQuery）
    pub sql: String,
    pub table_id: String,
}

/// 向量索引查询返回的单条匹配。
/// metadata 保持原始 JSON，由检索器再做一次带校验的解码
#[derive(Debug, Deserialize, Clone)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    pub metadata: Option<serde_json::Value>,
}

/// 待写入向量索引的记录
#[derive(Debug, Serialize, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: TemplateMetadata,
}

/// 训练集 JSONL 的一行
#[derive(Debug, Deserialize)]
pub struct TrainRecord {
    pub question: String,
    pub sql: serde_json::Value,
    #[serde(default)]
    pub table_id: Option<String>,
}
