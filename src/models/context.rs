use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String, // 用户提问内容
}

#[derive(Debug, Deserialize, Default)]
pub struct BootstrapRequest {
    /// 缺省时使用配置中的训练集路径
    pub data_file: Option<String>,
}
