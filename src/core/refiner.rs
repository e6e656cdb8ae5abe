use std::sync::Arc;
use tracing::{info, warn};

use crate::infra::ollama::LlmClient;

/// 基于生成模型的 SQL 精炼器：把模板渲染出的初始 SQL 交给模型修正
pub struct SqlRefiner {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl SqlRefiner {
    pub fn new(llm: Arc<dyn LlmClient>, model: String) -> Self {
        Self { llm, model }
    }

    /// 传输失败（超时、连接错误、非 2xx）原样向上返回 Err，
    /// 由调用方归类，绝不把错误伪装成 SQL 字符串
    pub async fn refine(&self, question: &str, templated_sql: &str) -> anyhow::Result<String> {
        let prompt = build_refine_prompt(question, templated_sql);
        let raw = self.llm.generate(&self.model, &prompt).await?;
        let sql = extract_sql_from_response(&raw);
        info!("模型精炼结果: {}", sql);
        Ok(sql)
    }
}

fn build_refine_prompt(question: &str, initial_sql: &str) -> String {
    format!(
        "Question: {}\n\
         Initial SQL: {}\n\
         Instruction: Modify the SQL query to ensure the following:\n\
         - The SQL syntax is valid and correct.\n\
         - Do not change the table name or column names unless necessary.\n\
         - Ensure all text comparisons (e.g., WHERE, AND, OR conditions) include 'COLLATE NOCASE' immediately after the value or column being compared to handle case-insensitivity.\n\
         - For example: col_name = 'value' COLLATE NOCASE or 'value' COLLATE NOCASE = col_name.\n\
         - Do not apply 'COLLATE NOCASE' to numerical or non-string comparisons.\n\
         - Ensure that the SQL is optimized and matches the structure of the database.\n\
         Return only the final SQL query.",
        question, initial_sql
    )
}

/// 模型的响应按行返回 JSON 片段，逐行解析并按到达顺序拼接 response 字段；
/// 解析失败的行记录日志后跳过，部分成功优于整体失败
pub fn extract_sql_from_response(text: &str) -> String {
    let mut parts = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(obj) => {
                if let Some(fragment) = obj.get("response").and_then(|v| v.as_str()) {
                    parts.push(fragment.to_string());
                }
            }
            Err(e) => warn!("无法解析的响应片段已跳过: {} ({})", line, e),
        }
    }
    parts.concat().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_concatenated_in_arrival_order() {
        let raw = "{\"response\":\"SELECT \"}\n{\"response\":\"* FROM t\"}\n{\"response\":\";\"}";
        assert_eq!(extract_sql_from_response(raw), "SELECT * FROM t;");
    }

    #[test]
    fn test_unparsable_lines_are_skipped() {
        let raw = "{\"response\":\"SELECT 1\"}\ngarbage line\n{\"response\":\";\"}";
        assert_eq!(extract_sql_from_response(raw), "SELECT 1;");
    }

    #[test]
    fn test_lines_without_response_field_are_ignored() {
        let raw = "{\"response\":\"SELECT 1;\"}\n{\"done\":true}";
        assert_eq!(extract_sql_from_response(raw), "SELECT 1;");
    }

    #[test]
    fn test_empty_response_yields_empty_sql() {
        assert_eq!(extract_sql_from_response(""), "");
        assert_eq!(extract_sql_from_response("garbage"), "");
    }

    #[test]
    fn test_prompt_embeds_question_and_initial_sql() {
        let prompt = build_refine_prompt("q?", "SELECT `a` FROM `t`;");
        assert!(prompt.contains("Question: q?"));
        assert!(prompt.contains("Initial SQL: SELECT `a` FROM `t`;"));
        assert!(prompt.contains("COLLATE NOCASE"));
    }
}
