use dashmap::DashMap;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::fs;
use tracing::info;

use super::db;
use crate::models::schema::SchemaRecord;

/// 表目录文件中的一行（JSONL，来自建表时的元数据导出）
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    header: Vec<String>,
}

/// 表结构解析：静态目录查找或对库在线探测，按部署二选一
pub enum SchemaResolver {
    Catalog(DashMap<String, Vec<String>>),
    Live(SqlitePool),
}

impl SchemaResolver {
    pub fn from_catalog_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("无法读取表目录文件 {}: {}", path, e))?;
        let catalog = DashMap::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let entry: CatalogEntry = serde_json::from_str(line)
                .map_err(|e| anyhow::anyhow!("表目录条目解析失败: {}", e))?;
            catalog.insert(entry.id, entry.header);
        }
        info!("表目录加载完成，共 {} 张表", catalog.len());
        Ok(SchemaResolver::Catalog(catalog))
    }

    pub fn live(pool: SqlitePool) -> Self {
        SchemaResolver::Live(pool)
    }

    /// 按 table_id 解析表头；Ok(None) 表示表不存在或没有可用列，
    /// 对当前请求是终止性的（没有表头无法渲染模板）
    pub async fn resolve(&self, table_id: &str) -> anyhow::Result<Option<SchemaRecord>> {
        let headers = match self {
            SchemaResolver::Catalog(catalog) => match catalog.get(table_id) {
                Some(entry) => entry.value().clone(),
                None => return Ok(None),
            },
            SchemaResolver::Live(pool) => db::fetch_table_headers(pool, table_id).await?,
        };

        if headers.is_empty() {
            return Ok(None);
        }
        Ok(Some(SchemaRecord {
            table_id: table_id.to_string(),
            headers,
        }))
    }
}
