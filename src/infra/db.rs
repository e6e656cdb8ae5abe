use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo};
use tracing::info;

pub async fn init_db(database_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// 外部 table_id 到物理表名：横线替换为下划线并加固定前缀
pub fn physical_table_name(table_id: &str) -> String {
    format!("table_{}", table_id.replace('-', "_"))
}

/// PRAGMA 探测指定表的列名，按定义顺序返回；表不存在时结果为空
pub async fn fetch_table_headers(pool: &SqlitePool, table_id: &str) -> anyhow::Result<Vec<String>> {
    let table_name = physical_table_name(table_id);
    info!("探测表结构: {}", table_name);
    let sql = format!("PRAGMA table_info('{}')", table_name.replace('\'', "''"));
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .filter_map(|r| r.try_get::<String, _>("name").ok())
        .collect())
}

/// 执行查询并把结果行转为 JSON 对象
pub async fn execute_query(pool: &SqlitePool, sql: &str) -> anyhow::Result<Vec<Value>> {
    info!("执行 SQL: {}", sql);
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    Ok(rows.iter().map(sqlite_row_to_json).collect())
}

pub fn sqlite_row_to_json(row: &SqliteRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        let type_info = col.type_info();
        let type_name = type_info.name(); // 声明类型名，如 "INTEGER", "TEXT", "DATETIME"

        let val = match type_name {
            "INTEGER" | "INT4" | "INT8" => {
                json!(row.try_get::<Option<i64>, _>(name).unwrap_or(None))
            }
            "REAL" | "NUMERIC" => json!(row.try_get::<Option<f64>, _>(name).unwrap_or(None)),
            "BOOLEAN" => json!(row.try_get::<Option<bool>, _>(name).unwrap_or(None)),
            "DATE" => json!(row
                .try_get::<Option<chrono::NaiveDate>, _>(name)
                .unwrap_or(None)
                .map(|d| d.to_string())),
            "DATETIME" => json!(row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)
                .unwrap_or(None)
                .map(|dt| dt.to_string())),
            // 其余类型（含 TEXT）一律尝试转字符串
            _ => json!(row.try_get::<Option<String>, _>(name).unwrap_or(None)),
        };
        map.insert(name.to_string(), val);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_physical_table_name_normalization() {
        assert_eq!(physical_table_name("1-1000181-1"), "table_1_1000181_1");
        assert_eq!(physical_table_name("plain"), "table_plain");
    }

    #[tokio::test]
    async fn test_fetch_table_headers_preserves_column_order() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE table_1_1000181_1 (\"State/territory\" TEXT, \"Notes\" TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let headers = fetch_table_headers(&pool, "1-1000181-1").await.unwrap();
        assert_eq!(headers, vec!["State/territory", "Notes"]);
    }

    #[tokio::test]
    async fn test_fetch_table_headers_empty_for_unknown_table() {
        let pool = memory_pool().await;
        let headers = fetch_table_headers(&pool, "9-9999").await.unwrap();
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn test_execute_query_renders_rows_as_json() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE t (name TEXT, qty INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES ('a', 3), ('b', NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let rows = execute_query(&pool, "SELECT * FROM t").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], json!({ "name": "a", "qty": 3 }));
        assert_eq!(rows[1], json!({ "name": "b", "qty": null }));
    }

    #[tokio::test]
    async fn test_execute_query_surfaces_store_errors() {
        let pool = memory_pool().await;
        let err = execute_query(&pool, "SELECT * FROM missing_table")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing_table"));
    }
}
