use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::models::schema::SchemaRecord;

/// 聚合操作符表，顺序与建立索引时的编码一致，不可调整
pub const AGG_OPS: [&str; 6] = ["", "MAX", "MIN", "COUNT", "SUM", "AVG"];
/// 比较操作符表，顺序同上
pub const COND_OPS: [&str; 3] = ["=", ">", "<"];

/// 单个过滤条件：(列索引, 操作符索引, 字面值)
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: usize,
    pub operator: usize,
    pub value: String,
}

// 元数据里的条件是 [col, op, val] 三元组数组，
// 其中 val 在训练数据中既可能是字符串也可能是数值
impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CondVisitor;

        impl<'de> Visitor<'de> for CondVisitor {
            type Value = Condition;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a [column, operator, value] triple")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Condition, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let column: usize = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let operator: usize = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let value: serde_json::Value = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    other => {
                        return Err(de::Error::custom(format!(
                            "unsupported condition value: {}",
                            other
                        )))
                    }
                };
                Ok(Condition {
                    column,
                    operator,
                    value,
                })
            }
        }

        deserializer.deserialize_seq(CondVisitor)
    }
}

/// 与具体表结构无关的查询中间表示，
/// 由向量索引元数据中的 sql 字段解码得到，索引只有相对某张表的表头才有意义
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredQuery {
    pub agg: usize,
    pub sel: usize,
    #[serde(default)]
    pub conds: Vec<Condition>,
}

impl StructuredQuery {
    /// 解码 JSON 编码的查询模板，格式不符时显式失败
    pub fn parse(encoded: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(encoded)?)
    }
}

/// 将 StructuredQuery 按表头渲染成 SQL 文本。
/// 越界索引一律降级处理（列名退化为 colN 占位符），渲染本身不会失败
pub fn build_sql(query: &StructuredQuery, schema: &SchemaRecord) -> String {
    let col_name = |idx: usize| {
        schema
            .headers
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("col{}", idx))
    };

    let agg_op = AGG_OPS.get(query.agg).copied().unwrap_or("");
    let sel_col = col_name(query.sel);
    let select_part = if agg_op.is_empty() {
        format!("SELECT `{}`", sel_col)
    } else {
        format!("SELECT {}(`{}`)", agg_op, sel_col)
    };

    let from_part = format!("FROM `{}`", schema.table_id);

    let where_clauses: Vec<String> = query
        .conds
        .iter()
        .map(|cond| {
            let op = COND_OPS.get(cond.operator).copied().unwrap_or("=");
            let escaped = cond.value.replace('\'', "''");
            format!("`{}` {} '{}'", col_name(cond.column), op, escaped)
        })
        .collect();

    let mut parts = vec![select_part, from_part];
    if !where_clauses.is_empty() {
        parts.push(format!("WHERE {}", where_clauses.join(" AND ")));
    }
    format!("{};", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(table_id: &str, headers: &[&str]) -> SchemaRecord {
        SchemaRecord {
            table_id: table_id.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn test_select_without_conditions_has_no_where() {
        let query = StructuredQuery::parse(r#"{"agg": 0, "sel": 1, "conds": []}"#).unwrap();
        let sql = build_sql(&query, &schema("1-1000181-1", &["State/territory", "Notes"]));
        assert_eq!(sql, "SELECT `Notes` FROM `1-1000181-1`;");
    }

    #[test]
    fn test_single_quotes_in_values_are_doubled() {
        let query = StructuredQuery::parse(r#"{"agg": 0, "sel": 0, "conds": [[2, 0, "Bob's"]]}"#)
            .unwrap();
        let sql = build_sql(&query, &schema("t", &["a"]));
        assert_eq!(sql, "SELECT `a` FROM `t` WHERE `col2` = 'Bob''s';");
    }

    #[test]
    fn test_aggregation_wraps_selected_column() {
        let query = StructuredQuery::parse(r#"{"agg": 3, "sel": 0, "conds": []}"#).unwrap();
        let sql = build_sql(&query, &schema("t", &["Notes"]));
        assert_eq!(sql, "SELECT COUNT(`Notes`) FROM `t`;");
    }

    #[test]
    fn test_conditions_joined_with_and() {
        let query = StructuredQuery::parse(
            r#"{"agg": 0, "sel": 0, "conds": [[1, 1, "10"], [2, 2, "20"]]}"#,
        )
        .unwrap();
        let sql = build_sql(&query, &schema("t", &["a", "b", "c"]));
        assert_eq!(sql, "SELECT `a` FROM `t` WHERE `b` > '10' AND `c` < '20';");
    }

    #[test]
    fn test_out_of_range_indices_degrade_instead_of_failing() {
        let query = StructuredQuery::parse(r#"{"agg": 99, "sel": 7, "conds": [[5, 9, "x"]]}"#)
            .unwrap();
        let sql = build_sql(&query, &schema("t", &["a"]));
        assert_eq!(sql, "SELECT `col7` FROM `t` WHERE `col5` = 'x';");
    }

    #[test]
    fn test_numeric_condition_values_are_accepted() {
        let query =
            StructuredQuery::parse(r#"{"agg": 0, "sel": 0, "conds": [[1, 0, 66.0]]}"#).unwrap();
        assert_eq!(query.conds[0].value, "66.0");
    }

    #[test]
    fn test_malformed_template_is_rejected() {
        assert!(StructuredQuery::parse("not json").is_err());
        assert!(StructuredQuery::parse(r#"{"agg": 0}"#).is_err());
        assert!(StructuredQuery::parse(r#"{"agg": 0, "sel": 0, "conds": [[1, 0, null]]}"#).is_err());
    }
}
