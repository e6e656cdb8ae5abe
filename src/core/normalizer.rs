use regex::Regex;

/// 对精炼后的 SQL 做确定性的文本清理。
/// 纯函数且幂等：normalize(normalize(x)) == normalize(x)
pub fn normalize(sql: &str) -> String {
    // 连续空白压缩为单个空格
    let mut s = sql.split_whitespace().collect::<Vec<_>>().join(" ");

    // 下划线前后混入的空格
    s = s
        .replace("table _", "table_")
        .replace("_ ", "_")
        .replace(" _", "_");

    // col 占位列名中混入的空格，如 "col 3" -> "col3"
    let col_fix = Regex::new(r"\bcol\s+(\d)").unwrap();
    s = col_fix.replace_all(&s, "col$1").into_owned();

    // 仅对第一个 WHERE 之后的条件部分收紧等号与引号周围的空格，
    // 出现多个 WHERE 时剩余部分原样保留
    if let Some((head, cond)) = s.split_once("WHERE") {
        let cond = cond
            .trim()
            .replace(" = ' ", "='")
            .replace(" ' ", "'")
            .replace(" '", "'");
        s = format!("{} WHERE {}", head.trim(), cond);
    }
    s
}
