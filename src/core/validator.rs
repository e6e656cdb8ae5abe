/// SQL 语句白名单校验：管线只放行 SELECT 查询
pub fn is_select_statement(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|head| head.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_statements_pass() {
        assert!(is_select_statement("SELECT * FROM t;"));
        assert!(is_select_statement("  select `a` from `t`"));
    }

    #[test]
    fn test_non_select_statements_rejected() {
        assert!(!is_select_statement("DROP TABLE t;"));
        assert!(!is_select_statement("INSERT INTO t VALUES (1);"));
        assert!(!is_select_statement(""));
        assert!(!is_select_statement("sel"));
    }
}
