//! 启动时的环境变量校验
//!
//! 所有规则独立求值，违规项全部收集后一次性报错。

use std::collections::HashMap;

use thiserror::Error;

/// THROTTLE_TTL 缺省值（毫秒）
pub const DEFAULT_THROTTLE_TTL_MS: u64 = 60_000;

/// THROTTLE_LIMIT 缺省值（请求数）
pub const DEFAULT_THROTTLE_LIMIT: u32 = 100;

/// THROTTLE_TTL 上限：一年（毫秒）
pub const MAX_THROTTLE_TTL_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// 生产环境下 JWT_SECRET 的最小长度
pub const MIN_JWT_SECRET_LEN: usize = 32;

const VALIDATION_HEADER: &str = "Environment validation failed:";

/// 配置校验失败，`violations` 按规则顺序保存每一条违规描述
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.violations))]
pub struct ConfigurationError {
    pub violations: Vec<String>,
}

fn render(violations: &[String]) -> String {
    let mut message = String::from(VALIDATION_HEADER);
    for violation in violations {
        message.push_str("\n  - ");
        message.push_str(violation);
    }
    message
}

/// 取非空字符串值，空串视为未设置
fn non_empty<'a>(raw: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    raw.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

fn validate_formats(raw: &HashMap<String, String>, violations: &mut Vec<String>) {
    if let Some(secret) = non_empty(raw, "JWT_SECRET") {
        if secret.chars().count() < MIN_JWT_SECRET_LEN {
            violations.push(format!(
                "JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters"
            ));
        }
    }

    if let Some(url) = non_empty(raw, "DATABASE_URL") {
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            violations.push("DATABASE_URL must start with postgres:// or postgresql://".to_string());
        }
    }

    if let Some(port) = raw.get("PORT") {
        if !matches!(parse_integer(port), Some(1..=65535)) {
            violations.push("PORT must be a valid port number (1-65535)".to_string());
        }
    }

    let throttle_bounds = [
        ("THROTTLE_TTL", MAX_THROTTLE_TTL_MS),
        ("THROTTLE_LIMIT", u64::from(u32::MAX)),
    ];
    for (key, max) in throttle_bounds {
        let Some(value) = raw.get(key) else {
            continue;
        };
        match parse_integer(value) {
            None | Some(i64::MIN..=0) => violations.push(format!("{key} must be a positive integer")),
            Some(n) if n as u64 > max => violations.push(format!("{key} must not exceed {max}")),
            Some(_) => {}
        }
    }
}

/// 校验原始配置，成功时返回补齐了限流缺省值的新映射（显式值优先）
pub fn validate(raw: &HashMap<String, String>) -> Result<HashMap<String, String>, ConfigurationError> {
    let mut violations = Vec::new();
    let is_production = raw.get("NODE_ENV").map(String::as_str) == Some("production");

    if is_production && non_empty(raw, "JWT_SECRET").is_none() {
        violations.push("JWT_SECRET is required in production".to_string());
    }
    if is_production && non_empty(raw, "DATABASE_URL").is_none() {
        violations.push("DATABASE_URL is required in production".to_string());
    }

    validate_formats(raw, &mut violations);

    if !violations.is_empty() {
        return Err(ConfigurationError { violations });
    }

    let mut validated = raw.clone();
    for key in ["THROTTLE_TTL", "THROTTLE_LIMIT"] {
        if let Some(value) = validated.get_mut(key) {
            *value = value.trim().to_string();
        }
    }
    validated
        .entry("THROTTLE_TTL".to_string())
        .or_insert_with(|| DEFAULT_THROTTLE_TTL_MS.to_string());
    validated
        .entry("THROTTLE_LIMIT".to_string())
        .or_insert_with(|| DEFAULT_THROTTLE_LIMIT.to_string());

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const GOOD_SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_empty_config_gets_defaults() {
        let out = validate(&HashMap::new()).unwrap();
        assert_eq!(out["THROTTLE_TTL"], "60000");
        assert_eq!(out["THROTTLE_LIMIT"], "100");
    }

    #[test]
    fn test_non_production_never_requires_secrets() {
        for node_env in ["development", "test", "staging"] {
            assert!(validate(&env(&[("NODE_ENV", node_env)])).is_ok());
        }
    }

    #[test]
    fn test_explicit_throttle_values_win() {
        let out = validate(&env(&[("THROTTLE_TTL", "1000"), ("THROTTLE_LIMIT", "5")])).unwrap();
        assert_eq!(out["THROTTLE_TTL"], "1000");
        assert_eq!(out["THROTTLE_LIMIT"], "5");
    }

    #[test]
    fn test_production_requires_secret_and_database() {
        let err = validate(&env(&[("NODE_ENV", "production")])).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Environment validation failed:"));
        assert!(message.contains("JWT_SECRET"));
        assert!(message.contains("DATABASE_URL"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn test_production_with_everything_set() {
        let out = validate(&env(&[
            ("NODE_ENV", "production"),
            ("JWT_SECRET", GOOD_SECRET),
            ("DATABASE_URL", "postgres://app@db/app"),
        ]));
        assert!(out.is_ok());
    }

    #[test]
    fn test_empty_secret_counts_as_missing_in_production() {
        let err = validate(&env(&[
            ("NODE_ENV", "production"),
            ("JWT_SECRET", ""),
            ("DATABASE_URL", "postgres://app@db/app"),
        ]))
        .unwrap_err();
        assert_eq!(err.violations, vec!["JWT_SECRET is required in production"]);
    }

    #[test]
    fn test_jwt_secret_length_boundary() {
        let short = "a".repeat(31);
        let exact = "a".repeat(32);
        assert!(validate(&env(&[("JWT_SECRET", &short)])).is_err());
        assert!(validate(&env(&[("JWT_SECRET", &exact)])).is_ok());
    }

    #[test]
    fn test_database_url_scheme() {
        assert!(validate(&env(&[("DATABASE_URL", "mysql://localhost/app")])).is_err());
        assert!(validate(&env(&[("DATABASE_URL", "postgres://localhost/app")])).is_ok());
        assert!(validate(&env(&[("DATABASE_URL", "postgresql://localhost/app")])).is_ok());
    }

    #[test]
    fn test_port_range() {
        for bad in ["0", "65536", "abc", "", "-1", "80.5"] {
            assert!(validate(&env(&[("PORT", bad)])).is_err(), "PORT={bad:?} 应当失败");
        }
        for good in ["1", "65535", "3001"] {
            assert!(validate(&env(&[("PORT", good)])).is_ok(), "PORT={good:?} 应当通过");
        }
    }

    #[test]
    fn test_throttle_values_must_be_positive() {
        assert!(validate(&env(&[("THROTTLE_TTL", "0")])).is_err());
        assert!(validate(&env(&[("THROTTLE_LIMIT", "-5")])).is_err());
        assert!(validate(&env(&[("THROTTLE_LIMIT", "ten")])).is_err());
        assert!(validate(&env(&[("THROTTLE_TTL", "1")])).is_ok());
    }

    #[test]
    fn test_throttle_ttl_upper_bound() {
        let one_year = MAX_THROTTLE_TTL_MS.to_string();
        assert!(validate(&env(&[("THROTTLE_TTL", &one_year)])).is_ok());

        let over = (MAX_THROTTLE_TTL_MS + 1).to_string();
        let err = validate(&env(&[("THROTTLE_TTL", &over)])).unwrap_err();
        assert_eq!(
            err.violations,
            vec![format!("THROTTLE_TTL must not exceed {MAX_THROTTLE_TTL_MS}")]
        );

        assert!(validate(&env(&[("THROTTLE_TTL", "10000000000000000")])).is_err());
    }

    #[test]
    fn test_throttle_limit_fits_u32() {
        let max = u32::MAX.to_string();
        assert!(validate(&env(&[("THROTTLE_LIMIT", &max)])).is_ok());

        let over = (u64::from(u32::MAX) + 1).to_string();
        let err = validate(&env(&[("THROTTLE_LIMIT", &over)])).unwrap_err();
        assert_eq!(err.violations, vec!["THROTTLE_LIMIT must not exceed 4294967295"]);
    }

    #[test]
    fn test_all_violations_collected() {
        let err = validate(&env(&[
            ("NODE_ENV", "production"),
            ("JWT_SECRET", "short"),
            ("DATABASE_URL", "mysql://x"),
            ("PORT", "0"),
            ("THROTTLE_TTL", "x"),
            ("THROTTLE_LIMIT", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err.violations.len(), 5);

        let rendered = err.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Environment validation failed:");
        assert!(lines[1..].iter().all(|line| line.starts_with("  - ")));
    }

    #[test]
    fn test_unrelated_keys_pass_through() {
        let out = validate(&env(&[("APP_NAME", "demo")])).unwrap();
        assert_eq!(out["APP_NAME"], "demo");
    }
}
