//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。

use std::env;

use thiserror::Error;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host:                     String,
    /// ポート番号
    pub port:                     u16,
    /// データベース接続 URL
    pub database_url:             String,
    /// 接続プールの最大接続数
    pub database_max_connections: u32,
    /// 起動時にマイグレーションを適用するか
    pub run_migrations:           bool,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む（テストでは環境変数の代わりに HashMap を渡す）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            host:                     lookup("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port:                     parse("CORE_PORT", required("CORE_PORT")?)?,
            database_url:             required("DATABASE_URL")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .map(|v| parse("DATABASE_MAX_CONNECTIONS", v))
                .transpose()?
                .unwrap_or(10),
            run_migrations:           lookup("RUN_MIGRATIONS")
                .map(|v| parse_bool("RUN_MIGRATIONS", v))
                .transpose()?
                .unwrap_or(true),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(vars: &[(&'static str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, (*v).to_string())).collect();
        CoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_必須項目のみで既定値が補われる() {
        let config = load(&[("CORE_PORT", "3001"), ("DATABASE_URL", "postgres://localhost/erp")])
            .unwrap();

        assert_eq!(
            config,
            CoreConfig {
                host:                     "0.0.0.0".to_string(),
                port:                     3001,
                database_url:             "postgres://localhost/erp".to_string(),
                database_max_connections: 10,
                run_migrations:           true,
            }
        );
    }

    #[rstest]
    #[case(&[("DATABASE_URL", "postgres://x")], ConfigError::Missing("CORE_PORT"))]
    #[case(&[("CORE_PORT", "3001")], ConfigError::Missing("DATABASE_URL"))]
    #[case(
        &[("CORE_PORT", "abc"), ("DATABASE_URL", "postgres://x")],
        ConfigError::Invalid { name: "CORE_PORT", value: "abc".to_string() }
    )]
    #[case(
        &[("CORE_PORT", "3001"), ("DATABASE_URL", "postgres://x"), ("RUN_MIGRATIONS", "maybe")],
        ConfigError::Invalid { name: "RUN_MIGRATIONS", value: "maybe".to_string() }
    )]
    fn test_不足や不正な値はエラー(
        #[case] vars: &[(&'static str, &str)],
        #[case] expected: ConfigError,
    ) {
        assert_eq!(load(vars).unwrap_err(), expected);
    }

    #[test]
    fn test_マイグレーションを無効化できる() {
        let config = load(&[
            ("CORE_PORT", "3001"),
            ("DATABASE_URL", "postgres://x"),
            ("RUN_MIGRATIONS", "false"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();

        assert!(!config.run_migrations);
        assert_eq!(config.database_max_connections, 4);
    }
}
