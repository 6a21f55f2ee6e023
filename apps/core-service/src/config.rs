//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。

use std::env;

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません（.env を確認してください）")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// 接続プールの最大接続数
    pub database_max_connections: u32,
    /// 添付ファイル保存先
    pub storage: StorageConfig,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// オブジェクトストレージの設定
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region:       String,
    /// MinIO 使用時に設定。未設定なら AWS S3 デフォルト
    pub endpoint_url: Option<String>,
    pub bucket_name:  String,
}

/// 通知機能の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `ses`: Amazon SES v2 経由で送信（本番）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:        NotificationBackend,
    pub smtp_host:      String,
    pub smtp_port:      u16,
    /// 送信元メールアドレス
    pub from_address:   String,
    /// 件名の先頭に付ける文字列
    pub subject_prefix: String,
}

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    Smtp,
    Ses,
    Noop,
}

impl std::str::FromStr for NotificationBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "ses" => Ok(Self::Ses),
            "noop" => Ok(Self::Noop),
            other => Err(ConfigError::Invalid {
                name:  "NOTIFICATION_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("CORE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("CORE_PORT", required("CORE_PORT")?)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                optional("DATABASE_MAX_CONNECTIONS", "10"),
            )?,
            storage: StorageConfig::from_env()?,
            notification: NotificationConfig::from_env()?,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            region:       optional("S3_REGION", "eu-west-1"),
            endpoint_url: env::var("S3_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
            bucket_name:  required("S3_BUCKET_NAME")?,
        })
    }
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            backend:        optional("NOTIFICATION_BACKEND", "noop").parse()?,
            smtp_host:      optional("SMTP_HOST", "localhost"),
            smtp_port:      parse_var("SMTP_PORT", optional("SMTP_PORT", "1025"))?,
            from_address:   optional("NOTIFICATION_FROM_ADDRESS", "noreply@carflow.example.com"),
            subject_prefix: optional("NOTIFICATION_SUBJECT_PREFIX", "[CarFlow]"),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("smtp", NotificationBackend::Smtp)]
    #[case("ses", NotificationBackend::Ses)]
    #[case("noop", NotificationBackend::Noop)]
    fn test_通知バックエンドを文字列から解釈できる(
        #[case] input: &str,
        #[case] expected: NotificationBackend,
    ) {
        assert_eq!(input.parse::<NotificationBackend>().unwrap(), expected);
    }

    #[test]
    fn test_未知の通知バックエンドはエラー() {
        let err = "sendgrid".parse::<NotificationBackend>().unwrap_err();

        assert_eq!(
            err.to_string(),
            "NOTIFICATION_BACKEND の値が不正です: sendgrid"
        );
    }

    #[test]
    fn test_ポート番号として解釈できない値はエラー() {
        let result: Result<u16, _> = parse_var("CORE_PORT", "abc".to_string());

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "CORE_PORT",
                ..
            })
        ));
    }
}
