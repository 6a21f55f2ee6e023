//! # S3 オブジェクトストレージ
//!
//! Amazon S3 / MinIO に添付ファイルの本体を保存する。
//!
//! ## 設計方針
//!
//! - **ローカル開発**: MinIO を使用（`S3_ENDPOINT_URL` で接続先を指定）
//! - **本番環境**: IAM ロールによる認証で Amazon S3 に接続（`S3_ENDPOINT_URL` 未設定）
//! - **サーバー経由アップロード**: 完了記録と一緒に送られたファイルをサーバーが PUT する
//! - **メール添付**: 通知送信時に本体を GET してメールに添付する
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use carflow_infra::s3;
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     // ローカル（MinIO）
//!     let client = s3::create_client("eu-west-1", Some("http://localhost:19000")).await;
//!     let storage = s3::AwsObjectStorage::new(client, "carflow-dev-attachments".to_string());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};

use crate::InfraError;

/// オブジェクトストレージのインターフェース
///
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// オブジェクトを保存する
    ///
    /// # 引数
    ///
    /// * `key` - オブジェクトキー（例: `{tenant_id}/finished_step/{owner_id}/{attachment_id}`）
    /// * `content_type` - MIME タイプ（例: `application/pdf`）
    /// * `body` - ファイル本体
    async fn put_object(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<(), InfraError>;

    /// オブジェクトを取得する（メール添付用）
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, InfraError>;
}

/// AWS S3 実装
///
/// `aws-sdk-s3` を使用した [`ObjectStorage`] の実装。MinIO とも互換動作する。
pub struct AwsObjectStorage {
    client:      Client,
    bucket_name: String,
}

impl AwsObjectStorage {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ObjectStorage for AwsObjectStorage {
    #[tracing::instrument(skip_all, level = "debug", fields(%key, size = body.len()))]
    async fn put_object(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<(), InfraError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("PUT Object の実行に失敗: {e}")))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%key))]
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, InfraError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("GET Object の実行に失敗: {e}")))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| InfraError::s3(format!("オブジェクト本体の読み込みに失敗: {e}")))?;

        Ok(bytes.into_bytes().to_vec())
    }
}

/// S3 クライアントを作成する
///
/// `endpoint` が `Some` の場合は MinIO 等のカスタムエンドポイントに接続する。
/// `None` の場合は AWS S3 のデフォルトエンドポイントを使用する。
///
/// 認証情報は SDK のデフォルト認証チェーンで解決する:
/// - ローカル: 環境変数 `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`（`.env` で設定）
/// - 本番: IAM ロール
pub async fn create_client(region: &str, endpoint: Option<&str>) -> Client {
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    // MinIO はパススタイルが必要（バーチャルホスト型 URL を使わない）
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}
