//! # 添付ファイルストア
//!
//! 完了記録や車両に付く画像・ファイルを保存する。
//! 本体は [`ObjectStorage`] に、メタデータは `attachments` テーブルに置く。
//!
//! ## 設計方針
//!
//! - **本体が先**: オブジェクトを PUT してからメタデータを INSERT する。
//!   途中で失敗した場合に残るのは参照されないオブジェクトだけ
//! - **テナント分離**: オブジェクトキーの先頭にテナント ID を置く
//!   （`{tenant_id}/{owner_type}/{owner_id}/{attachment_id}`）

use std::sync::Arc;

use async_trait::async_trait;
use carflow_domain::{
    attachment::{Attachment, AttachmentId, AttachmentKind, AttachmentOwner, AttachmentOwnerType},
    tenant::TenantId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{error::InfraError, s3::ObjectStorage};

/// アップロードされたファイル
#[derive(Clone)]
pub struct UploadedFile {
    /// フォーム上のフィールド名（例: `images`, `documents`）
    pub collection:    String,
    pub kind:          AttachmentKind,
    pub original_name: String,
    pub content_type:  String,
    pub content:       Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("collection", &self.collection)
            .field("kind", &self.kind)
            .field("original_name", &self.original_name)
            .field("content_type", &self.content_type)
            .field("content", &format_args!("{} bytes", self.content.len()))
            .finish()
    }
}

/// オブジェクトキーを組み立てる
pub fn storage_key(tenant_id: &TenantId, owner: &AttachmentOwner, attachment_id: &AttachmentId) -> String {
    format!(
        "{}/{}/{}/{}",
        tenant_id, owner.owner_type, owner.owner_id, attachment_id
    )
}

/// 添付ファイルストアトレイト
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// 複数ファイルをオブジェクトストレージへアップロードする
    ///
    /// メタデータは保存しない。戻り値は保存前の添付メタデータ。
    async fn upload_multiple_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError>;

    /// ファイルをアップロードし、メタデータを保存する
    async fn save_with_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError>;

    /// 持ち主ごとの添付を取得する（登録順）
    async fn find_by_owners(
        &self,
        tenant_id: &TenantId,
        owners: &[AttachmentOwner],
    ) -> Result<Vec<Attachment>, InfraError>;

    /// 添付の本体を読み込む（メール添付用）
    async fn read_content(&self, attachment: &Attachment) -> Result<Vec<u8>, InfraError>;
}

#[derive(Debug, FromRow)]
struct AttachmentRow {
    id:            Uuid,
    tenant_id:     Uuid,
    owner_type:    String,
    owner_id:      Uuid,
    kind:          String,
    collection:    String,
    original_name: String,
    content_type:  String,
    storage_key:   String,
    size_bytes:    i64,
    created_at:    DateTime<Utc>,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = InfraError;

    fn try_from(row: AttachmentRow) -> Result<Self, Self::Error> {
        let owner_type: AttachmentOwnerType = row
            .owner_type
            .parse()
            .map_err(|e: carflow_domain::DomainError| InfraError::unexpected(e.to_string()))?;
        let kind: AttachmentKind = row
            .kind
            .parse()
            .map_err(|e: carflow_domain::DomainError| InfraError::unexpected(e.to_string()))?;

        Ok(Attachment {
            id: AttachmentId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            owner: AttachmentOwner::new(owner_type, row.owner_id),
            kind,
            collection: row.collection,
            original_name: row.original_name,
            content_type: row.content_type,
            storage_key: row.storage_key,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
        })
    }
}

/// オブジェクトストレージ + PostgreSQL 実装の AttachmentStore
pub struct StorageAttachmentStore {
    pool:    PgPool,
    storage: Arc<dyn ObjectStorage>,
}

impl StorageAttachmentStore {
    pub fn new(pool: PgPool, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { pool, storage }
    }

    async fn insert(&self, attachment: &Attachment) -> Result<(), InfraError> {
        let owner_type: &'static str = attachment.owner.owner_type.into();
        let kind: &'static str = attachment.kind.into();

        sqlx::query(
            r#"
            INSERT INTO attachments (
                id, tenant_id, owner_type, owner_id, kind, collection,
                original_name, content_type, storage_key, size_bytes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(attachment.id.as_uuid())
        .bind(attachment.tenant_id.as_uuid())
        .bind(owner_type)
        .bind(attachment.owner.owner_id)
        .bind(kind)
        .bind(&attachment.collection)
        .bind(&attachment.original_name)
        .bind(&attachment.content_type)
        .bind(&attachment.storage_key)
        .bind(attachment.size_bytes)
        .bind(attachment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for StorageAttachmentStore {
    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, count = files.len()))]
    async fn upload_multiple_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError> {
        let mut attachments = Vec::with_capacity(files.len());

        for file in files {
            if file.original_name.trim().is_empty() {
                return Err(InfraError::invalid_input("ファイル名が空です"));
            }

            let id = AttachmentId::new();
            let key = storage_key(tenant_id, owner, &id);
            let size_bytes = i64::try_from(file.content.len())
                .map_err(|_| InfraError::invalid_input("ファイルサイズが大きすぎます"))?;

            self.storage
                .put_object(&key, &file.content_type, file.content)
                .await?;

            attachments.push(Attachment {
                id,
                tenant_id: tenant_id.clone(),
                owner: owner.clone(),
                kind: file.kind,
                collection: file.collection,
                original_name: file.original_name,
                content_type: file.content_type,
                storage_key: key,
                size_bytes,
                created_at: Utc::now(),
            });
        }

        Ok(attachments)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, count = files.len()))]
    async fn save_with_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError> {
        let attachments = self.upload_multiple_files(tenant_id, owner, files).await?;

        for attachment in &attachments {
            self.insert(attachment).await?;
        }

        Ok(attachments)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, owners = owners.len()))]
    async fn find_by_owners(
        &self,
        tenant_id: &TenantId,
        owners: &[AttachmentOwner],
    ) -> Result<Vec<Attachment>, InfraError> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }

        let owner_types: Vec<String> = owners.iter().map(|o| o.owner_type.to_string()).collect();
        let owner_ids: Vec<Uuid> = owners.iter().map(|o| o.owner_id).collect();

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT a.id, a.tenant_id, a.owner_type, a.owner_id, a.kind, a.collection,
                   a.original_name, a.content_type, a.storage_key, a.size_bytes, a.created_at
            FROM attachments a
            JOIN UNNEST($2::text[], $3::uuid[]) AS o(owner_type, owner_id)
              ON a.owner_type = o.owner_type AND a.owner_id = o.owner_id
            WHERE a.tenant_id = $1
            ORDER BY a.created_at, a.id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&owner_types)
        .bind(&owner_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Attachment::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(key = %attachment.storage_key))]
    async fn read_content(&self, attachment: &Attachment) -> Result<Vec<u8>, InfraError> {
        self.storage.get_object(&attachment.storage_key).await
    }
}
