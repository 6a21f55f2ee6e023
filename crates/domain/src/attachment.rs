//! # 添付ファイル
//!
//! 車両そのもの、または完了記録に添付された画像・ファイルのメタデータ。
//! バイナリ本体はオブジェクトストレージに置き、ここではキーと元ファイル名だけを扱う。
//!
//! ## 出自によるグルーピング
//!
//! ワークフロー集約では、車両に直接付いた添付はコレクション名ごとに、
//! 完了記録に付いた添付は [`STEP_IMAGES_GROUP`] / [`STEP_FILES_GROUP`] にまとめる。
//! 表示側はグループ名で出自を区別できる。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, tenant::TenantId};

/// 完了記録由来の画像グループ名
pub const STEP_IMAGES_GROUP: &str = "stepImages";
/// 完了記録由来のファイルグループ名
pub const STEP_FILES_GROUP: &str = "stepFiles";

define_uuid_id! {
    /// 添付ファイル ID
    pub struct AttachmentId;
}

/// 添付の種類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

impl std::str::FromStr for AttachmentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            _ => Err(DomainError::Validation(format!("不正な添付種別: {s}"))),
        }
    }
}

/// 添付の持ち主の種類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttachmentOwnerType {
    /// 完了記録
    FinishedStep,
    /// 車両
    Vehicle,
    /// サービス車両
    ServiceVehicle,
}

impl std::str::FromStr for AttachmentOwnerType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finished_step" => Ok(Self::FinishedStep),
            "vehicle" => Ok(Self::Vehicle),
            "service_vehicle" => Ok(Self::ServiceVehicle),
            _ => Err(DomainError::Validation(format!("不正な添付所有者種別: {s}"))),
        }
    }
}

/// 添付の持ち主（ポリモーフィック参照）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentOwner {
    pub owner_type: AttachmentOwnerType,
    pub owner_id:   uuid::Uuid,
}

impl AttachmentOwner {
    pub fn new(owner_type: AttachmentOwnerType, owner_id: uuid::Uuid) -> Self {
        Self {
            owner_type,
            owner_id,
        }
    }
}

/// 添付ファイルのメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id:            AttachmentId,
    pub tenant_id:     TenantId,
    pub owner:         AttachmentOwner,
    pub kind:          AttachmentKind,
    /// アップロード時のフィールド名（例: `images`, `documents`）
    pub collection:    String,
    pub original_name: String,
    pub content_type:  String,
    pub storage_key:   String,
    pub size_bytes:    i64,
    pub created_at:    DateTime<Utc>,
}

/// グループ名 → 添付一覧
///
/// グループ名の辞書順で並ぶ。グループ内は登録順を保つ。
pub type AttachmentGroups = BTreeMap<String, Vec<Attachment>>;

/// 車両由来と完了記録由来の添付を、種類ごとのグループに振り分ける
///
/// 戻り値は `(画像グループ, ファイルグループ)`。
pub fn group_attachments(
    entity_attachments: impl IntoIterator<Item = Attachment>,
    step_attachments: impl IntoIterator<Item = Attachment>,
) -> (AttachmentGroups, AttachmentGroups) {
    let mut images = AttachmentGroups::new();
    let mut files = AttachmentGroups::new();

    for attachment in entity_attachments {
        let group = match attachment.kind {
            AttachmentKind::Image => &mut images,
            AttachmentKind::File => &mut files,
        };
        group
            .entry(attachment.collection.clone())
            .or_default()
            .push(attachment);
    }

    for attachment in step_attachments {
        match attachment.kind {
            AttachmentKind::Image => images.entry(STEP_IMAGES_GROUP.to_string()).or_default(),
            AttachmentKind::File => files.entry(STEP_FILES_GROUP.to_string()).or_default(),
        }
        .push(attachment);
    }

    (images, files)
}
