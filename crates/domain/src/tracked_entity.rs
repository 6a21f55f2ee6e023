//! # 追跡対象エンティティ
//!
//! ワークフローで進捗を追跡する業務エンティティ（車両、サービス車両）。
//!
//! ## 設計判断
//!
//! 追跡対象は型名の文字列ではなく [`TrackedEntityType`] のタグで区別する。
//! どのカラム・リレーションを読み込むかはテナントモジュールの [`RelationsPlan`] が
//! エンティティ種別ごとに明示的に宣言し、ローダーはタグで分岐する。
//! 新しい種別を追加するとき、`match` の網羅性検査が対応漏れを検出する。

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{DomainError, attachment::AttachmentOwnerType, tenant::TenantId};

/// 追跡対象エンティティの種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackedEntityType {
    /// 売買車両
    Vehicle,
    /// サービス（整備・輸送代行）車両
    ServiceVehicle,
}

impl TrackedEntityType {
    /// 格納テーブル名
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicles",
            Self::ServiceVehicle => "service_vehicles",
        }
    }

    /// 車両自体に付く添付の所有者種別
    pub fn attachment_owner_type(self) -> AttachmentOwnerType {
        match self {
            Self::Vehicle => AttachmentOwnerType::Vehicle,
            Self::ServiceVehicle => AttachmentOwnerType::ServiceVehicle,
        }
    }
}

impl std::str::FromStr for TrackedEntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vehicle" => Ok(Self::Vehicle),
            "service_vehicle" => Ok(Self::ServiceVehicle),
            _ => Err(DomainError::Validation(format!(
                "不正な追跡対象種別: {s}"
            ))),
        }
    }
}

/// 追跡対象への参照（種別 + ID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedEntityRef {
    pub entity_type: TrackedEntityType,
    pub entity_id:   Uuid,
}

impl TrackedEntityRef {
    pub fn new(entity_type: TrackedEntityType, entity_id: Uuid) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

impl std::fmt::Display for TrackedEntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// 読み込み済みの追跡対象エンティティ
///
/// カラムは [`RelationsPlan`] で選択されたものだけを保持する。
/// ソフトデリート済みの車両も読み込まれる（`deleted_at` で判別する）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedEntity {
    reference:  TrackedEntityRef,
    tenant_id:  TenantId,
    attributes: JsonMap<String, JsonValue>,
    relations:  BTreeMap<String, JsonValue>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TrackedEntity {
    pub fn from_db(
        reference: TrackedEntityRef,
        tenant_id: TenantId,
        attributes: JsonMap<String, JsonValue>,
        relations: BTreeMap<String, JsonValue>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            reference,
            tenant_id,
            attributes,
            relations,
            deleted_at,
        }
    }

    pub fn reference(&self) -> &TrackedEntityRef {
        &self.reference
    }

    pub fn entity_type(&self) -> TrackedEntityType {
        self.reference.entity_type
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn attributes(&self) -> &JsonMap<String, JsonValue> {
        &self.attributes
    }

    pub fn attribute(&self, column: &str) -> Option<&JsonValue> {
        self.attributes.get(column)
    }

    pub fn relations(&self) -> &BTreeMap<String, JsonValue> {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&JsonValue> {
        self.relations.get(name)
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// エンティティ種別ごとの読み込み計画
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLoadPlan {
    /// 選択するカラム。`None` は全カラム
    #[serde(default)]
    pub columns:   Option<Vec<String>>,
    /// 一緒に読み込むリレーション名。`None` はリレーションなし
    #[serde(default)]
    pub relations: Option<Vec<String>>,
}

/// テナントモジュールが宣言するリレーション読み込み計画
///
/// ワークフロー集約の構築時に、追跡対象をどのカラム・リレーション付きで
/// 読み込むかを種別ごとに返す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationsPlan {
    #[serde(default)]
    plans: HashMap<TrackedEntityType, EntityLoadPlan>,
}

impl RelationsPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// 種別ごとの計画を追加する（ビルダー）
    pub fn with(mut self, entity_type: TrackedEntityType, plan: EntityLoadPlan) -> Self {
        self.plans.insert(entity_type, plan);
        self
    }

    /// 選択するカラム一覧。計画がない、または全カラムの場合は `None`
    pub fn columns_to_select(&self, entity_type: TrackedEntityType) -> Option<&[String]> {
        self.plans
            .get(&entity_type)
            .and_then(|plan| plan.columns.as_deref())
    }

    /// 読み込むリレーション一覧。計画がない、またはリレーションなしの場合は `None`
    pub fn relations(&self, entity_type: TrackedEntityType) -> Option<&[String]> {
        self.plans
            .get(&entity_type)
            .and_then(|plan| plan.relations.as_deref())
    }
}
