//! # 通知ユースケース
//!
//! ステップ完了に伴うメール通知の生成・送信・ログ記録を統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成
//! - [`service`] - 宛先解決 + 本文組み立て + 送信 + メールログ記録の統合サービス

pub mod service;
pub mod template_renderer;

pub use service::{StepFinishedNotice, StepNotificationService, compose_body};
pub use template_renderer::TemplateRenderer;
