//! optiqueue-core
//!
//! リモートの配置最適化ジョブをクライアント側で追跡・照合するためのコア
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, container, task, events）
//! - **ports**: 抽象化レイヤー（JobService, LayoutSource, PresentationSink, Clock, IdGenerator）
//! - **queue**: 投入順を保持するタスクキュー
//! - **app**: アプリケーションロジック（builder, client, submission, reconciler, materializer）
//! - **impls**: 実装（HTTP, in-memory, sinks）
//! - **config**: クライアント設定（TOML + 環境変数）
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{BuildError, ClientBuilder, OptimizerClient, TickReport};
pub use config::{ClientConfig, ConfigOverrides};
pub use domain::{DomainEvent, LatLng, Task, TaskId, TaskResult, TaskState, WasteContainer};
pub use error::{
    ConfigError, InvalidTaskRecord, MaterializeError, QueueError, ServiceError, SubmitError,
};
