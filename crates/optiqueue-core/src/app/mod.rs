//! App - アプリケーション層
//!
//! ports を組み合わせて、投入からポーリング、結果反映までを実装します。
//!
//! # 主要コンポーネント
//! - **ClientBuilder**: クライアントの構築とワイヤリング
//! - **OptimizerClient**: 呼び出し側に見せるファサード
//! - **Submitter**: ジョブ投入と Pending タスクの登録
//! - **Reconciler**: Pending タスクの状態照会と反映（周期ループ付き）
//! - **Materializer**: 最適化結果の座標列をコンテナに変換
//! - **layout**: 現在配置データセットの解析

pub mod builder;
pub mod client;
pub mod layout;
pub mod materializer;
pub mod reconciler;
pub mod status;
pub mod submission;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ClientBuilder};
pub use self::client::OptimizerClient;
pub use self::layout::parse_layout;
pub use self::materializer::Materializer;
pub use self::reconciler::{Reconciler, ReconcilerHandle};
pub use self::status::{QueueCounts, TickReport};
pub use self::submission::Submitter;
