//! Implementations - ports の具体実装
//!
//! - **HttpJobService**: 本番用（reqwest）
//! - **InMemoryJobService**: 開発・テスト用
//! - **sinks**: PresentationSink の実装（Noop, Tracing, Channel, Recording）

pub mod http_service;
pub mod memory_service;
pub mod sinks;

pub use self::http_service::HttpJobService;
pub use self::memory_service::InMemoryJobService;
pub use self::sinks::{ChannelSink, NoopSink, RecordingSink, TracingSink};
