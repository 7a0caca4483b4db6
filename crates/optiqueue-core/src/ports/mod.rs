//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の協力者（ジョブサービス、UI、時計、ID 生成）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod id_generator;
pub mod job_service;
pub mod presentation_sink;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_service::{
    JobService, JobStatus, JobStatusResponse, LayoutSource, RemoteState, StartJobResponse,
};
pub use self::presentation_sink::PresentationSink;
