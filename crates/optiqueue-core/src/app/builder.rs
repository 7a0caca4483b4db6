//! ClientBuilder - クライアントの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - JobService は必須、未設定なら build() が BuildError を返す
//! - それ以外（sink, clock, id 生成器, config）はデフォルトあり

use std::sync::Arc;

use super::client::OptimizerClient;
use super::materializer::Materializer;
use super::reconciler::Reconciler;
use super::submission::Submitter;
use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::impls::NoopSink;
use crate::ports::{
    Clock, IdGenerator, JobService, LayoutSource, PresentationSink, SystemClock, UlidGenerator,
};
use crate::queue::TaskQueue;

/// # 使用例
/// ```ignore
/// let client = ClientBuilder::new()
///     .config(config)
///     .job_service(Arc::new(HttpJobService::new(&config)?))
///     .sink(Arc::new(TracingSink))
///     .build()?;
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    service: Option<Arc<dyn JobService>>,
    layout_source: Option<Arc<dyn LayoutSource>>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no job service configured; call `job_service()` before `build()`")]
    MissingJobService,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            service: None,
            layout_source: None,
            sink: Arc::new(NoopSink),
            clock: Arc::new(SystemClock),
            ids: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn job_service(mut self, service: Arc<dyn JobService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn layout_source(mut self, source: Arc<dyn LayoutSource>) -> Self {
        self.layout_source = Some(source);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 未設定なら SystemClock ベースの UlidGenerator を使う
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<OptimizerClient, BuildError> {
        self.config.validate()?;
        let service = self.service.ok_or(BuildError::MissingJobService)?;
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        let queue = TaskQueue::new().shared();
        let submitter = Submitter::new(
            queue.clone(),
            service.clone(),
            self.sink.clone(),
            self.clock.clone(),
        );
        let reconciler = Arc::new(Reconciler::new(
            queue.clone(),
            service,
            self.sink,
            self.clock,
            Materializer::new(ids.clone()),
            self.config.query_timeout(),
        ));

        Ok(OptimizerClient {
            config: self.config,
            queue,
            submitter,
            reconciler,
            layout_source: self.layout_source,
            ids,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
