//! IdGenerator port - ID 生成の抽象化
//!
//! 結果から生成するコンテナには、セッション内で衝突しない ID が必要。
//! ULID なら調整なしでそれを満たす。

use crate::domain::ContainerId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_container_id(&self) -> ContainerId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// - タイムスタンプ部は注入された [`Clock`] から
/// - 80-bit のランダム部により、時刻が固定でも ID は重複しない
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_container_id(&self) -> ContainerId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ContainerId::from(ulid)
    }
}
