// ==========================================
// 同行评审分配系统 - 引擎层
// ==========================================
// 依据: Editorial_Master_Spec.md - PART C 引擎体系
// 依据: Review_Engine_Specs_v0.2.md - 1.2 模块拆分
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod assign;
pub mod conflict;
pub mod conflict_core;
pub mod priority;
pub mod ranker;
pub mod relevance;
pub mod workload;

// 重导出核心引擎
pub use assign::{AssignmentOrchestrator, InviteOutcome};
pub use conflict::ConflictEngine;
pub use conflict_core::ConflictCore;
pub use priority::{PriorityEngine, PriorityThresholds};
pub use ranker::{CandidateRanker, CandidateResult};
pub use relevance::RelevanceScorer;
pub use workload::WorkloadTracker;
