// ==========================================
// 同行评审分配系统 - 核心库
// ==========================================
// 依据: Editorial_Master_Spec.md - 系统宪法
// 技术栈: Rust + SQLite
// 系统定位: 编辑部决策支持系统 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AssignmentStatus, AvailabilityStatus, ConflictSeverity, ConflictType, ManuscriptStatus,
    Priority,
};

// 领域实体
pub use domain::{
    ActivityLog, ActivityType, AdvisoryLink, AffiliationRecord, AutoDeclineRule, BlackoutRange,
    CoauthorshipRecord, ConflictEvidence, FinancialDisclosure, Manuscript, ReviewAssignment,
    ReviewerProfile, WorkloadSettings, WorkloadSnapshot,
};

// 引擎
pub use engine::{
    AssignmentOrchestrator, CandidateRanker, CandidateResult, ConflictEngine, InviteOutcome,
    PriorityEngine, PriorityThresholds, RelevanceScorer, WorkloadTracker,
};

// API
pub use api::{ApiError, ApiResult, ReviewApi, WorkloadApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "同行评审分配系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
