// ==========================================
// 同行评审分配系统 - 领域模型层
// ==========================================
// 依据: Editorial_Master_Spec.md - PART C 数据与状态体系
// 依据: Review_Engine_Specs_v0.2.md - 1. 数据模型
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod activity_log;
pub mod assignment;
pub mod conflict;
pub mod manuscript;
pub mod reviewer;
pub mod types;
pub mod workload;

// 重导出核心类型
pub use activity_log::{ActivityLog, ActivityType};
pub use assignment::{can_transition, ReviewAssignment};
pub use conflict::{has_blocking, severity_for, ConflictEvidence};
pub use manuscript::Manuscript;
pub use reviewer::{
    normalize_institution, AdvisoryLink, AffiliationRecord, CoauthorshipRecord,
    FinancialDisclosure, ReviewerProfile,
};
pub use types::{
    AssignmentStatus, AvailabilityStatus, ConflictSeverity, ConflictType, ManuscriptStatus,
    Priority,
};
pub use workload::{AutoDeclineRule, BlackoutRange, WorkloadSettings, WorkloadSnapshot};
