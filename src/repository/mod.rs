// ==========================================
// 同行评审分配系统 - 数据仓储层
// ==========================================
// 依据: Editorial_Master_Spec.md - PART D 引擎铁律
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod activity_log_repo;
pub mod assignment_repo;
pub mod error;
pub mod manuscript_repo;
pub mod reviewer_repo;
pub mod workload_repo;

// 重导出核心仓储
pub use activity_log_repo::ActivityLogRepository;
pub use assignment_repo::AssignmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use manuscript_repo::ManuscriptRepository;
pub use reviewer_repo::ReviewerRepository;
pub use workload_repo::WorkloadRepository;
