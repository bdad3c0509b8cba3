// ==========================================
// 同行评审分配系统 - API 层
// ==========================================
// 职责: 对编辑端暴露业务接口,统一做输入校验与错误映射
// ==========================================

pub mod error;
pub mod review_api;
pub mod workload_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use review_api::ReviewApi;
pub use workload_api::WorkloadApi;
