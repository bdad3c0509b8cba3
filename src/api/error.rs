// ==========================================
// 同行评审分配系统 - API层错误类型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 9. Error Handling
// 职责: 定义API层错误类型,转换Repository错误为用户友好的错误消息
// 红线: 冲突与容量违规必须显式报错,不得静默吞掉
// ==========================================

use crate::domain::conflict::ConflictEvidence;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 分配红线错误
    // ==========================================
    /// 阻断级利益冲突,无覆写路径
    #[error("存在阻断级利益冲突: reviewer_id={reviewer_id}")]
    ConflictBlocked {
        reviewer_id: String,
        conflicts: Vec<ConflictEvidence>,
    },

    /// 容量已满 (仅显式覆写且附原因时可越过)
    #[error("评审容量已满: reviewer_id={reviewer_id}, capacity={capacity}, current={current}")]
    CapacityExceeded {
        reviewer_id: String,
        capacity: i32,
        current: i32,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                reviewer_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "评审人{}的负载设置已被他人修改（期望revision={}，实际revision={}）",
                reviewer_id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 引擎层错误转换
// ==========================================

/// 引擎返回的 Box<dyn Error> 优先还原为仓储错误,保留类型化信息
pub(crate) fn from_engine_error(err: Box<dyn std::error::Error>) -> ApiError {
    match err.downcast::<RepositoryError>() {
        Ok(repo_err) => ApiError::from(*repo_err),
        Err(other) => ApiError::InternalError(other.to_string()),
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "manuscript".to_string(),
            id: "M001".to_string(),
        };
        let api_err = ApiError::from(repo_err);
        assert!(matches!(api_err, ApiError::NotFound(_)));
        assert!(api_err.to_string().contains("M001"));
    }

    #[test]
    fn test_optimistic_lock_conversion_keeps_revisions() {
        let repo_err = RepositoryError::OptimisticLockFailure {
            reviewer_id: "R001".to_string(),
            expected: 3,
            actual: 5,
        };
        let api_err = ApiError::from(repo_err);
        let msg = api_err.to_string();
        assert!(msg.contains("revision=3"));
        assert!(msg.contains("revision=5"));
    }

    #[test]
    fn test_engine_error_downcast() {
        let boxed: Box<dyn std::error::Error> = Box::new(RepositoryError::InvalidStateTransition {
            from: "DECLINED".to_string(),
            to: "ACCEPTED".to_string(),
        });
        let api_err = from_engine_error(boxed);
        assert!(matches!(
            api_err,
            ApiError::InvalidStateTransition { .. }
        ));
    }

    #[test]
    fn test_engine_error_fallback_internal() {
        let boxed: Box<dyn std::error::Error> =
            "配置读取失败".to_string().into();
        let api_err = from_engine_error(boxed);
        assert!(matches!(api_err, ApiError::InternalError(_)));
    }
}
