// ==========================================
// 同行评审分配系统 - 负载设置 API
// ==========================================
// 职责: 负载设置读写、自动拒审规则与屏蔽区间维护
// 红线: 设置写入全部走版本化提交,冲突以 OptimisticLockFailure 上报
// 依据: Review_Engine_Specs_v0.2.md - 4. Workload Tracker
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::activity_log::{ActivityLog, ActivityType};
use crate::domain::workload::{AutoDeclineRule, BlackoutRange, WorkloadSettings};
use crate::engine::WorkloadTracker;
use crate::repository::ActivityLogRepository;

// ==========================================
// WorkloadApi - 负载设置 API
// ==========================================

/// 负载设置API
///
/// 职责:
/// 1. 负载设置的注册与乐观锁更新
/// 2. 自动拒审规则维护
/// 3. 屏蔽区间维护
pub struct WorkloadApi {
    tracker: Arc<WorkloadTracker>,
    activity_log_repo: Arc<ActivityLogRepository>,
}

impl WorkloadApi {
    pub fn new(tracker: Arc<WorkloadTracker>, activity_log_repo: Arc<ActivityLogRepository>) -> Self {
        Self {
            tracker,
            activity_log_repo,
        }
    }

    /// 查询评审人负载设置
    pub fn get_settings(&self, reviewer_id: &str) -> ApiResult<WorkloadSettings> {
        if reviewer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("评审人ID不能为空".to_string()));
        }
        Ok(self.tracker.get_settings(reviewer_id)?)
    }

    /// 注册负载设置 (首次建档,存在则整体覆盖)
    pub fn save_settings(&self, settings: &WorkloadSettings, operator: &str) -> ApiResult<()> {
        if settings.reviewer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("评审人ID不能为空".to_string()));
        }
        self.tracker.save_settings(settings)?;
        self.log_change(
            &settings.reviewer_id,
            operator,
            &json!({"action": "save_settings", "monthly_capacity": settings.monthly_capacity}),
        )?;
        Ok(())
    }

    /// 更新负载设置 (乐观锁)
    ///
    /// # 参数
    /// - expected_revision: 调用方读到的版本号,不一致则拒绝写入
    ///
    /// # 返回
    /// - Ok(i32): 新版本号
    #[instrument(skip(self, settings), fields(reviewer_id = %settings.reviewer_id))]
    pub fn update_settings(
        &self,
        settings: &WorkloadSettings,
        expected_revision: i32,
        operator: &str,
    ) -> ApiResult<i32> {
        let revision = self.tracker.update_settings(settings, expected_revision)?;
        self.log_change(
            &settings.reviewer_id,
            operator,
            &json!({
                "action": "update_settings",
                "monthly_capacity": settings.monthly_capacity,
                "revision": revision,
            }),
        )?;
        Ok(revision)
    }

    /// 新增或替换自动拒审规则
    pub fn upsert_rule(
        &self,
        reviewer_id: &str,
        rule: AutoDeclineRule,
        operator: &str,
    ) -> ApiResult<i32> {
        if rule.rule_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("规则ID不能为空".to_string()));
        }
        let rule_id = rule.rule_id.clone();
        let revision = self.tracker.upsert_rule(reviewer_id, rule)?;
        self.log_change(
            reviewer_id,
            operator,
            &json!({"action": "upsert_rule", "rule_id": rule_id, "revision": revision}),
        )?;
        Ok(revision)
    }

    /// 移除自动拒审规则
    pub fn remove_rule(
        &self,
        reviewer_id: &str,
        rule_id: &str,
        operator: &str,
    ) -> ApiResult<i32> {
        let revision = self.tracker.remove_rule(reviewer_id, rule_id)?;
        self.log_change(
            reviewer_id,
            operator,
            &json!({"action": "remove_rule", "rule_id": rule_id, "revision": revision}),
        )?;
        Ok(revision)
    }

    /// 新增屏蔽区间
    pub fn add_blackout(
        &self,
        reviewer_id: &str,
        range: BlackoutRange,
        operator: &str,
    ) -> ApiResult<i32> {
        let detail = json!({
            "action": "add_blackout",
            "start": range.start.to_string(),
            "end": range.end.to_string(),
        });
        let revision = self.tracker.add_blackout(reviewer_id, range)?;
        self.log_change(reviewer_id, operator, &detail)?;
        Ok(revision)
    }

    /// 移除屏蔽区间 (精确匹配)
    pub fn remove_blackout(
        &self,
        reviewer_id: &str,
        range: &BlackoutRange,
        operator: &str,
    ) -> ApiResult<i32> {
        let revision = self.tracker.remove_blackout(reviewer_id, range)?;
        self.log_change(
            reviewer_id,
            operator,
            &json!({
                "action": "remove_blackout",
                "start": range.start.to_string(),
                "end": range.end.to_string(),
            }),
        )?;
        Ok(revision)
    }

    fn log_change(
        &self,
        reviewer_id: &str,
        operator: &str,
        detail: &serde_json::Value,
    ) -> ApiResult<()> {
        self.activity_log_repo.insert(
            &ActivityLog::new(ActivityType::SettingsUpdated)
                .with_reviewer(reviewer_id)
                .with_operator(operator)
                .with_detail(detail),
        )?;
        Ok(())
    }
}
