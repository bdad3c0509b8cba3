// ==========================================
// 同行评审分配系统 - 评审分配 API
// ==========================================
// 职责: 候选排序、邀审全流程、优先级刷新、活动查询
// 红线: 阻断冲突与容量违规必须以类型化错误显式上报
// 依据: Review_Engine_Specs_v0.2.md - 10. Exposed Surface
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, instrument};

use crate::api::error::{from_engine_error, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::activity_log::{ActivityLog, ActivityType};
use crate::domain::assignment::ReviewAssignment;
use crate::domain::types::Priority;
use crate::engine::{
    AssignmentOrchestrator, CandidateRanker, CandidateResult, InviteOutcome, PriorityEngine,
};
use crate::repository::{ActivityLogRepository, AssignmentRepository, ManuscriptRepository};

// ==========================================
// ReviewApi - 评审分配 API
// ==========================================

/// 评审分配API
///
/// 职责:
/// 1. 候选评审人排序 (冲突 + 相关性 + 负载)
/// 2. 邀审生命周期 (invite/accept/decline/complete/expire)
/// 3. 稿件优先级计算与缓存刷新
/// 4. 活动日志查询
pub struct ReviewApi {
    manuscript_repo: Arc<ManuscriptRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    activity_log_repo: Arc<ActivityLogRepository>,
    orchestrator: Arc<AssignmentOrchestrator<ConfigManager>>,
    ranker: Arc<CandidateRanker<ConfigManager>>,
    priority_engine: Arc<PriorityEngine>,
}

impl ReviewApi {
    /// 创建新的ReviewApi实例
    ///
    /// # 参数
    /// - manuscript_repo: 稿件仓储
    /// - assignment_repo: 评审任务仓储
    /// - activity_log_repo: 活动日志仓储
    /// - orchestrator: 任务编排器
    /// - ranker: 候选排序器
    /// - priority_engine: 优先级计算器
    pub fn new(
        manuscript_repo: Arc<ManuscriptRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        activity_log_repo: Arc<ActivityLogRepository>,
        orchestrator: Arc<AssignmentOrchestrator<ConfigManager>>,
        ranker: Arc<CandidateRanker<ConfigManager>>,
        priority_engine: Arc<PriorityEngine>,
    ) -> Self {
        Self {
            manuscript_repo,
            assignment_repo,
            activity_log_repo,
            orchestrator,
            ranker,
            priority_engine,
        }
    }

    // ==========================================
    // 候选排序
    // ==========================================

    /// 对候选评审人排序
    ///
    /// # 参数
    /// - manuscript_id: 稿件ID
    /// - candidate_reviewer_ids: 外部检索提供的候选集
    /// - show_blocked: 透明模式,保留阻断候选 (仅展示,不可指派)
    ///
    /// # 返回
    /// - Ok(Vec<CandidateResult>): 确定性排序后的候选视图
    #[instrument(skip(self, candidate_reviewer_ids), fields(manuscript_id = %manuscript_id))]
    pub async fn rank_candidates(
        &self,
        manuscript_id: &str,
        candidate_reviewer_ids: Vec<String>,
        show_blocked: bool,
    ) -> ApiResult<Vec<CandidateResult>> {
        if manuscript_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("稿件ID不能为空".to_string()));
        }

        let manuscript = self
            .manuscript_repo
            .find_by_id(manuscript_id)?
            .ok_or_else(|| ApiError::NotFound(format!("manuscript(id={})不存在", manuscript_id)))?;

        let today = Utc::now().date_naive();
        self.ranker
            .rank(&manuscript, &candidate_reviewer_ids, show_blocked, today)
            .await
            .map_err(from_engine_error)
    }

    // ==========================================
    // 邀审生命周期
    // ==========================================

    /// 发起邀审
    ///
    /// # 参数
    /// - override_capacity: 容量覆写标志 (须附原因)
    /// - operator: 发起邀审的编辑工号
    ///
    /// # 返回
    /// - Ok(ReviewAssignment): INVITED 任务;规则命中时为 DECLINED 任务
    /// - Err(ConflictBlocked): 存在阻断级冲突
    /// - Err(CapacityExceeded): 容量已满且未覆写
    pub async fn invite(
        &self,
        manuscript_id: &str,
        reviewer_id: &str,
        due_date: NaiveDate,
        override_capacity: bool,
        override_reason: Option<String>,
        operator: &str,
    ) -> ApiResult<ReviewAssignment> {
        if manuscript_id.trim().is_empty() || reviewer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "稿件ID与评审人ID不能为空".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let outcome = self
            .orchestrator
            .invite(
                manuscript_id,
                reviewer_id,
                due_date,
                override_capacity,
                override_reason,
                operator,
                today,
            )
            .await
            .map_err(from_engine_error)?;

        let assignment = match outcome {
            InviteOutcome::Invited(a) | InviteOutcome::AutoDeclined(a) => a,
            InviteOutcome::ConflictBlocked(conflicts) => {
                return Err(ApiError::ConflictBlocked {
                    reviewer_id: reviewer_id.to_string(),
                    conflicts,
                })
            }
            InviteOutcome::CapacityExceeded {
                monthly_capacity,
                current_assignments,
            } => {
                return Err(ApiError::CapacityExceeded {
                    reviewer_id: reviewer_id.to_string(),
                    capacity: monthly_capacity,
                    current: current_assignments,
                })
            }
        };
        self.refresh_priority_cache(manuscript_id, Utc::now())?;
        Ok(assignment)
    }

    /// 评审人接受邀审
    pub fn accept(&self, assignment_id: &str) -> ApiResult<ReviewAssignment> {
        let a = self.orchestrator.accept(assignment_id)?;
        self.refresh_priority_cache(&a.manuscript_id, Utc::now())?;
        Ok(a)
    }

    /// 评审人拒审
    pub fn decline(&self, assignment_id: &str, reason: &str) -> ApiResult<ReviewAssignment> {
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("拒审原因不能为空".to_string()));
        }
        let a = self.orchestrator.decline(assignment_id, reason)?;
        self.refresh_priority_cache(&a.manuscript_id, Utc::now())?;
        Ok(a)
    }

    /// 评审完成
    pub fn complete(&self, assignment_id: &str) -> ApiResult<ReviewAssignment> {
        let a = self.orchestrator.complete(assignment_id)?;
        self.refresh_priority_cache(&a.manuscript_id, Utc::now())?;
        Ok(a)
    }

    /// 批量过期清扫 (外部调度器周期触发)
    pub fn expire_overdue(&self, now: DateTime<Utc>) -> ApiResult<Vec<ReviewAssignment>> {
        let expired = self.orchestrator.expire_overdue(now.date_naive())?;
        // 同一稿件只刷一次缓存
        let mut seen: Vec<&str> = Vec::new();
        for a in &expired {
            if !seen.contains(&a.manuscript_id.as_str()) {
                seen.push(&a.manuscript_id);
                self.refresh_priority_cache(&a.manuscript_id, now)?;
            }
        }
        Ok(expired)
    }

    /// 查询稿件的全部评审任务
    pub fn list_assignments(&self, manuscript_id: &str) -> ApiResult<Vec<ReviewAssignment>> {
        Ok(self.assignment_repo.find_by_manuscript(manuscript_id)?)
    }

    // ==========================================
    // 优先级
    // ==========================================

    /// 重新计算稿件优先级并刷新缓存列
    ///
    /// # 规则
    /// - 推导值与缓存不一致时才写库并留痕
    /// - 编辑覆写 (priority_override) 不受本计算影响
    #[instrument(skip(self), fields(manuscript_id = %manuscript_id))]
    pub fn compute_priority(
        &self,
        manuscript_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Priority> {
        self.refresh_priority_cache(manuscript_id, now)
    }

    /// 缓存刷新内核: 任务生命周期每次落库后同样走这里
    fn refresh_priority_cache(
        &self,
        manuscript_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Priority> {
        let manuscript = self
            .manuscript_repo
            .find_by_id(manuscript_id)?
            .ok_or_else(|| ApiError::NotFound(format!("manuscript(id={})不存在", manuscript_id)))?;

        let assignments = self.assignment_repo.find_by_manuscript(manuscript_id)?;
        let (derived, reasons) = self.priority_engine.derive(&manuscript, &assignments, now);

        if derived != manuscript.priority {
            self.manuscript_repo
                .update_priority_cache(manuscript_id, derived)?;
            self.activity_log_repo.insert(
                &ActivityLog::new(ActivityType::PriorityRefreshed)
                    .with_manuscript(manuscript_id)
                    .with_detail(&json!({
                        "from": manuscript.priority.to_db_str(),
                        "to": derived.to_db_str(),
                        "reasons": reasons,
                    })),
            )?;
            debug!(from = %manuscript.priority, to = %derived, "优先级缓存已刷新");
        }

        Ok(derived)
    }

    // ==========================================
    // 活动查询
    // ==========================================

    /// 查询稿件的活动历史 (新到旧)
    pub fn list_activity(&self, manuscript_id: &str) -> ApiResult<Vec<ActivityLog>> {
        if manuscript_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("稿件ID不能为空".to_string()));
        }
        Ok(self.activity_log_repo.find_by_manuscript(manuscript_id)?)
    }

    /// 查询全局最近活动
    pub fn recent_activity(&self, limit: i64) -> ApiResult<Vec<ActivityLog>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "limit 必须为正数: {}",
                limit
            )));
        }
        Ok(self.activity_log_repo.find_recent(limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::manuscript::Manuscript;
    use crate::domain::reviewer::{AdvisoryLink, ReviewerProfile};
    use crate::domain::types::ManuscriptStatus;
    use crate::domain::workload::WorkloadSettings;
    use crate::repository::{ReviewerRepository, WorkloadRepository};
    use chrono::Duration;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct TestEnv {
        manuscript_repo: Arc<ManuscriptRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        workload_repo: Arc<WorkloadRepository>,
        activity_log_repo: Arc<ActivityLogRepository>,
        api: ReviewApi,
    }

    fn setup() -> TestEnv {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));

        let manuscript_repo = Arc::new(ManuscriptRepository::from_connection(shared.clone()));
        let reviewer_repo = Arc::new(ReviewerRepository::from_connection(shared.clone()));
        let workload_repo = Arc::new(WorkloadRepository::from_connection(shared.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::from_connection(shared.clone()));
        let activity_log_repo = Arc::new(ActivityLogRepository::from_connection(shared.clone()));
        let config = Arc::new(ConfigManager::from_connection(shared).unwrap());

        let orchestrator = Arc::new(AssignmentOrchestrator::new(
            manuscript_repo.clone(),
            reviewer_repo.clone(),
            workload_repo.clone(),
            assignment_repo.clone(),
            activity_log_repo.clone(),
            config.clone(),
        ));
        let ranker = Arc::new(CandidateRanker::new(
            reviewer_repo.clone(),
            workload_repo.clone(),
            config,
        ));

        let api = ReviewApi::new(
            manuscript_repo.clone(),
            assignment_repo,
            activity_log_repo.clone(),
            orchestrator,
            ranker,
            Arc::new(PriorityEngine::new()),
        );

        TestEnv {
            manuscript_repo,
            reviewer_repo,
            workload_repo,
            activity_log_repo,
            api,
        }
    }

    fn seed_basic(env: &TestEnv) {
        let m = Manuscript::new(
            "M001".to_string(),
            "稀土掺杂光纤研究".to_string(),
            "photonics".to_string(),
            "A1".to_string(),
        );
        env.manuscript_repo.upsert(&m).unwrap();

        let p = ReviewerProfile::new("R1".to_string(), "评审人一号".to_string());
        env.reviewer_repo.upsert_profile(&p).unwrap();
        env.workload_repo
            .upsert_settings(&WorkloadSettings::new("R1".to_string(), 5))
            .unwrap();
    }

    fn due() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(21)
    }

    // ==========================================
    // 测试 1: 错误映射
    // ==========================================

    #[tokio::test]
    async fn test_invite_conflict_blocked_error() {
        let env = setup();
        seed_basic(&env);
        env.reviewer_repo
            .add_advisory_link(&AdvisoryLink {
                advisor_id: "R1".to_string(),
                advisee_id: "A1".to_string(),
            })
            .unwrap();

        let err = env
            .api
            .invite("M001", "R1", due(), false, None, "editor01")
            .await
            .unwrap_err();

        match err {
            ApiError::ConflictBlocked {
                reviewer_id,
                conflicts,
            } => {
                assert_eq!(reviewer_id, "R1");
                assert!(!conflicts.is_empty());
            }
            other => panic!("预期 ConflictBlocked,实际 {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invite_capacity_exceeded_error() {
        let env = setup();
        seed_basic(&env);
        let mut s = WorkloadSettings::new("R1".to_string(), 5);
        s.current_assignments = 5;
        env.workload_repo.upsert_settings(&s).unwrap();

        let err = env
            .api
            .invite("M001", "R1", due(), false, None, "editor01")
            .await
            .unwrap_err();

        match err {
            ApiError::CapacityExceeded {
                capacity, current, ..
            } => {
                assert_eq!(capacity, 5);
                assert_eq!(current, 5);
            }
            other => panic!("预期 CapacityExceeded,实际 {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rank_unknown_manuscript_not_found() {
        let env = setup();
        let err = env
            .api
            .rank_candidates("M_GHOST", vec!["R1".to_string()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ==========================================
    // 测试 2: 邀审成功路径与查询
    // ==========================================

    #[tokio::test]
    async fn test_invite_then_accept_flow() {
        let env = setup();
        seed_basic(&env);

        let a = env
            .api
            .invite("M001", "R1", due(), false, None, "editor01")
            .await
            .unwrap();
        let accepted = env.api.accept(&a.assignment_id).unwrap();
        assert!(accepted.responded_at.is_some());

        let assignments = env.api.list_assignments("M001").unwrap();
        assert_eq!(assignments.len(), 1);

        let logs = env.api.list_activity("M001").unwrap();
        assert!(logs.len() >= 2);
    }

    // ==========================================
    // 测试 3: 优先级刷新
    // ==========================================

    #[tokio::test]
    async fn test_compute_priority_refreshes_cache() {
        let env = setup();
        let now = Utc::now();
        let mut m = Manuscript::new(
            "M002".to_string(),
            "超导量子比特综述".to_string(),
            "physics".to_string(),
            "A1".to_string(),
        );
        m.status = ManuscriptStatus::AwaitingDecision;
        m.submitted_at = now - Duration::days(50);
        m.created_at = m.submitted_at;
        m.updated_at = now - Duration::days(10);
        env.manuscript_repo.upsert(&m).unwrap();

        let priority = env.api.compute_priority("M002", now).unwrap();
        assert_eq!(priority, Priority::Urgent);

        // 缓存列已刷新
        let stored = env.manuscript_repo.find_by_id("M002").unwrap().unwrap();
        assert_eq!(stored.priority, Priority::Urgent);

        // 留痕
        let logs = env.activity_log_repo.find_by_manuscript("M002").unwrap();
        assert!(logs
            .iter()
            .any(|l| l.activity_type == ActivityType::PriorityRefreshed));

        // 再次计算无变化,不重复留痕
        env.api.compute_priority("M002", now).unwrap();
        let logs_after = env.activity_log_repo.find_by_manuscript("M002").unwrap();
        assert_eq!(logs.len(), logs_after.len());
    }

    #[tokio::test]
    async fn test_lifecycle_transition_refreshes_priority_cache() {
        let env = setup();
        seed_basic(&env);
        let now = Utc::now();
        let mut m = Manuscript::new(
            "M003".to_string(),
            "拓扑绝缘体输运实验".to_string(),
            "photonics".to_string(),
            "A9".to_string(),
        );
        m.status = ManuscriptStatus::InReview;
        m.submitted_at = now - Duration::days(50);
        m.created_at = m.submitted_at;
        env.manuscript_repo.upsert(&m).unwrap();

        // 邀审落库后缓存立即反映 IN_REVIEW 停留超限
        env.api
            .invite("M003", "R1", due(), false, None, "editor01")
            .await
            .unwrap();
        let stored = env.manuscript_repo.find_by_id("M003").unwrap().unwrap();
        assert_eq!(stored.priority, Priority::High);
    }

    // ==========================================
    // 测试 4: 输入校验
    // ==========================================

    #[tokio::test]
    async fn test_input_validation() {
        let env = setup();

        let err = env
            .api
            .rank_candidates("  ", vec![], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = env.api.decline("AS001", "   ").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = env.api.recent_activity(0).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
