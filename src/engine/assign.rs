// ==========================================
// 同行评审分配系统 - 任务编排器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 7. Assignment Orchestrator
// 职责: 邀审全流程 + 状态机执行 + 审计留痕
// 红线: BLOCKING 冲突一律拒绝,无覆写路径
// 红线: 自动拒审不占容量; 容量覆写必须附原因并留痕
// 红线: 同态重放幂等返回,非法边一律拒绝
// ==========================================

use crate::config::AssignConfigReader;
use crate::domain::activity_log::{ActivityLog, ActivityType};
use crate::domain::assignment::{can_transition, ReviewAssignment};
use crate::domain::conflict::ConflictEvidence;
use crate::domain::types::AssignmentStatus;
use crate::engine::{ConflictEngine, WorkloadTracker};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    ActivityLogRepository, AssignmentRepository, ManuscriptRepository, ReviewerRepository,
    WorkloadRepository,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// InviteOutcome - 邀审结果
// ==========================================
/// 业务性拒绝作为结果而非错误返回,由 API 层决定对外形态
#[derive(Debug)]
pub enum InviteOutcome {
    /// 邀审创建成功 (INVITED)
    Invited(ReviewAssignment),
    /// 规则命中,直接以 DECLINED 落库,容量未预留
    AutoDeclined(ReviewAssignment),
    /// 存在 BLOCKING 冲突,未创建任务
    ConflictBlocked(Vec<ConflictEvidence>),
    /// 容量已满且未覆写,未创建任务
    CapacityExceeded {
        monthly_capacity: i32,
        current_assignments: i32,
    },
}

// ==========================================
// AssignmentOrchestrator - 任务编排器
// ==========================================
pub struct AssignmentOrchestrator<C>
where
    C: AssignConfigReader,
{
    manuscript_repo: Arc<ManuscriptRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    activity_log_repo: Arc<ActivityLogRepository>,
    conflict_engine: ConflictEngine<C>,
    workload_tracker: WorkloadTracker,
}

impl<C> AssignmentOrchestrator<C>
where
    C: AssignConfigReader,
{
    /// 创建新的编排器实例
    ///
    /// # 参数
    /// - manuscript_repo: 稿件仓库
    /// - reviewer_repo: 评审人关系数据仓库 (冲突引擎用)
    /// - workload_repo: 负载设置仓库
    /// - assignment_repo: 评审任务仓库
    /// - activity_log_repo: 活动日志仓库
    /// - config: 配置读取器
    pub fn new(
        manuscript_repo: Arc<ManuscriptRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        workload_repo: Arc<WorkloadRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        activity_log_repo: Arc<ActivityLogRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            manuscript_repo,
            assignment_repo,
            activity_log_repo,
            conflict_engine: ConflictEngine::new(reviewer_repo, config),
            workload_tracker: WorkloadTracker::new(workload_repo),
        }
    }

    // ==========================================
    // 邀审主流程
    // ==========================================

    /// 发起邀审
    ///
    /// # 流程 (Review_Engine_Specs 7.2)
    /// 1. 稿件存在性与覆写参数校验
    /// 2. 同 (稿件, 评审人) 在途邀约查重
    /// 3. 冲突评估: BLOCKING → 拒绝,不创建任务
    /// 4. 自动拒审评估: 命中 → 直接 DECLINED 落库,不占容量
    /// 5. 容量预留: 满且未覆写 → 拒绝; 覆写必达并留痕
    /// 6. INVITED 落库 + 活动日志
    ///
    /// # 参数
    /// - override_capacity: 容量覆写标志,须同时提供原因
    /// - operator: 发起邀审的编辑工号
    /// - today: 当前日期 (时效窗口与截止天数计算基准)
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, override_reason), fields(manuscript_id = %manuscript_id, reviewer_id = %reviewer_id, due_date = %due_date))]
    pub async fn invite(
        &self,
        manuscript_id: &str,
        reviewer_id: &str,
        due_date: NaiveDate,
        override_capacity: bool,
        override_reason: Option<String>,
        operator: &str,
        today: NaiveDate,
    ) -> Result<InviteOutcome, Box<dyn Error>> {
        // === 步骤 1: 校验 ===
        let manuscript = self
            .manuscript_repo
            .find_by_id(manuscript_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "manuscript".to_string(),
                id: manuscript_id.to_string(),
            })?;

        if override_capacity
            && override_reason
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
        {
            return Err(Box::new(RepositoryError::ValidationError(
                "容量覆写必须填写原因".to_string(),
            )));
        }

        // === 步骤 2: 在途邀约查重 ===
        if let Some(open) = self
            .assignment_repo
            .find_open_by_pair(manuscript_id, reviewer_id)?
        {
            return Err(Box::new(RepositoryError::ValidationError(format!(
                "该稿件与评审人已存在在途邀约: {}",
                open.assignment_id
            ))));
        }

        // === 步骤 3: 冲突评估 ===
        let (eligible, evidences) = self
            .conflict_engine
            .check_eligibility(reviewer_id, &manuscript, today)
            .await?;
        if !eligible {
            info!(
                evidence_count = evidences.len(),
                "存在阻断级冲突,邀审拒绝"
            );
            return Ok(InviteOutcome::ConflictBlocked(evidences));
        }

        // === 步骤 4: 自动拒审评估 ===
        let (auto_declined, rule_reasons) =
            self.workload_tracker
                .evaluate_auto_decline(reviewer_id, due_date, today)?;
        if auto_declined {
            let mut assignment = ReviewAssignment::new(
                manuscript_id.to_string(),
                reviewer_id.to_string(),
                due_date,
            );
            assignment.status = AssignmentStatus::Declined;
            assignment.responded_at = Some(Utc::now());
            assignment.decline_reason = Some("auto_declined".to_string());
            self.assignment_repo.insert(&assignment)?;

            self.activity_log_repo.insert(
                &ActivityLog::new(ActivityType::InviteAutoDeclined)
                    .with_manuscript(manuscript_id)
                    .with_reviewer(reviewer_id)
                    .with_assignment(&assignment.assignment_id)
                    .with_detail(&json!({ "rules": rule_reasons })),
            )?;

            info!(rules = ?rule_reasons, "自动拒审命中");
            return Ok(InviteOutcome::AutoDeclined(assignment));
        }

        // === 步骤 5: 容量预留 ===
        let reserved = self.workload_tracker.reserve(
            reviewer_id,
            override_capacity,
            override_reason.as_deref(),
        )?;
        if !reserved {
            let settings = self.workload_tracker.get_settings(reviewer_id)?;
            return Ok(InviteOutcome::CapacityExceeded {
                monthly_capacity: settings.monthly_capacity,
                current_assignments: settings.current_assignments,
            });
        }

        // === 步骤 6: INVITED 落库 + 留痕 ===
        let mut assignment = ReviewAssignment::new(
            manuscript_id.to_string(),
            reviewer_id.to_string(),
            due_date,
        );
        assignment.capacity_override = override_capacity;
        assignment.override_reason = override_reason.clone();

        // 插入失败须回滚预留,容量计数不得与在途任务脱钩
        if let Err(e) = self.assignment_repo.insert(&assignment) {
            let _ = self.workload_tracker.release(reviewer_id);
            return Err(Box::new(e));
        }

        self.activity_log_repo.insert(
            &ActivityLog::new(ActivityType::InviteCreated)
                .with_manuscript(manuscript_id)
                .with_reviewer(reviewer_id)
                .with_assignment(&assignment.assignment_id)
                .with_operator(operator)
                .with_detail(&json!({ "due_date": due_date.to_string() })),
        )?;

        if override_capacity {
            self.activity_log_repo.insert(
                &ActivityLog::new(ActivityType::CapacityOverride)
                    .with_manuscript(manuscript_id)
                    .with_reviewer(reviewer_id)
                    .with_assignment(&assignment.assignment_id)
                    .with_operator(operator)
                    .with_detail(&json!({
                        "reason": override_reason.as_deref().unwrap_or_default()
                    })),
            )?;
        }

        info!(assignment_id = %assignment.assignment_id, "邀审创建成功");
        Ok(InviteOutcome::Invited(assignment))
    }

    // ==========================================
    // 状态机转换
    // ==========================================

    /// 评审人接受邀审 (INVITED -> ACCEPTED,容量保持占用)
    pub fn accept(&self, assignment_id: &str) -> RepositoryResult<ReviewAssignment> {
        let mut assignment = self.load(assignment_id)?;

        // 同态重放: 幂等返回现状
        if assignment.status == AssignmentStatus::Accepted {
            return Ok(assignment);
        }
        Self::ensure_transition(assignment.status, AssignmentStatus::Accepted)?;

        assignment.status = AssignmentStatus::Accepted;
        assignment.responded_at = Some(Utc::now());
        self.assignment_repo.update(&assignment)?;

        self.activity_log_repo.insert(
            &ActivityLog::new(ActivityType::InviteAccepted)
                .with_manuscript(&assignment.manuscript_id)
                .with_reviewer(&assignment.reviewer_id)
                .with_assignment(assignment_id)
                .with_operator(&assignment.reviewer_id),
        )?;

        Ok(assignment)
    }

    /// 评审人拒审 (INVITED -> DECLINED,释放容量)
    pub fn decline(&self, assignment_id: &str, reason: &str) -> RepositoryResult<ReviewAssignment> {
        let mut assignment = self.load(assignment_id)?;

        if assignment.status == AssignmentStatus::Declined {
            return Ok(assignment);
        }
        Self::ensure_transition(assignment.status, AssignmentStatus::Declined)?;

        assignment.status = AssignmentStatus::Declined;
        assignment.responded_at = Some(Utc::now());
        assignment.decline_reason = Some(reason.to_string());
        self.assignment_repo.update(&assignment)?;
        self.workload_tracker.release(&assignment.reviewer_id)?;

        self.activity_log_repo.insert(
            &ActivityLog::new(ActivityType::InviteDeclined)
                .with_manuscript(&assignment.manuscript_id)
                .with_reviewer(&assignment.reviewer_id)
                .with_assignment(assignment_id)
                .with_operator(&assignment.reviewer_id)
                .with_detail(&json!({ "reason": reason })),
        )?;

        Ok(assignment)
    }

    /// 评审完成 (ACCEPTED -> COMPLETED,释放容量)
    pub fn complete(&self, assignment_id: &str) -> RepositoryResult<ReviewAssignment> {
        let mut assignment = self.load(assignment_id)?;

        if assignment.status == AssignmentStatus::Completed {
            return Ok(assignment);
        }
        Self::ensure_transition(assignment.status, AssignmentStatus::Completed)?;

        assignment.status = AssignmentStatus::Completed;
        assignment.completed_at = Some(Utc::now());
        self.assignment_repo.update(&assignment)?;
        self.workload_tracker.release(&assignment.reviewer_id)?;

        self.activity_log_repo.insert(
            &ActivityLog::new(ActivityType::ReviewCompleted)
                .with_manuscript(&assignment.manuscript_id)
                .with_reviewer(&assignment.reviewer_id)
                .with_assignment(assignment_id)
                .with_operator(&assignment.reviewer_id),
        )?;

        Ok(assignment)
    }

    /// 批量过期清扫 (INVITED 且 due_date < today -> EXPIRED,释放容量)
    ///
    /// 由外部调度器周期触发
    ///
    /// # 返回
    /// - Vec<ReviewAssignment>: 本次被置为过期的任务
    #[instrument(skip(self), fields(today = %today))]
    pub fn expire_overdue(&self, today: NaiveDate) -> RepositoryResult<Vec<ReviewAssignment>> {
        let overdue = self.assignment_repo.find_overdue_invited(today)?;
        let mut expired = Vec::with_capacity(overdue.len());

        for mut assignment in overdue {
            assignment.status = AssignmentStatus::Expired;
            self.assignment_repo.update(&assignment)?;
            self.workload_tracker.release(&assignment.reviewer_id)?;

            self.activity_log_repo.insert(
                &ActivityLog::new(ActivityType::InviteExpired)
                    .with_manuscript(&assignment.manuscript_id)
                    .with_reviewer(&assignment.reviewer_id)
                    .with_assignment(&assignment.assignment_id)
                    .with_detail(&json!({ "due_date": assignment.due_date.to_string() })),
            )?;

            expired.push(assignment);
        }

        info!(expired_count = expired.len(), "过期清扫完成");
        Ok(expired)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load(&self, assignment_id: &str) -> RepositoryResult<ReviewAssignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "review_assignment".to_string(),
                id: assignment_id.to_string(),
            })
    }

    fn ensure_transition(
        from: AssignmentStatus,
        to: AssignmentStatus,
    ) -> RepositoryResult<()> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(RepositoryError::InvalidStateTransition {
                from: from.to_db_str().to_string(),
                to: to.to_db_str().to_string(),
            })
        }
    }
}
