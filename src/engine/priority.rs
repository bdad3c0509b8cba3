// ==========================================
// 同行评审分配系统 - 稿件优先级计算器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 6. Priority Calculator
// 职责: 稿件 + 在途任务 → 优先级的纯推导
// 红线: 纯函数、无副作用; LOW 只能来自编辑覆写,
//       本计算器永不产出 LOW
// ==========================================

use crate::domain::assignment::ReviewAssignment;
use crate::domain::manuscript::Manuscript;
use crate::domain::types::{AssignmentStatus, ManuscriptStatus, Priority};
use chrono::{DateTime, Utc};

// ==========================================
// PriorityThresholds - 升级阈值
// ==========================================
/// 所有阈值为严格大于判定
#[derive(Debug, Clone)]
pub struct PriorityThresholds {
    pub urgent_revisions_updated_days: i64, // REVISIONS_REQUESTED 停更天数 → URGENT
    pub urgent_awaiting_created_days: i64,  // AWAITING_DECISION 存续天数 → URGENT
    pub high_revisions_updated_days: i64,   // REVISIONS_REQUESTED 停更天数 → HIGH
    pub high_awaiting_created_days: i64,    // AWAITING_DECISION 存续天数 → HIGH
    pub high_in_review_created_days: i64,   // IN_REVIEW 存续天数 → HIGH
    pub high_overdue_invited_count: usize,  // 逾期未响应邀约数 → HIGH
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        PriorityThresholds {
            urgent_revisions_updated_days: 60,
            urgent_awaiting_created_days: 45,
            high_revisions_updated_days: 45,
            high_awaiting_created_days: 30,
            high_in_review_created_days: 45,
            high_overdue_invited_count: 1,
        }
    }
}

// ==========================================
// PriorityEngine - 优先级计算器
// ==========================================
pub struct PriorityEngine {
    thresholds: PriorityThresholds,
}

impl PriorityEngine {
    /// 创建使用默认阈值的计算器
    pub fn new() -> Self {
        Self {
            thresholds: PriorityThresholds::default(),
        }
    }

    /// 创建使用自定义阈值的计算器 (测试与演练场景)
    pub fn with_thresholds(thresholds: PriorityThresholds) -> Self {
        Self { thresholds }
    }

    /// 推导稿件优先级
    ///
    /// # 规则 (Review_Engine_Specs 6.1)
    /// - days_since_created = now - max(submitted_at, created_at)
    /// - days_since_updated = now - updated_at
    /// - URGENT: REVISIONS_REQUESTED 且停更 >60 天,
    ///   或 AWAITING_DECISION 且存续 >45 天
    /// - HIGH: REVISIONS_REQUESTED 且停更 >45 天,
    ///   或 AWAITING_DECISION 且存续 >30 天,
    ///   或 IN_REVIEW 且存续 >45 天,
    ///   或逾期未响应的邀约多于 1 个
    /// - 其余 NORMAL (含新投稿)
    ///
    /// # 返回
    /// - (Priority, Vec<String>): 推导结果 + 命中原因
    pub fn derive(
        &self,
        manuscript: &Manuscript,
        assignments: &[ReviewAssignment],
        now: DateTime<Utc>,
    ) -> (Priority, Vec<String>) {
        let t = &self.thresholds;
        let days_created = manuscript.days_since_created(now);
        let days_updated = manuscript.days_since_updated(now);
        let today = now.date_naive();

        let overdue_invited = assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Invited && a.is_overdue(today))
            .count();

        let mut reasons = Vec::new();

        // === 级别 1: URGENT ===
        if manuscript.status == ManuscriptStatus::RevisionsRequested
            && days_updated > t.urgent_revisions_updated_days
        {
            reasons.push(format!(
                "URGENT: 返修状态已停更{}天 (>{}天)",
                days_updated, t.urgent_revisions_updated_days
            ));
        }
        if manuscript.status == ManuscriptStatus::AwaitingDecision
            && days_created > t.urgent_awaiting_created_days
        {
            reasons.push(format!(
                "URGENT: 待决议状态已存续{}天 (>{}天)",
                days_created, t.urgent_awaiting_created_days
            ));
        }
        if !reasons.is_empty() {
            return (Priority::Urgent, reasons);
        }

        // === 级别 2: HIGH ===
        if manuscript.status == ManuscriptStatus::RevisionsRequested
            && days_updated > t.high_revisions_updated_days
        {
            reasons.push(format!(
                "HIGH: 返修状态已停更{}天 (>{}天)",
                days_updated, t.high_revisions_updated_days
            ));
        }
        if manuscript.status == ManuscriptStatus::AwaitingDecision
            && days_created > t.high_awaiting_created_days
        {
            reasons.push(format!(
                "HIGH: 待决议状态已存续{}天 (>{}天)",
                days_created, t.high_awaiting_created_days
            ));
        }
        if manuscript.status == ManuscriptStatus::InReview
            && days_created > t.high_in_review_created_days
        {
            reasons.push(format!(
                "HIGH: 在审状态已存续{}天 (>{}天)",
                days_created, t.high_in_review_created_days
            ));
        }
        if overdue_invited > t.high_overdue_invited_count {
            reasons.push(format!(
                "HIGH: {}个邀约已逾期未响应 (>{}个)",
                overdue_invited, t.high_overdue_invited_count
            ));
        }
        if !reasons.is_empty() {
            return (Priority::High, reasons);
        }

        // === 级别 3: NORMAL (默认) ===
        reasons.push("NORMAL: 无升级条件命中".to_string());
        (Priority::Normal, reasons)
    }
}
