// ==========================================
// 同行评审分配系统 - 评审任务领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 7. Assignment Lifecycle
// 红线: 状态机单向,非法边必须拒绝
// 状态机: INVITED -> {ACCEPTED, DECLINED, EXPIRED}, ACCEPTED -> {COMPLETED}
// ==========================================

use crate::domain::types::AssignmentStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 评审任务 (Review Assignment)
///
/// 对应数据库 review_assignment 表。同一 (稿件, 评审人) 组合
/// 每轮邀审一条记录;拒审/过期后可另起新记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAssignment {
    // ===== 主键与关联 =====
    pub assignment_id: String,
    pub manuscript_id: String,
    pub reviewer_id: String,

    // ===== 状态 =====
    pub status: AssignmentStatus,

    // ===== 时间线 =====
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub due_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,

    // ===== 拒审与覆写 =====
    pub decline_reason: Option<String>,
    pub capacity_override: bool,        // 本次邀审是否容量覆写
    pub override_reason: Option<String>, // 覆写原因,覆写时必填

    // ===== 元数据 =====
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ReviewAssignment {
    /// 创建新邀审记录 (INVITED 态,id 自动生成)
    pub fn new(manuscript_id: String, reviewer_id: String, due_date: NaiveDate) -> Self {
        ReviewAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            manuscript_id,
            reviewer_id,
            status: AssignmentStatus::Invited,
            invited_at: Utc::now(),
            responded_at: None,
            due_date,
            completed_at: None,
            decline_reason: None,
            capacity_override: false,
            override_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// 是否已逾期 (仍为 INVITED 且截止日早于今天)
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == AssignmentStatus::Invited && self.due_date < today
    }
}

/// 状态机合法边判定
///
/// # 规则
/// - INVITED -> ACCEPTED | DECLINED | EXPIRED
/// - ACCEPTED -> COMPLETED
/// - 其余一律非法(同态重放由编排器按幂等处理,不走本表)
pub fn can_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
    matches!(
        (from, to),
        (AssignmentStatus::Invited, AssignmentStatus::Accepted)
            | (AssignmentStatus::Invited, AssignmentStatus::Declined)
            | (AssignmentStatus::Invited, AssignmentStatus::Expired)
            | (AssignmentStatus::Accepted, AssignmentStatus::Completed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_legal_transitions() {
        assert!(can_transition(AssignmentStatus::Invited, AssignmentStatus::Accepted));
        assert!(can_transition(AssignmentStatus::Invited, AssignmentStatus::Declined));
        assert!(can_transition(AssignmentStatus::Invited, AssignmentStatus::Expired));
        assert!(can_transition(AssignmentStatus::Accepted, AssignmentStatus::Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        // 终态无出边
        assert!(!can_transition(AssignmentStatus::Declined, AssignmentStatus::Accepted));
        assert!(!can_transition(AssignmentStatus::Completed, AssignmentStatus::Invited));
        assert!(!can_transition(AssignmentStatus::Expired, AssignmentStatus::Accepted));
        // 跳级禁止
        assert!(!can_transition(AssignmentStatus::Invited, AssignmentStatus::Completed));
        // ACCEPTED 不可再拒
        assert!(!can_transition(AssignmentStatus::Accepted, AssignmentStatus::Declined));
        assert!(!can_transition(AssignmentStatus::Accepted, AssignmentStatus::Expired));
    }

    #[test]
    fn test_new_assignment_defaults() {
        let a = ReviewAssignment::new("M1".to_string(), "R1".to_string(), date(2026, 9, 15));
        assert_eq!(a.status, AssignmentStatus::Invited);
        assert!(!a.capacity_override);
        assert!(a.responded_at.is_none());
        assert!(!a.assignment_id.is_empty());
    }

    #[test]
    fn test_overdue_only_when_invited() {
        let mut a = ReviewAssignment::new("M1".to_string(), "R1".to_string(), date(2026, 8, 1));
        let today = date(2026, 8, 25);
        assert!(a.is_overdue(today));
        a.status = AssignmentStatus::Accepted;
        assert!(!a.is_overdue(today));
    }

    #[test]
    fn test_due_today_not_overdue() {
        let a = ReviewAssignment::new("M1".to_string(), "R1".to_string(), date(2026, 8, 25));
        assert!(!a.is_overdue(date(2026, 8, 25)));
    }
}
