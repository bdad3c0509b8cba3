// ==========================================
// 同行评审分配系统 - 负载跟踪器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 4. Workload Tracker
// 职责: 容量、屏蔽日历、自动拒审的唯一事实来源
// 红线: 预留必须原子化 (单条条件 UPDATE),禁止读改写
// 红线: WorkloadSettings 只经本组件修改
// ==========================================

use crate::domain::types::AvailabilityStatus;
use crate::domain::workload::{
    AutoDeclineRule, BlackoutRange, WorkloadSettings, WorkloadSnapshot,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::WorkloadRepository;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// WorkloadTracker - 负载跟踪器
// ==========================================
pub struct WorkloadTracker {
    workload_repo: Arc<WorkloadRepository>,
}

impl WorkloadTracker {
    pub fn new(workload_repo: Arc<WorkloadRepository>) -> Self {
        Self { workload_repo }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询负载设置,缺失返回 None
    pub fn find_settings(&self, reviewer_id: &str) -> RepositoryResult<Option<WorkloadSettings>> {
        self.workload_repo.find_by_reviewer(reviewer_id)
    }

    /// 查询负载设置,缺失视为 NotFound
    pub fn get_settings(&self, reviewer_id: &str) -> RepositoryResult<WorkloadSettings> {
        self.workload_repo
            .find_by_reviewer(reviewer_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "workload_settings".to_string(),
                id: reviewer_id.to_string(),
            })
    }

    /// 剩余容量 = monthly_capacity - current_assignments
    ///
    /// 覆写预留后可短暂为负
    pub fn capacity_remaining(&self, reviewer_id: &str) -> RepositoryResult<i32> {
        Ok(self.get_settings(reviewer_id)?.capacity_remaining())
    }

    /// 日期是否落入该评审人任一屏蔽区间 ([start, end) 语义)
    pub fn is_blacked_out(&self, reviewer_id: &str, date: NaiveDate) -> RepositoryResult<bool> {
        Ok(self.get_settings(reviewer_id)?.is_blacked_out(date))
    }

    /// 评估自动拒审规则
    ///
    /// # 规则 (Review_Engine_Specs 4.3)
    /// - workload_percentage = current/capacity*100
    /// - days_to_deadline = proposed_due_date - today
    /// - 规则间 OR,规则内已配置条件 AND
    /// - 未配置设置的评审人无规则,恒不拒审
    ///
    /// # 返回
    /// - (bool, Vec<String>): 是否自动拒审 + 命中原因
    pub fn evaluate_auto_decline(
        &self,
        reviewer_id: &str,
        proposed_due_date: NaiveDate,
        today: NaiveDate,
    ) -> RepositoryResult<(bool, Vec<String>)> {
        match self.find_settings(reviewer_id)? {
            Some(settings) => Ok(settings.evaluate_auto_decline(proposed_due_date, today)),
            None => Ok((false, Vec::new())),
        }
    }

    /// 组装负载快照 (候选排序结果附带的只读视图)
    ///
    /// # 参数
    /// - availability: 来自评审人档案的可用状态
    /// - proposed_due_date: 按稿件首选周期推算的截止日,用于屏蔽期重叠判断
    ///
    /// # 说明
    /// 未配置负载设置的候选按零容量快照返回,不中断整体排序
    pub fn snapshot(
        &self,
        reviewer_id: &str,
        availability: AvailabilityStatus,
        proposed_due_date: NaiveDate,
    ) -> RepositoryResult<WorkloadSnapshot> {
        let snapshot = match self.find_settings(reviewer_id)? {
            Some(s) => WorkloadSnapshot {
                reviewer_id: s.reviewer_id.clone(),
                monthly_capacity: s.monthly_capacity,
                current_assignments: s.current_assignments,
                capacity_remaining: s.capacity_remaining(),
                availability,
                blackout_overlap: s.is_blacked_out(proposed_due_date),
            },
            None => WorkloadSnapshot {
                reviewer_id: reviewer_id.to_string(),
                monthly_capacity: 0,
                current_assignments: 0,
                capacity_remaining: 0,
                availability,
                blackout_overlap: false,
            },
        };
        Ok(snapshot)
    }

    // ==========================================
    // 容量预留与释放
    // ==========================================

    /// 预留一个容量槽位
    ///
    /// # 规则 (Review_Engine_Specs 4.3 / 5)
    /// - 常规路径: 单条条件 UPDATE 原子判定 current < capacity,
    ///   并发场景下最后一个槽位只会被一个调用者拿到
    /// - 覆写路径: 无条件 +1,必达,原因记入日志
    ///
    /// # 返回
    /// - Ok(true): 已预留 (含覆写)
    /// - Ok(false): 容量已满且未覆写
    #[instrument(skip(self), fields(reviewer_id = %reviewer_id, override_flag = override_flag))]
    pub fn reserve(
        &self,
        reviewer_id: &str,
        override_flag: bool,
        override_reason: Option<&str>,
    ) -> RepositoryResult<bool> {
        if override_flag {
            self.workload_repo.force_reserve(reviewer_id)?;
            warn!(
                reviewer_id = %reviewer_id,
                reason = override_reason.unwrap_or("<未填写>"),
                "容量覆写预留"
            );
            return Ok(true);
        }

        let reserved = self.workload_repo.try_reserve(reviewer_id)?;
        if !reserved {
            info!(reviewer_id = %reviewer_id, "容量已满,预留失败");
        }
        Ok(reserved)
    }

    /// 释放一个容量槽位 (下限 0)
    ///
    /// 拒审、超时、完成评审时调用
    pub fn release(&self, reviewer_id: &str) -> RepositoryResult<()> {
        self.workload_repo.release(reviewer_id)
    }

    // ==========================================
    // 设置维护 (唯一修改路径)
    // ==========================================

    /// 初始化或整体覆盖负载设置 (新评审人建档用)
    pub fn save_settings(&self, settings: &WorkloadSettings) -> RepositoryResult<()> {
        if settings.monthly_capacity <= 0 {
            return Err(RepositoryError::ValidationError(format!(
                "monthly_capacity 必须为正数: {}",
                settings.monthly_capacity
            )));
        }
        self.workload_repo.upsert_settings(settings)
    }

    /// 乐观锁更新设置
    ///
    /// # 参数
    /// - expected_revision: 调用方读取时的版本号
    ///
    /// # 返回
    /// - Ok(i32): 新版本号
    /// - Err(OptimisticLockFailure): 版本不一致,调用方须重读后重试
    pub fn update_settings(
        &self,
        settings: &WorkloadSettings,
        expected_revision: i32,
    ) -> RepositoryResult<i32> {
        if settings.monthly_capacity <= 0 {
            return Err(RepositoryError::ValidationError(format!(
                "monthly_capacity 必须为正数: {}",
                settings.monthly_capacity
            )));
        }
        self.workload_repo
            .update_settings_versioned(settings, expected_revision)
    }

    /// 新增或替换自动拒审规则 (按 rule_id 匹配)
    pub fn upsert_rule(&self, reviewer_id: &str, rule: AutoDeclineRule) -> RepositoryResult<i32> {
        let mut settings = self.get_settings(reviewer_id)?;
        let revision = settings.revision;
        match settings
            .auto_decline_rules
            .iter_mut()
            .find(|r| r.rule_id == rule.rule_id)
        {
            Some(existing) => *existing = rule,
            None => settings.auto_decline_rules.push(rule),
        }
        self.workload_repo
            .update_settings_versioned(&settings, revision)
    }

    /// 移除自动拒审规则,不存在视为 NotFound
    pub fn remove_rule(&self, reviewer_id: &str, rule_id: &str) -> RepositoryResult<i32> {
        let mut settings = self.get_settings(reviewer_id)?;
        let revision = settings.revision;
        let before = settings.auto_decline_rules.len();
        settings.auto_decline_rules.retain(|r| r.rule_id != rule_id);
        if settings.auto_decline_rules.len() == before {
            return Err(RepositoryError::NotFound {
                entity: "auto_decline_rule".to_string(),
                id: rule_id.to_string(),
            });
        }
        self.workload_repo
            .update_settings_versioned(&settings, revision)
    }

    /// 新增屏蔽区间 (须 start < end)
    pub fn add_blackout(&self, reviewer_id: &str, range: BlackoutRange) -> RepositoryResult<i32> {
        if range.start >= range.end {
            return Err(RepositoryError::ValidationError(format!(
                "屏蔽区间非法: start={} end={}",
                range.start, range.end
            )));
        }
        let mut settings = self.get_settings(reviewer_id)?;
        let revision = settings.revision;
        if !settings.blackout_ranges.contains(&range) {
            settings.blackout_ranges.push(range);
        }
        self.workload_repo
            .update_settings_versioned(&settings, revision)
    }

    /// 移除屏蔽区间 (精确匹配),不存在视为 NotFound
    pub fn remove_blackout(
        &self,
        reviewer_id: &str,
        range: &BlackoutRange,
    ) -> RepositoryResult<i32> {
        let mut settings = self.get_settings(reviewer_id)?;
        let revision = settings.revision;
        let before = settings.blackout_ranges.len();
        settings.blackout_ranges.retain(|r| r != range);
        if settings.blackout_ranges.len() == before {
            return Err(RepositoryError::NotFound {
                entity: "blackout_range".to_string(),
                id: format!("{}..{}", range.start, range.end),
            });
        }
        self.workload_repo
            .update_settings_versioned(&settings, revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup_tracker() -> WorkloadTracker {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = Arc::new(WorkloadRepository::from_connection(Arc::new(Mutex::new(
            conn,
        ))));
        WorkloadTracker::new(repo)
    }

    fn seed(tracker: &WorkloadTracker, reviewer_id: &str, capacity: i32, current: i32) {
        let mut s = WorkloadSettings::new(reviewer_id.to_string(), capacity);
        s.current_assignments = current;
        tracker.save_settings(&s).unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==========================================
    // 测试 1: 容量查询与预留
    // ==========================================

    #[test]
    fn test_capacity_remaining() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 5, 3);

        assert_eq!(tracker.capacity_remaining("R1").unwrap(), 2);
    }

    #[test]
    fn test_reserve_until_full() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 2, 0);

        assert!(tracker.reserve("R1", false, None).unwrap());
        assert!(tracker.reserve("R1", false, None).unwrap());
        // 容量满,常规预留失败
        assert!(!tracker.reserve("R1", false, None).unwrap());
        assert_eq!(tracker.capacity_remaining("R1").unwrap(), 0);
    }

    #[test]
    fn test_reserve_override_goes_negative() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 2, 2);

        assert!(tracker.reserve("R1", true, Some("主编特批")).unwrap());
        assert_eq!(tracker.capacity_remaining("R1").unwrap(), -1);
    }

    #[test]
    fn test_reserve_unknown_reviewer_not_found() {
        let tracker = setup_tracker();
        let err = tracker.reserve("R_MISSING", false, None).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_release_floor_zero() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 3, 1);

        tracker.release("R1").unwrap();
        tracker.release("R1").unwrap(); // 已为 0,不下穿
        assert_eq!(tracker.capacity_remaining("R1").unwrap(), 3);
    }

    // ==========================================
    // 测试 2: 屏蔽日历
    // ==========================================

    #[test]
    fn test_is_blacked_out_half_open() {
        let tracker = setup_tracker();
        let mut s = WorkloadSettings::new("R1".to_string(), 5);
        s.blackout_ranges
            .push(BlackoutRange::new(date(2026, 9, 1), date(2026, 9, 15)));
        tracker.save_settings(&s).unwrap();

        assert!(tracker.is_blacked_out("R1", date(2026, 9, 1)).unwrap());
        assert!(tracker.is_blacked_out("R1", date(2026, 9, 14)).unwrap());
        // end 当天恢复
        assert!(!tracker.is_blacked_out("R1", date(2026, 9, 15)).unwrap());
        assert!(!tracker.is_blacked_out("R1", date(2026, 8, 31)).unwrap());
    }

    // ==========================================
    // 测试 3: 自动拒审评估
    // ==========================================

    #[test]
    fn test_auto_decline_workload_rule() {
        let tracker = setup_tracker();
        let mut s = WorkloadSettings::new("R1".to_string(), 20);
        s.current_assignments = 17; // 85%
        s.auto_decline_rules.push(AutoDeclineRule {
            rule_id: "rule-80".to_string(),
            name: "高负载保护".to_string(),
            enabled: true,
            max_workload_percentage: Some(80.0),
            min_days_to_deadline: None,
        });
        tracker.save_settings(&s).unwrap();

        let (declined, reasons) = tracker
            .evaluate_auto_decline("R1", date(2026, 9, 30), date(2026, 8, 25))
            .unwrap();
        assert!(declined);
        assert_eq!(reasons.len(), 1);
    }

    #[test]
    fn test_auto_decline_without_settings_never_fires() {
        let tracker = setup_tracker();
        let (declined, reasons) = tracker
            .evaluate_auto_decline("R_MISSING", date(2026, 9, 30), date(2026, 8, 25))
            .unwrap();
        assert!(!declined);
        assert!(reasons.is_empty());
    }

    // ==========================================
    // 测试 4: 快照
    // ==========================================

    #[test]
    fn test_snapshot_with_blackout_overlap() {
        let tracker = setup_tracker();
        let mut s = WorkloadSettings::new("R1".to_string(), 5);
        s.current_assignments = 2;
        s.blackout_ranges
            .push(BlackoutRange::new(date(2026, 9, 10), date(2026, 9, 20)));
        tracker.save_settings(&s).unwrap();

        let snap = tracker
            .snapshot("R1", AvailabilityStatus::Busy, date(2026, 9, 12))
            .unwrap();
        assert_eq!(snap.capacity_remaining, 3);
        assert!(snap.blackout_overlap);
        assert_eq!(snap.availability, AvailabilityStatus::Busy);
    }

    #[test]
    fn test_snapshot_missing_settings_zero_capacity() {
        let tracker = setup_tracker();
        let snap = tracker
            .snapshot("R_NEW", AvailabilityStatus::Available, date(2026, 9, 12))
            .unwrap();
        assert_eq!(snap.monthly_capacity, 0);
        assert_eq!(snap.capacity_remaining, 0);
        assert!(!snap.blackout_overlap);
    }

    // ==========================================
    // 测试 5: 设置维护与乐观锁
    // ==========================================

    #[test]
    fn test_update_settings_optimistic_lock() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 5, 0);

        let mut settings = tracker.get_settings("R1").unwrap();
        settings.monthly_capacity = 8;
        let new_rev = tracker.update_settings(&settings, settings.revision).unwrap();
        assert_eq!(new_rev, settings.revision + 1);

        // 旧版本号再次提交: 乐观锁冲突
        let err = tracker
            .update_settings(&settings, settings.revision)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
    }

    #[test]
    fn test_save_settings_rejects_non_positive_capacity() {
        let tracker = setup_tracker();
        let s = WorkloadSettings::new("R1".to_string(), 0);
        let err = tracker.save_settings(&s).unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }

    #[test]
    fn test_upsert_and_remove_rule() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 5, 0);

        let rule = AutoDeclineRule {
            rule_id: "rule-1".to_string(),
            name: "截止过近".to_string(),
            enabled: true,
            max_workload_percentage: None,
            min_days_to_deadline: Some(7),
        };
        tracker.upsert_rule("R1", rule.clone()).unwrap();
        assert_eq!(tracker.get_settings("R1").unwrap().auto_decline_rules.len(), 1);

        // 同 rule_id 再次提交为替换
        let mut updated = rule.clone();
        updated.min_days_to_deadline = Some(10);
        tracker.upsert_rule("R1", updated).unwrap();
        let settings = tracker.get_settings("R1").unwrap();
        assert_eq!(settings.auto_decline_rules.len(), 1);
        assert_eq!(settings.auto_decline_rules[0].min_days_to_deadline, Some(10));

        tracker.remove_rule("R1", "rule-1").unwrap();
        assert!(tracker.get_settings("R1").unwrap().auto_decline_rules.is_empty());

        let err = tracker.remove_rule("R1", "rule-1").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_add_blackout_validates_range() {
        let tracker = setup_tracker();
        seed(&tracker, "R1", 5, 0);

        let err = tracker
            .add_blackout("R1", BlackoutRange::new(date(2026, 9, 20), date(2026, 9, 10)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));

        tracker
            .add_blackout("R1", BlackoutRange::new(date(2026, 9, 1), date(2026, 9, 5)))
            .unwrap();
        assert!(tracker.is_blacked_out("R1", date(2026, 9, 3)).unwrap());

        tracker
            .remove_blackout("R1", &BlackoutRange::new(date(2026, 9, 1), date(2026, 9, 5)))
            .unwrap();
        assert!(!tracker.is_blacked_out("R1", date(2026, 9, 3)).unwrap());
    }
}
