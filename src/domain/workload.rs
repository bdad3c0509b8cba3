// ==========================================
// 同行评审分配系统 - 负载设置领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 4. Workload Tracker
// 红线: current_assignments <= monthly_capacity (非覆写路径)
// 红线: 设置为版本化记录,只经 WorkloadTracker 修改
// ==========================================

use crate::domain::types::AvailabilityStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 屏蔽日期区间 (Blackout Range)
///
/// 左闭右开 [start, end): start 当天不可邀审,end 当天恢复。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BlackoutRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        BlackoutRange { start, end }
    }

    /// 日期是否落入区间 ([start, end) 语义)
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// 自动拒审规则 (Auto-Decline Rule)
///
/// 条件为显式可选字段;规则内已配置的条件取 AND,规则间取 OR。
/// 未配置任何条件的规则恒不命中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDeclineRule {
    pub rule_id: String,
    pub name: String,
    pub enabled: bool,
    pub max_workload_percentage: Option<f64>, // 负载百分比上限
    pub min_days_to_deadline: Option<i64>,    // 距截止最少天数
}

impl AutoDeclineRule {
    /// 评估规则是否命中,命中则返回原因
    ///
    /// # 参数
    /// - workload_percentage: 当前负载百分比 (current/capacity*100)
    /// - days_to_deadline: 拟邀截止日距今天数
    ///
    /// # 规则
    /// - 未启用或未配置任何条件: 不命中
    /// - max_workload_percentage: 负载超过上限时该条件成立
    /// - min_days_to_deadline: 剩余天数不足时该条件成立
    /// - 已配置的条件须全部成立(AND)
    pub fn evaluate(&self, workload_percentage: f64, days_to_deadline: i64) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if self.max_workload_percentage.is_none() && self.min_days_to_deadline.is_none() {
            return None;
        }

        let mut parts: Vec<String> = Vec::new();

        if let Some(max_pct) = self.max_workload_percentage {
            if workload_percentage > max_pct {
                parts.push(format!("负载{:.1}%超过上限{:.1}%", workload_percentage, max_pct));
            } else {
                return None;
            }
        }

        if let Some(min_days) = self.min_days_to_deadline {
            if days_to_deadline < min_days {
                parts.push(format!("距截止{}天不足{}天", days_to_deadline, min_days));
            } else {
                return None;
            }
        }

        Some(format!("AUTO_DECLINE[{}]: {}", self.name, parts.join(" 且 ")))
    }
}

/// 负载设置 (Workload Settings)
///
/// 对应数据库 workload_settings 表,按评审人一条。
/// revision 为乐观锁版本号,每次提交更新 +1。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSettings {
    pub reviewer_id: String,
    pub monthly_capacity: i32,       // 月容量,必须 > 0
    pub current_assignments: i32,    // 在途任务数 (INVITED/ACCEPTED)
    pub preferred_deadline_days: i64, // 首选评审周期天数
    pub blackout_ranges: Vec<BlackoutRange>,
    pub auto_decline_rules: Vec<AutoDeclineRule>,
    pub revision: i32,
    pub updated_at: Option<String>,
}

impl WorkloadSettings {
    /// 创建默认设置
    pub fn new(reviewer_id: String, monthly_capacity: i32) -> Self {
        WorkloadSettings {
            reviewer_id,
            monthly_capacity,
            current_assignments: 0,
            preferred_deadline_days: 21,
            blackout_ranges: Vec::new(),
            auto_decline_rules: Vec::new(),
            revision: 0,
            updated_at: None,
        }
    }

    /// 剩余容量 = monthly_capacity - current_assignments
    ///
    /// 覆写预留后可短暂为负
    pub fn capacity_remaining(&self) -> i32 {
        self.monthly_capacity - self.current_assignments
    }

    /// 负载百分比 = current/capacity*100 (capacity<=0 时按 100% 处理)
    pub fn workload_percentage(&self) -> f64 {
        if self.monthly_capacity <= 0 {
            return 100.0;
        }
        self.current_assignments as f64 / self.monthly_capacity as f64 * 100.0
    }

    /// 日期是否落入任一屏蔽区间
    pub fn is_blacked_out(&self, date: NaiveDate) -> bool {
        self.blackout_ranges.iter().any(|r| r.contains(date))
    }

    /// 评估自动拒审: 规则间 OR,返回 (是否拒审, 命中原因列表)
    pub fn evaluate_auto_decline(
        &self,
        proposed_due_date: NaiveDate,
        today: NaiveDate,
    ) -> (bool, Vec<String>) {
        let pct = self.workload_percentage();
        let days_to_deadline = (proposed_due_date - today).num_days();

        let reasons: Vec<String> = self
            .auto_decline_rules
            .iter()
            .filter_map(|r| r.evaluate(pct, days_to_deadline))
            .collect();

        (!reasons.is_empty(), reasons)
    }
}

/// 负载快照 (Workload Snapshot)
///
/// 随候选排序结果返回给编辑端,只读视图。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSnapshot {
    pub reviewer_id: String,
    pub monthly_capacity: i32,
    pub current_assignments: i32,
    pub capacity_remaining: i32,
    pub availability: AvailabilityStatus,
    pub blackout_overlap: bool, // 按首选周期推算的截止日是否落入屏蔽期
}
