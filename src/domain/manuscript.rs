// ==========================================
// 同行评审分配系统 - 稿件领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 1.1 稿件
// ==========================================

use crate::domain::types::{ManuscriptStatus, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 稿件 (Manuscript)
///
/// 对应数据库 manuscript 表。学科信息与作者名单由投稿系统写入,
/// 本系统只读;仅 status 与优先级缓存列由本系统更新。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manuscript {
    // ===== 主键与标识 =====
    pub manuscript_id: String,
    pub title: String,

    // ===== 学科信息 =====
    pub field_of_study: String,    // 一级学科
    pub subfield: Option<String>,  // 二级学科
    pub keywords: Vec<String>,     // 关键词

    // ===== 作者 =====
    pub author_id: String,           // 通讯作者人员ID
    pub co_author_ids: Vec<String>,  // 共同作者人员ID

    // ===== 流程状态与优先级 =====
    pub status: ManuscriptStatus,
    pub priority: Priority,                  // 缓存的推导优先级,状态变更后需刷新
    pub priority_override: Option<Priority>, // 编辑人工覆写,存在时优先生效

    // ===== 时间戳 =====
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Manuscript {
    /// 创建新稿件(最小字段集,其余为默认值)
    pub fn new(
        manuscript_id: String,
        title: String,
        field_of_study: String,
        author_id: String,
    ) -> Self {
        let now = Utc::now();
        Manuscript {
            manuscript_id,
            title,
            field_of_study,
            subfield: None,
            keywords: Vec::new(),
            author_id,
            co_author_ids: Vec::new(),
            status: ManuscriptStatus::Submitted,
            priority: Priority::Normal,
            priority_override: None,
            submitted_at: now,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            published_at: None,
        }
    }

    /// 全体作者(通讯作者 + 共同作者),冲突判定的比对对象
    pub fn all_author_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(1 + self.co_author_ids.len());
        ids.push(self.author_id.clone());
        ids.extend(self.co_author_ids.iter().cloned());
        ids
    }

    /// 自创建起天数: now - max(submitted_at, created_at)
    pub fn days_since_created(&self, now: DateTime<Utc>) -> i64 {
        let anchor = self.submitted_at.max(self.created_at);
        (now - anchor).num_days()
    }

    /// 自最近更新起天数
    pub fn days_since_updated(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_days()
    }

    /// 当前生效优先级: 覆写优先,否则取缓存的推导值
    pub fn effective_priority(&self) -> Priority {
        self.priority_override.unwrap_or(self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_manuscript_defaults() {
        let m = Manuscript::new(
            "M001".to_string(),
            "测试稿件".to_string(),
            "Computer Science".to_string(),
            "A001".to_string(),
        );
        assert_eq!(m.status, ManuscriptStatus::Submitted);
        assert_eq!(m.priority, Priority::Normal);
        assert_eq!(m.effective_priority(), Priority::Normal);
        assert!(m.co_author_ids.is_empty());
    }

    #[test]
    fn test_all_author_ids_includes_corresponding_author() {
        let mut m = Manuscript::new(
            "M001".to_string(),
            "t".to_string(),
            "cs".to_string(),
            "A001".to_string(),
        );
        m.co_author_ids = vec!["A002".to_string(), "A003".to_string()];
        assert_eq!(m.all_author_ids(), vec!["A001", "A002", "A003"]);
    }

    #[test]
    fn test_days_since_created_uses_later_anchor() {
        let mut m = Manuscript::new(
            "M001".to_string(),
            "t".to_string(),
            "cs".to_string(),
            "A001".to_string(),
        );
        let now = Utc::now();
        m.created_at = now - Duration::days(50);
        m.submitted_at = now - Duration::days(30); // 投稿晚于建档,以投稿为准
        assert_eq!(m.days_since_created(now), 30);
    }

    #[test]
    fn test_priority_override_wins() {
        let mut m = Manuscript::new(
            "M001".to_string(),
            "t".to_string(),
            "cs".to_string(),
            "A001".to_string(),
        );
        m.priority = Priority::High;
        m.priority_override = Some(Priority::Low);
        assert_eq!(m.effective_priority(), Priority::Low);
    }
}
