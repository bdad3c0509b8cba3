// ==========================================
// 同行评审分配系统 - 编辑活动日志领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 8. 审计日志
// 红线: 所有状态变更必须留痕
// ==========================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 活动类型 (Activity Type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    InviteCreated,      // 邀审创建
    InviteAutoDeclined, // 按规则自动拒审
    InviteAccepted,     // 评审人接受
    InviteDeclined,     // 评审人拒审
    ReviewCompleted,    // 评审完成
    InviteExpired,      // 邀审过期
    CapacityOverride,   // 容量覆写
    PriorityRefreshed,  // 优先级缓存刷新
    SettingsUpdated,    // 负载设置更新
}

impl ActivityType {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActivityType::InviteCreated => "INVITE_CREATED",
            ActivityType::InviteAutoDeclined => "INVITE_AUTO_DECLINED",
            ActivityType::InviteAccepted => "INVITE_ACCEPTED",
            ActivityType::InviteDeclined => "INVITE_DECLINED",
            ActivityType::ReviewCompleted => "REVIEW_COMPLETED",
            ActivityType::InviteExpired => "INVITE_EXPIRED",
            ActivityType::CapacityOverride => "CAPACITY_OVERRIDE",
            ActivityType::PriorityRefreshed => "PRIORITY_REFRESHED",
            ActivityType::SettingsUpdated => "SETTINGS_UPDATED",
        }
    }

    /// 从字符串解析活动类型
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INVITE_CREATED" => Some(ActivityType::InviteCreated),
            "INVITE_AUTO_DECLINED" => Some(ActivityType::InviteAutoDeclined),
            "INVITE_ACCEPTED" => Some(ActivityType::InviteAccepted),
            "INVITE_DECLINED" => Some(ActivityType::InviteDeclined),
            "REVIEW_COMPLETED" => Some(ActivityType::ReviewCompleted),
            "INVITE_EXPIRED" => Some(ActivityType::InviteExpired),
            "CAPACITY_OVERRIDE" => Some(ActivityType::CapacityOverride),
            "PRIORITY_REFRESHED" => Some(ActivityType::PriorityRefreshed),
            "SETTINGS_UPDATED" => Some(ActivityType::SettingsUpdated),
            _ => None,
        }
    }
}

/// 编辑活动日志 (Activity Log)
///
/// 对应数据库 activity_log 表。编排器每次状态变更追加一条,
/// 供稿件历史页与审计查询使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Option<i64>, // 自增主键,插入前为 None
    pub activity_id: String,
    pub activity_type: ActivityType,
    pub manuscript_id: Option<String>,
    pub reviewer_id: Option<String>,
    pub assignment_id: Option<String>,
    pub operator: String,            // "system" 或编辑工号
    pub detail_json: Option<String>, // 附加数据(JSON 文本)
    pub created_at: Option<String>,
}

impl ActivityLog {
    /// 创建日志(默认 operator 为 system)
    pub fn new(activity_type: ActivityType) -> Self {
        ActivityLog {
            id: None,
            activity_id: Uuid::new_v4().to_string(),
            activity_type,
            manuscript_id: None,
            reviewer_id: None,
            assignment_id: None,
            operator: "system".to_string(),
            detail_json: None,
            created_at: None,
        }
    }

    pub fn with_manuscript(mut self, manuscript_id: &str) -> Self {
        self.manuscript_id = Some(manuscript_id.to_string());
        self
    }

    pub fn with_reviewer(mut self, reviewer_id: &str) -> Self {
        self.reviewer_id = Some(reviewer_id.to_string());
        self
    }

    pub fn with_assignment(mut self, assignment_id: &str) -> Self {
        self.assignment_id = Some(assignment_id.to_string());
        self
    }

    pub fn with_operator(mut self, operator: &str) -> Self {
        self.operator = operator.to_string();
        self
    }

    /// 附加 JSON 明细(序列化失败时置 None,不中断主流程)
    pub fn with_detail(mut self, detail: &serde_json::Value) -> Self {
        self.detail_json = serde_json::to_string(detail).ok();
        self
    }
}
