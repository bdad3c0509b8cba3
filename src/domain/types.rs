// ==========================================
// 同行评审分配系统 - 领域类型定义
// ==========================================
// 依据: Editorial_Master_Spec.md - PART A2 红线
// 依据: Review_Engine_Specs_v0.2.md - 0.2 等级体系
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 稿件状态 (Manuscript Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManuscriptStatus {
    Submitted,          // 已投稿
    InReview,           // 评审中
    RevisionsRequested, // 待作者修回
    AwaitingDecision,   // 待编辑决定
    Accepted,           // 已录用
    Rejected,           // 已拒稿
    Published,          // 已出版
}

impl fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ManuscriptStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "SUBMITTED",
            ManuscriptStatus::InReview => "IN_REVIEW",
            ManuscriptStatus::RevisionsRequested => "REVISIONS_REQUESTED",
            ManuscriptStatus::AwaitingDecision => "AWAITING_DECISION",
            ManuscriptStatus::Accepted => "ACCEPTED",
            ManuscriptStatus::Rejected => "REJECTED",
            ManuscriptStatus::Published => "PUBLISHED",
        }
    }

    /// 从字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBMITTED" => Some(ManuscriptStatus::Submitted),
            "IN_REVIEW" => Some(ManuscriptStatus::InReview),
            "REVISIONS_REQUESTED" => Some(ManuscriptStatus::RevisionsRequested),
            "AWAITING_DECISION" => Some(ManuscriptStatus::AwaitingDecision),
            "ACCEPTED" => Some(ManuscriptStatus::Accepted),
            "REJECTED" => Some(ManuscriptStatus::Rejected),
            "PUBLISHED" => Some(ManuscriptStatus::Published),
            _ => None,
        }
    }
}

// ==========================================
// 评审任务状态 (Assignment Status)
// ==========================================
// 依据: Review_Engine_Specs 7. Assignment Lifecycle
// 红线: 状态机单向,非法边必须拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Invited,   // 已邀审(待回应)
    Accepted,  // 已接受
    Declined,  // 已拒审
    Completed, // 已完成
    Expired,   // 已过期
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AssignmentStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Invited => "INVITED",
            AssignmentStatus::Accepted => "ACCEPTED",
            AssignmentStatus::Declined => "DECLINED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Expired => "EXPIRED",
        }
    }

    /// 从字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INVITED" => Some(AssignmentStatus::Invited),
            "ACCEPTED" => Some(AssignmentStatus::Accepted),
            "DECLINED" => Some(AssignmentStatus::Declined),
            "COMPLETED" => Some(AssignmentStatus::Completed),
            "EXPIRED" => Some(AssignmentStatus::Expired),
            _ => None,
        }
    }

    /// 是否为终态 (DECLINED/COMPLETED/EXPIRED)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Declined | AssignmentStatus::Completed | AssignmentStatus::Expired
        )
    }

    /// 是否占用评审人容量 (INVITED/ACCEPTED)
    pub fn holds_capacity(&self) -> bool {
        matches!(self, AssignmentStatus::Invited | AssignmentStatus::Accepted)
    }
}

// ==========================================
// 稿件优先级 (Priority)
// ==========================================
// 依据: Review_Engine_Specs 6. Priority Engine
// 顺序: Low < Normal < High < Urgent
// 说明: LOW 仅作为编辑人工覆写值,推导算法不产出
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,    // 低(仅人工覆写)
    Normal, // 正常
    High,   // 高
    Urgent, // 紧急
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Priority {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// 从字符串解析优先级
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "NORMAL" => Some(Priority::Normal),
            "HIGH" => Some(Priority::High),
            "URGENT" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

// ==========================================
// 冲突类型 (Conflict Type)
// ==========================================
// 依据: Review_Engine_Specs 2. Conflict Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    InstitutionalCurrent, // 同一现任机构
    InstitutionalRecent,  // 近期共同机构
    CoauthorshipRecent,   // 近期合著
    AdvisorAdvisee,       // 师生关系
    FinancialCompeting,   // 经济利益/竞争关系
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ConflictType {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConflictType::InstitutionalCurrent => "INSTITUTIONAL_CURRENT",
            ConflictType::InstitutionalRecent => "INSTITUTIONAL_RECENT",
            ConflictType::CoauthorshipRecent => "COAUTHORSHIP_RECENT",
            ConflictType::AdvisorAdvisee => "ADVISOR_ADVISEE",
            ConflictType::FinancialCompeting => "FINANCIAL_COMPETING",
        }
    }

    /// 从字符串解析冲突类型
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INSTITUTIONAL_CURRENT" => Some(ConflictType::InstitutionalCurrent),
            "INSTITUTIONAL_RECENT" => Some(ConflictType::InstitutionalRecent),
            "COAUTHORSHIP_RECENT" => Some(ConflictType::CoauthorshipRecent),
            "ADVISOR_ADVISEE" => Some(ConflictType::AdvisorAdvisee),
            "FINANCIAL_COMPETING" => Some(ConflictType::FinancialCompeting),
            _ => None,
        }
    }
}

// ==========================================
// 冲突严重度 (Conflict Severity)
// ==========================================
// 红线: BLOCKING 级冲突无突破路径
// 顺序: Low < Medium < High < Blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,      // 低(提示)
    Medium,   // 中(警告)
    High,     // 高(强警告)
    Blocking, // 阻断(不可突破)
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ConflictSeverity {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "LOW",
            ConflictSeverity::Medium => "MEDIUM",
            ConflictSeverity::High => "HIGH",
            ConflictSeverity::Blocking => "BLOCKING",
        }
    }

    /// 从字符串解析严重度
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOW" => Some(ConflictSeverity::Low),
            "MEDIUM" => Some(ConflictSeverity::Medium),
            "HIGH" => Some(ConflictSeverity::High),
            "BLOCKING" => Some(ConflictSeverity::Blocking),
            _ => None,
        }
    }
}

// ==========================================
// 评审人可用状态 (Availability Status)
// ==========================================
// 来源: 评审人档案自报,随档案同步更新
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,   // 可接审
    Busy,        // 繁忙
    Unavailable, // 不可用
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AvailabilityStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "AVAILABLE",
            AvailabilityStatus::Busy => "BUSY",
            AvailabilityStatus::Unavailable => "UNAVAILABLE",
        }
    }

    /// 从字符串解析可用状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Some(AvailabilityStatus::Available),
            "BUSY" => Some(AvailabilityStatus::Busy),
            "UNAVAILABLE" => Some(AvailabilityStatus::Unavailable),
            _ => None,
        }
    }

    /// 可用度评分 (0-100)
    ///
    /// 用途: 匹配度评分的可用度加分项与排序 tie-break
    pub fn availability_score(&self) -> f64 {
        match self {
            AvailabilityStatus::Available => 100.0,
            AvailabilityStatus::Busy => 50.0,
            AvailabilityStatus::Unavailable => 0.0,
        }
    }
}
