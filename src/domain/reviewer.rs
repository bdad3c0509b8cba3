// ==========================================
// 同行评审分配系统 - 评审人领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 1.2 评审人档案
// 依据: Review_Engine_Specs_v0.2.md - 2.1 冲突证据来源
// ==========================================

use crate::domain::types::AvailabilityStatus;
use serde::{Deserialize, Serialize};

/// 评审人档案 (Reviewer Profile)
///
/// 对应数据库 reviewer 表。档案主体(专长/指标/可用状态)由外部
/// 档案库同步写入,本系统只读;负载字段另存于 workload_settings。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerProfile {
    // ===== 主键与标识 =====
    pub reviewer_id: String,
    pub full_name: String,

    // ===== 专长 =====
    pub expertise: Vec<String>, // 专长标签,保序存储但语义无序

    // ===== 历史指标 =====
    pub quality_metric: f64,       // 学术声望代理值(h-index 类),评分时截断至 20
    pub recent_review_count: i32,  // 近期完成评审数
    pub avg_turnaround_days: f64,  // 平均周转天数

    // ===== 可用状态 =====
    pub availability: AvailabilityStatus,

    // ===== 元数据 =====
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ReviewerProfile {
    /// 创建新档案(最小字段集,其余为默认值)
    pub fn new(reviewer_id: String, full_name: String) -> Self {
        ReviewerProfile {
            reviewer_id,
            full_name,
            expertise: Vec::new(),
            quality_metric: 0.0,
            recent_review_count: 0,
            avg_turnaround_days: 0.0,
            availability: AvailabilityStatus::Available,
            created_at: None,
            updated_at: None,
        }
    }

    /// 可用度评分 (0-100),排序 tie-break 用
    pub fn availability_score(&self) -> f64 {
        self.availability.availability_score()
    }
}

// ==========================================
// 冲突证据来源记录
// ==========================================
// 由外部档案库提供,本系统只读。机构名比对统一做
// trim + 小写归一化,见 normalize_institution。

/// 机构任职记录 (Affiliation Record)
///
/// end_year 为 None 表示现任。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliationRecord {
    pub person_id: String,
    pub institution: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
}

impl AffiliationRecord {
    /// 是否现任
    pub fn is_current(&self) -> bool {
        self.end_year.is_none()
    }

    /// 在 cutoff_year 当年或之后是否仍在任(现任恒为真)
    pub fn active_since(&self, cutoff_year: i32) -> bool {
        match self.end_year {
            None => true,
            Some(end) => end >= cutoff_year,
        }
    }
}

/// 合著记录 (Coauthorship Record)
///
/// person_id 与 counterpart_id 在 year 年共同署名。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoauthorshipRecord {
    pub person_id: String,
    pub counterpart_id: String,
    pub year: i32,
}

/// 师生关系 (Advisory Link)
///
/// 无时效窗口,任何方向均构成阻断级冲突。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryLink {
    pub advisor_id: String,
    pub advisee_id: String,
}

/// 经济利益/竞争关系申报 (Financial Disclosure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDisclosure {
    pub reviewer_id: String,
    pub counterparty_id: String, // 被申报的对方人员ID
    pub nature: String,          // 关系性质说明(自由文本)
}

/// 机构名归一化: trim + 小写
///
/// 冲突判定的机构比对一律先归一化,避免大小写/空白差异漏判
pub fn normalize_institution(name: &str) -> String {
    name.trim().to_lowercase()
}
