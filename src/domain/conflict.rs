// ==========================================
// 同行评审分配系统 - 冲突证据领域模型
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 2. Conflict Engine
// 红线: 证据逐次重算,不作为权威事实落库
// ==========================================

use crate::domain::types::{ConflictSeverity, ConflictType};
use serde::{Deserialize, Serialize};

/// 冲突证据 (Conflict Evidence)
///
/// 由冲突引擎针对 (评审人, 稿件) 逐次计算产出。detail 为可读的
/// 证据说明,随结果返回给编辑端展示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEvidence {
    pub reviewer_id: String,
    pub manuscript_id: String,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub detail: String,
}

impl ConflictEvidence {
    /// 按冲突类型创建证据,严重度由类型唯一确定
    pub fn new(
        reviewer_id: String,
        manuscript_id: String,
        conflict_type: ConflictType,
        detail: String,
    ) -> Self {
        ConflictEvidence {
            reviewer_id,
            manuscript_id,
            severity: severity_for(conflict_type),
            conflict_type,
            detail,
        }
    }

    /// 是否为阻断级冲突
    pub fn is_blocking(&self) -> bool {
        self.severity == ConflictSeverity::Blocking
    }
}

/// 冲突类型 → 严重度 映射
///
/// # 规则
/// - 同一现任机构 → BLOCKING
/// - 近期共同机构 → HIGH
/// - 近期合著 → HIGH
/// - 师生关系 → BLOCKING
/// - 经济利益/竞争关系 → MEDIUM
pub fn severity_for(conflict_type: ConflictType) -> ConflictSeverity {
    match conflict_type {
        ConflictType::InstitutionalCurrent => ConflictSeverity::Blocking,
        ConflictType::InstitutionalRecent => ConflictSeverity::High,
        ConflictType::CoauthorshipRecent => ConflictSeverity::High,
        ConflictType::AdvisorAdvisee => ConflictSeverity::Blocking,
        ConflictType::FinancialCompeting => ConflictSeverity::Medium,
    }
}

/// 证据列表中是否存在阻断级冲突
pub fn has_blocking(evidences: &[ConflictEvidence]) -> bool {
    evidences.iter().any(|e| e.is_blocking())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            severity_for(ConflictType::InstitutionalCurrent),
            ConflictSeverity::Blocking
        );
        assert_eq!(
            severity_for(ConflictType::InstitutionalRecent),
            ConflictSeverity::High
        );
        assert_eq!(
            severity_for(ConflictType::CoauthorshipRecent),
            ConflictSeverity::High
        );
        assert_eq!(
            severity_for(ConflictType::AdvisorAdvisee),
            ConflictSeverity::Blocking
        );
        assert_eq!(
            severity_for(ConflictType::FinancialCompeting),
            ConflictSeverity::Medium
        );
    }

    #[test]
    fn test_has_blocking() {
        let blocking = ConflictEvidence::new(
            "R1".to_string(),
            "M1".to_string(),
            ConflictType::AdvisorAdvisee,
            "导师关系".to_string(),
        );
        let warning = ConflictEvidence::new(
            "R1".to_string(),
            "M1".to_string(),
            ConflictType::FinancialCompeting,
            "竞争项目".to_string(),
        );
        assert!(blocking.is_blocking());
        assert!(!warning.is_blocking());
        assert!(has_blocking(&[warning.clone(), blocking]));
        assert!(!has_blocking(&[warning]));
        assert!(!has_blocking(&[]));
    }
}
