// ==========================================
// 同行评审分配系统 - 相关性评分器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 3. Relevance Scorer
// 职责: 稿件与评审人专长的加法评分 (0-100)
// 红线: 纯函数、无 I/O; 每项得分必须产出可解释原因
// 红线: 领域契合度权重 > 子领域 > 关键词 > 质量 > 可用性
// ==========================================

use crate::domain::manuscript::Manuscript;
use crate::domain::reviewer::ReviewerProfile;

// ===== 评分权重 =====
pub const FIELD_MATCH_POINTS: f64 = 40.0;
pub const SUBFIELD_MATCH_POINTS: f64 = 30.0;
pub const KEYWORD_MATCH_POINTS: f64 = 10.0;
pub const QUALITY_BONUS_CAP: f64 = 20.0;
pub const AVAILABILITY_BONUS_FACTOR: f64 = 0.1;
pub const SCORE_CEILING: f64 = 100.0;

// ==========================================
// RelevanceScorer - 纯评分工具类
// ==========================================
pub struct RelevanceScorer;

impl RelevanceScorer {
    /// 计算稿件与评审人的相关性得分
    ///
    /// # 规则 (Review_Engine_Specs 3.1)
    /// - 研究领域精确命中专长 (大小写不敏感): +40
    /// - 子领域命中: +30
    /// - 每个关键词在任一专长标签内子串命中: +10 (每词计一次,不设上限)
    /// - 质量加成: +min(max(quality_metric, 0), 20)
    /// - 可用性加成: +0.1 × availability_score
    /// - 总分裁剪到 [0, 100]
    ///
    /// # 返回
    /// - (f64, Vec<String>): 最终得分 + 每项贡献的原因
    pub fn score(manuscript: &Manuscript, profile: &ReviewerProfile) -> (f64, Vec<String>) {
        let mut total = 0.0;
        let mut reasons = Vec::new();

        // === 步骤 1: 领域精确匹配 ===
        if Self::has_exact_tag(&profile.expertise, &manuscript.field_of_study) {
            total += FIELD_MATCH_POINTS;
            reasons.push(format!(
                "FIELD_MATCH: 研究领域[{}]命中专长 +{}",
                manuscript.field_of_study, FIELD_MATCH_POINTS
            ));
        }

        // === 步骤 2: 子领域匹配 ===
        if let Some(subfield) = &manuscript.subfield {
            if Self::has_exact_tag(&profile.expertise, subfield) {
                total += SUBFIELD_MATCH_POINTS;
                reasons.push(format!(
                    "SUBFIELD_MATCH: 子领域[{}]命中专长 +{}",
                    subfield, SUBFIELD_MATCH_POINTS
                ));
            }
        }

        // === 步骤 3: 关键词子串匹配 (每词计一次) ===
        for keyword in &manuscript.keywords {
            let kw = keyword.trim().to_lowercase();
            if kw.is_empty() {
                continue;
            }
            if let Some(tag) = profile
                .expertise
                .iter()
                .find(|tag| tag.to_lowercase().contains(&kw))
            {
                total += KEYWORD_MATCH_POINTS;
                reasons.push(format!(
                    "KEYWORD_MATCH: 关键词[{}]命中专长[{}] +{}",
                    keyword, tag, KEYWORD_MATCH_POINTS
                ));
            }
        }

        // === 步骤 4: 质量加成 (下限 0,上限 20) ===
        let quality_bonus = profile.quality_metric.max(0.0).min(QUALITY_BONUS_CAP);
        if quality_bonus > 0.0 {
            total += quality_bonus;
            reasons.push(format!(
                "QUALITY_BONUS: 质量分{:.1} +{:.1}",
                profile.quality_metric, quality_bonus
            ));
        }

        // === 步骤 5: 可用性加成 ===
        let availability_bonus = AVAILABILITY_BONUS_FACTOR * profile.availability_score();
        if availability_bonus > 0.0 {
            total += availability_bonus;
            reasons.push(format!(
                "AVAILABILITY_BONUS: 可用状态{} +{:.1}",
                profile.availability, availability_bonus
            ));
        }

        // === 步骤 6: 裁剪到 [0, 100] ===
        if total > SCORE_CEILING {
            reasons.push(format!(
                "SCORE_CLAMPED: 原始分{:.1}超出上限,按{}计",
                total, SCORE_CEILING
            ));
            total = SCORE_CEILING;
        }

        (total, reasons)
    }

    /// 专长标签精确匹配 (trim + 大小写不敏感)
    fn has_exact_tag(expertise: &[String], needle: &str) -> bool {
        let target = needle.trim().to_lowercase();
        if target.is_empty() {
            return false;
        }
        expertise
            .iter()
            .any(|tag| tag.trim().to_lowercase() == target)
    }
}
