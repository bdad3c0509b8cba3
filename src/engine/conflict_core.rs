// ==========================================
// 同行评审分配系统 - Conflict Core 纯函数库
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 2. Conflict Engine
// 职责: 提供五类利益冲突规则的纯判定逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// 红线: 规则独立评估,返回全部命中证据而非首个
// ==========================================

use crate::domain::conflict::ConflictEvidence;
use crate::domain::reviewer::{
    normalize_institution, AdvisoryLink, AffiliationRecord, CoauthorshipRecord,
    FinancialDisclosure,
};
use crate::domain::types::ConflictType;
use std::collections::HashSet;

// ==========================================
// ConflictCore - 纯函数工具类
// ==========================================
pub struct ConflictCore;

impl ConflictCore {
    /// 机构冲突判定 (现任 + 近期)
    ///
    /// # 规则 (Review_Engine_Specs 2.2)
    /// - 评审人与任一作者同属同一现任机构 → INSTITUTIONAL_CURRENT (BLOCKING)
    /// - 双方在 recency_cutoff_year 年及之后同属同一机构,且非现任/现任
    ///   组合(该情形已按现任上报) → INSTITUTIONAL_RECENT (HIGH)
    ///
    /// # 参数
    /// - reviewer_affiliations: 评审人的任职记录
    /// - author_affiliations: 全体作者的任职记录(person_id 区分归属)
    /// - recency_cutoff_year: 时效下限年份 (今年 - 窗口年数)
    ///
    /// # 说明
    /// 机构名先做 trim + 小写归一化再比对;
    /// 同一 (作者, 机构) 组合只产出一条证据
    pub fn check_institutional(
        reviewer_id: &str,
        manuscript_id: &str,
        reviewer_affiliations: &[AffiliationRecord],
        author_affiliations: &[AffiliationRecord],
        recency_cutoff_year: i32,
    ) -> Vec<ConflictEvidence> {
        let mut evidences = Vec::new();
        let mut seen_current: HashSet<(String, String)> = HashSet::new();
        let mut seen_recent: HashSet<(String, String)> = HashSet::new();

        for r_aff in reviewer_affiliations {
            let r_inst = normalize_institution(&r_aff.institution);
            if r_inst.is_empty() {
                continue;
            }

            for a_aff in author_affiliations {
                if normalize_institution(&a_aff.institution) != r_inst {
                    continue;
                }

                let key = (a_aff.person_id.clone(), r_inst.clone());

                // 规则 1: 双方现任 → BLOCKING
                if r_aff.is_current() && a_aff.is_current() {
                    if seen_current.insert(key.clone()) {
                        evidences.push(ConflictEvidence::new(
                            reviewer_id.to_string(),
                            manuscript_id.to_string(),
                            ConflictType::InstitutionalCurrent,
                            format!(
                                "与作者{}同属现任机构[{}]",
                                a_aff.person_id, r_aff.institution
                            ),
                        ));
                    }
                    continue;
                }

                // 规则 2: 双方均落在时效窗口内 → HIGH
                if r_aff.active_since(recency_cutoff_year)
                    && a_aff.active_since(recency_cutoff_year)
                    && seen_recent.insert(key)
                {
                    evidences.push(ConflictEvidence::new(
                        reviewer_id.to_string(),
                        manuscript_id.to_string(),
                        ConflictType::InstitutionalRecent,
                        format!(
                            "与作者{}在{}年及之后同属机构[{}]",
                            a_aff.person_id, recency_cutoff_year, r_aff.institution
                        ),
                    ));
                }
            }
        }

        evidences
    }

    /// 近期合著判定
    ///
    /// # 规则 (Review_Engine_Specs 2.3)
    /// - 评审人与任一作者在 recency_cutoff_year 年及之后有合著记录
    ///   → COAUTHORSHIP_RECENT (HIGH)
    /// - 每位命中作者一条证据,取最近一次合著年份
    pub fn check_coauthorship(
        reviewer_id: &str,
        manuscript_id: &str,
        author_ids: &[String],
        records: &[CoauthorshipRecord],
        recency_cutoff_year: i32,
    ) -> Vec<ConflictEvidence> {
        let author_set: HashSet<&str> = author_ids.iter().map(|s| s.as_str()).collect();
        let mut latest_by_author: Vec<(String, i32)> = Vec::new();

        for rec in records {
            if rec.year < recency_cutoff_year {
                continue;
            }

            // 双向: 评审人可能在任一侧
            let matched_author = if rec.person_id == reviewer_id
                && author_set.contains(rec.counterpart_id.as_str())
            {
                Some(rec.counterpart_id.as_str())
            } else if rec.counterpart_id == reviewer_id
                && author_set.contains(rec.person_id.as_str())
            {
                Some(rec.person_id.as_str())
            } else {
                None
            };

            if let Some(author) = matched_author {
                match latest_by_author.iter_mut().find(|(a, _)| a == author) {
                    Some((_, year)) => *year = (*year).max(rec.year),
                    None => latest_by_author.push((author.to_string(), rec.year)),
                }
            }
        }

        latest_by_author
            .into_iter()
            .map(|(author, year)| {
                ConflictEvidence::new(
                    reviewer_id.to_string(),
                    manuscript_id.to_string(),
                    ConflictType::CoauthorshipRecent,
                    format!("与作者{}于{}年合著", author, year),
                )
            })
            .collect()
    }

    /// 师生关系判定
    ///
    /// # 规则 (Review_Engine_Specs 2.4)
    /// - 评审人与任一作者存在师生关系(任一方向,无时效窗口)
    ///   → ADVISOR_ADVISEE (BLOCKING)
    pub fn check_advisory(
        reviewer_id: &str,
        manuscript_id: &str,
        author_ids: &[String],
        links: &[AdvisoryLink],
    ) -> Vec<ConflictEvidence> {
        let author_set: HashSet<&str> = author_ids.iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut evidences = Vec::new();

        for link in links {
            let matched = if link.advisor_id == reviewer_id
                && author_set.contains(link.advisee_id.as_str())
            {
                Some((link.advisee_id.as_str(), "作者{}为其指导学生"))
            } else if link.advisee_id == reviewer_id
                && author_set.contains(link.advisor_id.as_str())
            {
                Some((link.advisor_id.as_str(), "作者{}为其导师"))
            } else {
                None
            };

            if let Some((author, template)) = matched {
                if seen.insert(author.to_string()) {
                    evidences.push(ConflictEvidence::new(
                        reviewer_id.to_string(),
                        manuscript_id.to_string(),
                        ConflictType::AdvisorAdvisee,
                        template.replace("{}", author),
                    ));
                }
            }
        }

        evidences
    }

    /// 经济利益/竞争关系判定
    ///
    /// # 规则 (Review_Engine_Specs 2.5)
    /// - 评审人申报的对方为任一作者 → FINANCIAL_COMPETING (MEDIUM)
    /// - 每位命中作者一条证据
    pub fn check_financial(
        reviewer_id: &str,
        manuscript_id: &str,
        author_ids: &[String],
        disclosures: &[FinancialDisclosure],
    ) -> Vec<ConflictEvidence> {
        let author_set: HashSet<&str> = author_ids.iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut evidences = Vec::new();

        for d in disclosures {
            if d.reviewer_id != reviewer_id {
                continue;
            }
            if !author_set.contains(d.counterparty_id.as_str()) {
                continue;
            }
            if seen.insert(d.counterparty_id.clone()) {
                evidences.push(ConflictEvidence::new(
                    reviewer_id.to_string(),
                    manuscript_id.to_string(),
                    ConflictType::FinancialCompeting,
                    format!("与作者{}存在经济利益申报: {}", d.counterparty_id, d.nature),
                ));
            }
        }

        evidences
    }

    /// 全量冲突评估
    ///
    /// # 规则
    /// 五类规则独立评估,汇总全部证据;
    /// 输出按严重度降序排列(同严重度保持规则顺序),保证结果确定性
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_all(
        reviewer_id: &str,
        manuscript_id: &str,
        author_ids: &[String],
        reviewer_affiliations: &[AffiliationRecord],
        author_affiliations: &[AffiliationRecord],
        coauthorships: &[CoauthorshipRecord],
        advisory_links: &[AdvisoryLink],
        disclosures: &[FinancialDisclosure],
        institutional_cutoff_year: i32,
        coauthorship_cutoff_year: i32,
    ) -> Vec<ConflictEvidence> {
        let mut evidences = Self::check_institutional(
            reviewer_id,
            manuscript_id,
            reviewer_affiliations,
            author_affiliations,
            institutional_cutoff_year,
        );
        evidences.extend(Self::check_coauthorship(
            reviewer_id,
            manuscript_id,
            author_ids,
            coauthorships,
            coauthorship_cutoff_year,
        ));
        evidences.extend(Self::check_advisory(
            reviewer_id,
            manuscript_id,
            author_ids,
            advisory_links,
        ));
        evidences.extend(Self::check_financial(
            reviewer_id,
            manuscript_id,
            author_ids,
            disclosures,
        ));

        // 稳定排序: 严重度降序,同级保持规则产出顺序
        evidences.sort_by(|a, b| b.severity.cmp(&a.severity));
        evidences
    }
}
