// ==========================================
// 同行评审分配系统 - 冲突检测引擎
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 2. Conflict Engine
// 红线: BLOCKING 级冲突无任何突破路径
// ==========================================
// 职责: 加载关系数据 + 计算时效窗口 + 调用纯规则
// 输入: reviewer_id + manuscript
// 输出: 全部命中的冲突证据 (严重度降序)
// ==========================================

use crate::config::AssignConfigReader;
use crate::domain::conflict::{has_blocking, ConflictEvidence};
use crate::domain::manuscript::Manuscript;
use crate::engine::ConflictCore;
use crate::repository::ReviewerRepository;
use chrono::{Datelike, NaiveDate};
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ConflictEngine - 冲突检测引擎
// ==========================================
// 红线: 不写库,只读关系数据并返回证据
pub struct ConflictEngine<C>
where
    C: AssignConfigReader,
{
    reviewer_repo: Arc<ReviewerRepository>,
    config: Arc<C>,
}

impl<C> ConflictEngine<C>
where
    C: AssignConfigReader,
{
    /// 创建新的 ConflictEngine 实例
    ///
    /// # 参数
    /// - reviewer_repo: 评审人关系数据仓库
    /// - config: 配置读取器
    pub fn new(reviewer_repo: Arc<ReviewerRepository>, config: Arc<C>) -> Self {
        Self {
            reviewer_repo,
            config,
        }
    }

    /// 评估评审人与稿件的全部利益冲突
    ///
    /// # 参数
    /// - reviewer_id: 候选评审人
    /// - manuscript: 稿件 (作者 = author_id + co_author_ids)
    /// - today: 当前日期 (决定时效窗口下限)
    ///
    /// # 返回
    /// - Vec<ConflictEvidence>: 全部命中证据,严重度降序
    #[instrument(skip(self, manuscript), fields(reviewer_id = %reviewer_id, manuscript_id = %manuscript.manuscript_id))]
    pub async fn evaluate(
        &self,
        reviewer_id: &str,
        manuscript: &Manuscript,
        today: NaiveDate,
    ) -> Result<Vec<ConflictEvidence>, Box<dyn Error>> {
        let author_ids = manuscript.all_author_ids();

        // === 步骤 1: 计算时效窗口下限年份 ===
        let affiliation_years = self.config.get_affiliation_recency_years().await?;
        let coauthorship_years = self.config.get_coauthorship_recency_years().await?;
        let institutional_cutoff = today.year() - affiliation_years;
        let coauthorship_cutoff = today.year() - coauthorship_years;

        // === 步骤 2: 加载关系数据 ===
        let reviewer_affiliations = self.reviewer_repo.find_affiliations(reviewer_id)?;
        let author_affiliations = self.reviewer_repo.find_affiliations_of(&author_ids)?;
        let coauthorships = self.reviewer_repo.find_coauthorships(reviewer_id)?;
        let advisory_links = self.reviewer_repo.find_advisory_links(reviewer_id)?;
        let disclosures = self.reviewer_repo.find_financial_disclosures(reviewer_id)?;

        // === 步骤 3: 纯规则评估 ===
        let evidences = ConflictCore::evaluate_all(
            reviewer_id,
            &manuscript.manuscript_id,
            &author_ids,
            &reviewer_affiliations,
            &author_affiliations,
            &coauthorships,
            &advisory_links,
            &disclosures,
            institutional_cutoff,
            coauthorship_cutoff,
        );

        Ok(evidences)
    }

    /// 评估并给出可指派结论
    ///
    /// # 返回
    /// - (bool, Vec<ConflictEvidence>): 是否可指派 + 全部证据
    /// - 可指派 = 无 BLOCKING 级证据; 非阻断证据仅作为警示保留
    pub async fn check_eligibility(
        &self,
        reviewer_id: &str,
        manuscript: &Manuscript,
        today: NaiveDate,
    ) -> Result<(bool, Vec<ConflictEvidence>), Box<dyn Error>> {
        let evidences = self.evaluate(reviewer_id, manuscript, today).await?;
        let eligible = !has_blocking(&evidences);
        Ok((eligible, evidences))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::reviewer::{
        AdvisoryLink, AffiliationRecord, CoauthorshipRecord, FinancialDisclosure,
    };
    use crate::domain::types::{ConflictSeverity, ConflictType};
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    // ==========================================
    // Mock ConfigReader
    // ==========================================
    struct MockConfigReader;

    #[async_trait]
    impl AssignConfigReader for MockConfigReader {
        async fn get_affiliation_recency_years(
            &self,
        ) -> Result<i32, Box<dyn std::error::Error>> {
            Ok(3)
        }

        async fn get_coauthorship_recency_years(
            &self,
        ) -> Result<i32, Box<dyn std::error::Error>> {
            Ok(3)
        }

        async fn get_default_review_deadline_days(
            &self,
        ) -> Result<i64, Box<dyn std::error::Error>> {
            Ok(21)
        }
    }

    // ==========================================
    // 测试辅助函数
    // ==========================================
    fn setup_repo() -> Arc<ReviewerRepository> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        Arc::new(ReviewerRepository::from_connection(Arc::new(Mutex::new(
            conn,
        ))))
    }

    fn test_manuscript(author: &str, co_authors: Vec<&str>) -> Manuscript {
        let mut m = Manuscript::new(
            "M001".to_string(),
            "深度学习综述".to_string(),
            "machine learning".to_string(),
            author.to_string(),
        );
        m.co_author_ids = co_authors.into_iter().map(|s| s.to_string()).collect();
        m
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    // ==========================================
    // 测试 1: 现任机构冲突 (BLOCKING)
    // ==========================================

    #[tokio::test]
    async fn test_evaluate_institutional_current_blocking() {
        let repo = setup_repo();
        repo.replace_affiliations(
            "R1",
            &[AffiliationRecord {
                person_id: "R1".to_string(),
                institution: "Tsinghua University".to_string(),
                start_year: 2019,
                end_year: None,
            }],
        )
        .unwrap();
        repo.replace_affiliations(
            "A1",
            &[AffiliationRecord {
                person_id: "A1".to_string(),
                institution: "tsinghua university".to_string(),
                start_year: 2021,
                end_year: None,
            }],
        )
        .unwrap();

        let engine = ConflictEngine::new(repo, Arc::new(MockConfigReader));
        let manuscript = test_manuscript("A1", vec![]);

        let (eligible, evidences) = engine
            .check_eligibility("R1", &manuscript, today())
            .await
            .unwrap();

        assert!(!eligible);
        assert_eq!(evidences.len(), 1);
        assert_eq!(evidences[0].conflict_type, ConflictType::InstitutionalCurrent);
        assert_eq!(evidences[0].severity, ConflictSeverity::Blocking);
    }

    // ==========================================
    // 测试 2: 合著时效窗口 (配置 3 年)
    // ==========================================

    #[tokio::test]
    async fn test_evaluate_coauthorship_window_from_config() {
        let repo = setup_repo();
        // 2024 年合著: 窗口下限 2026-3=2023,命中
        repo.add_coauthorship(&CoauthorshipRecord {
            person_id: "R1".to_string(),
            counterpart_id: "A2".to_string(),
            year: 2024,
        })
        .unwrap();
        // 2021 年合著: 窗口外,不命中
        repo.add_coauthorship(&CoauthorshipRecord {
            person_id: "R1".to_string(),
            counterpart_id: "A1".to_string(),
            year: 2021,
        })
        .unwrap();

        let engine = ConflictEngine::new(repo, Arc::new(MockConfigReader));
        let manuscript = test_manuscript("A1", vec!["A2"]);

        let (eligible, evidences) = engine
            .check_eligibility("R1", &manuscript, today())
            .await
            .unwrap();

        // HIGH 不阻断,仍可指派
        assert!(eligible);
        assert_eq!(evidences.len(), 1);
        assert_eq!(evidences[0].conflict_type, ConflictType::CoauthorshipRecent);
        assert!(evidences[0].detail.contains("A2"));
    }

    // ==========================================
    // 测试 3: 共同作者也参与冲突判定
    // ==========================================

    #[tokio::test]
    async fn test_evaluate_covers_co_authors() {
        let repo = setup_repo();
        repo.add_advisory_link(&AdvisoryLink {
            advisor_id: "R1".to_string(),
            advisee_id: "A3".to_string(),
        })
        .unwrap();

        let engine = ConflictEngine::new(repo, Arc::new(MockConfigReader));
        let manuscript = test_manuscript("A1", vec!["A2", "A3"]);

        let (eligible, evidences) = engine
            .check_eligibility("R1", &manuscript, today())
            .await
            .unwrap();

        assert!(!eligible);
        assert_eq!(evidences[0].conflict_type, ConflictType::AdvisorAdvisee);
    }

    // ==========================================
    // 测试 4: 多类证据全量返回且降序
    // ==========================================

    #[tokio::test]
    async fn test_evaluate_returns_all_evidence_sorted() {
        let repo = setup_repo();
        repo.add_coauthorship(&CoauthorshipRecord {
            person_id: "A1".to_string(),
            counterpart_id: "R1".to_string(),
            year: 2025,
        })
        .unwrap();
        repo.add_financial_disclosure(&FinancialDisclosure {
            reviewer_id: "R1".to_string(),
            counterparty_id: "A1".to_string(),
            nature: "共同专利".to_string(),
        })
        .unwrap();

        let engine = ConflictEngine::new(repo, Arc::new(MockConfigReader));
        let manuscript = test_manuscript("A1", vec![]);

        let evidences = engine.evaluate("R1", &manuscript, today()).await.unwrap();

        assert_eq!(evidences.len(), 2);
        assert_eq!(evidences[0].severity, ConflictSeverity::High);
        assert_eq!(evidences[1].severity, ConflictSeverity::Medium);
    }

    // ==========================================
    // 测试 5: 无关系数据 → 无冲突
    // ==========================================

    #[tokio::test]
    async fn test_evaluate_clean_reviewer() {
        let repo = setup_repo();
        let engine = ConflictEngine::new(repo, Arc::new(MockConfigReader));
        let manuscript = test_manuscript("A1", vec!["A2"]);

        let (eligible, evidences) = engine
            .check_eligibility("R9", &manuscript, today())
            .await
            .unwrap();

        assert!(eligible);
        assert!(evidences.is_empty());
    }
}
