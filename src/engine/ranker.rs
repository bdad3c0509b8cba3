// ==========================================
// 同行评审分配系统 - 候选排序器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 5. Candidate Ranker
// 职责: 冲突过滤 + 相关性评分 + 负载快照 + 确定性排序
// 红线: 含 BLOCKING 证据的候选不可指派;
//       show_blocked 模式下仅作透明展示
// 红线: 排序必须确定: 得分降序 → 可用度降序
//       → 近期评审数升序 → reviewer_id 升序
// ==========================================

use crate::config::AssignConfigReader;
use crate::domain::conflict::ConflictEvidence;
use crate::domain::manuscript::Manuscript;
use crate::domain::workload::WorkloadSnapshot;
use crate::engine::{ConflictEngine, RelevanceScorer, WorkloadTracker};
use crate::repository::{ReviewerRepository, WorkloadRepository};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tracing::{instrument, warn};

// ==========================================
// CandidateResult - 单候选排序结果
// ==========================================
/// 返回给编辑端的候选完整视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub reviewer_id: String,
    pub relevance_score: f64,
    pub relevance_reasons: Vec<String>,
    pub conflicts: Vec<ConflictEvidence>,
    pub eligible: bool, // 无 BLOCKING 证据
    pub availability_score: f64,
    pub recent_review_count: i32,
    pub workload: WorkloadSnapshot,
}

// ==========================================
// CandidateRanker - 候选排序器
// ==========================================
pub struct CandidateRanker<C>
where
    C: AssignConfigReader,
{
    reviewer_repo: Arc<ReviewerRepository>,
    conflict_engine: ConflictEngine<C>,
    workload_tracker: WorkloadTracker,
    config: Arc<C>,
}

impl<C> CandidateRanker<C>
where
    C: AssignConfigReader,
{
    /// 创建新的 CandidateRanker 实例
    ///
    /// # 参数
    /// - reviewer_repo: 评审人档案与关系数据仓库
    /// - workload_repo: 负载设置仓库
    /// - config: 配置读取器
    pub fn new(
        reviewer_repo: Arc<ReviewerRepository>,
        workload_repo: Arc<WorkloadRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            conflict_engine: ConflictEngine::new(reviewer_repo.clone(), config.clone()),
            workload_tracker: WorkloadTracker::new(workload_repo),
            reviewer_repo,
            config,
        }
    }

    /// 对候选评审人集合排序
    ///
    /// # 参数
    /// - manuscript: 稿件
    /// - candidate_reviewer_ids: 外部检索协作方提供的候选集
    /// - show_blocked: 透明模式,保留含 BLOCKING 证据的候选 (仅展示)
    /// - today: 当前日期
    ///
    /// # 流程 (Review_Engine_Specs 5.1)
    /// 1. 冲突评估,非 show_blocked 模式剔除 BLOCKING 候选
    /// 2. 相关性评分
    /// 3. 附加负载快照 (截止日按评审人首选周期推算)
    /// 4. 确定性排序
    #[instrument(skip(self, manuscript, candidate_reviewer_ids), fields(manuscript_id = %manuscript.manuscript_id, candidates = candidate_reviewer_ids.len()))]
    pub async fn rank(
        &self,
        manuscript: &Manuscript,
        candidate_reviewer_ids: &[String],
        show_blocked: bool,
        today: NaiveDate,
    ) -> Result<Vec<CandidateResult>, Box<dyn Error>> {
        let profiles = self.reviewer_repo.find_profiles(candidate_reviewer_ids)?;
        let default_deadline_days = self.config.get_default_review_deadline_days().await?;

        // 档案缺失的候选跳过,不中断整批排序
        if profiles.len() < candidate_reviewer_ids.len() {
            let found: Vec<&str> = profiles.iter().map(|p| p.reviewer_id.as_str()).collect();
            for id in candidate_reviewer_ids {
                if !found.contains(&id.as_str()) {
                    warn!(reviewer_id = %id, "候选档案缺失,跳过");
                }
            }
        }

        let mut results = Vec::with_capacity(profiles.len());

        for profile in &profiles {
            // === 步骤 1: 冲突评估 ===
            let (eligible, conflicts) = self
                .conflict_engine
                .check_eligibility(&profile.reviewer_id, manuscript, today)
                .await?;
            if !eligible && !show_blocked {
                continue;
            }

            // === 步骤 2: 相关性评分 ===
            let (relevance_score, relevance_reasons) = RelevanceScorer::score(manuscript, profile);

            // === 步骤 3: 负载快照 ===
            let deadline_days = self
                .workload_tracker
                .find_settings(&profile.reviewer_id)?
                .map(|s| s.preferred_deadline_days)
                .unwrap_or(default_deadline_days);
            let proposed_due_date = today + Duration::days(deadline_days);
            let workload = self.workload_tracker.snapshot(
                &profile.reviewer_id,
                profile.availability,
                proposed_due_date,
            )?;

            results.push(CandidateResult {
                reviewer_id: profile.reviewer_id.clone(),
                relevance_score,
                relevance_reasons,
                conflicts,
                eligible,
                availability_score: profile.availability_score(),
                recent_review_count: profile.recent_review_count,
                workload,
            });
        }

        // === 步骤 4: 确定性排序 ===
        Self::sort_candidates(&mut results);
        Ok(results)
    }

    /// 确定性排序: 得分降序 → 可用度降序 → 近期评审数升序 → id 升序
    fn sort_candidates(results: &mut [CandidateResult]) {
        results.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| b.availability_score.total_cmp(&a.availability_score))
                .then_with(|| a.recent_review_count.cmp(&b.recent_review_count))
                .then_with(|| a.reviewer_id.cmp(&b.reviewer_id))
        });
    }
}
