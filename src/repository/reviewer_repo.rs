// ==========================================
// 同行评审分配系统 - 评审人数据仓储
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 1.2 / 2.1
// 红线: Repository 不含业务逻辑
// 说明: 档案与冲突证据来源表均由外部档案库同步写入,
//       本仓储提供同步入口与只读查询
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reviewer::{
    AdvisoryLink, AffiliationRecord, CoauthorshipRecord, FinancialDisclosure, ReviewerProfile,
};
use crate::domain::types::AvailabilityStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 评审人仓储
/// 职责: 管理 reviewer 及冲突证据来源表的数据访问
pub struct ReviewerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewerRepository {
    /// 创建新的 ReviewerRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 档案 (reviewer 表)
    // ==========================================

    /// 插入或整体替换评审人档案
    pub fn upsert_profile(&self, r: &ReviewerProfile) -> RepositoryResult<()> {
        let expertise_json = serde_json::to_string(&r.expertise)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO reviewer (
                reviewer_id, full_name, expertise_json, quality_metric,
                recent_review_count, avg_turnaround_days, availability,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                      COALESCE(?8, datetime('now')), datetime('now'))
            "#,
            params![
                r.reviewer_id,
                r.full_name,
                expertise_json,
                r.quality_metric,
                r.recent_review_count,
                r.avg_turnaround_days,
                r.availability.to_db_str(),
                r.created_at,
            ],
        )?;
        Ok(())
    }

    /// 按 reviewer_id 查询档案
    pub fn find_profile(&self, reviewer_id: &str) -> RepositoryResult<Option<ReviewerProfile>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, full_name, expertise_json, quality_metric,
                   recent_review_count, avg_turnaround_days, availability,
                   created_at, updated_at
            FROM reviewer
            WHERE reviewer_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![reviewer_id], Self::map_profile_row);
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批量查询档案(候选集一次取回)
    pub fn find_profiles(&self, reviewer_ids: &[String]) -> RepositoryResult<Vec<ReviewerProfile>> {
        if reviewer_ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let placeholders = reviewer_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            r#"
            SELECT reviewer_id, full_name, expertise_json, quality_metric,
                   recent_review_count, avg_turnaround_days, availability,
                   created_at, updated_at
            FROM reviewer
            WHERE reviewer_id IN ({})
            ORDER BY reviewer_id
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn rusqlite::ToSql> = reviewer_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect();

        let profiles = stmt
            .query_map(params_vec.as_slice(), Self::map_profile_row)?
            .collect::<SqliteResult<Vec<ReviewerProfile>>>()?;
        Ok(profiles)
    }

    // ==========================================
    // 机构任职记录 (affiliation 表)
    // ==========================================

    /// 整体替换某人的任职记录(档案同步语义)
    pub fn replace_affiliations(
        &self,
        person_id: &str,
        records: &[AffiliationRecord],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM affiliation WHERE person_id = ?1", params![person_id])?;
        let mut count = 0;
        for rec in records {
            tx.execute(
                r#"
                INSERT INTO affiliation (person_id, institution, start_year, end_year)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![rec.person_id, rec.institution, rec.start_year, rec.end_year],
            )?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    /// 查询某人的全部任职记录
    pub fn find_affiliations(&self, person_id: &str) -> RepositoryResult<Vec<AffiliationRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT person_id, institution, start_year, end_year
            FROM affiliation
            WHERE person_id = ?1
            ORDER BY start_year
            "#,
        )?;

        let records = stmt
            .query_map(params![person_id], |row| {
                Ok(AffiliationRecord {
                    person_id: row.get(0)?,
                    institution: row.get(1)?,
                    start_year: row.get(2)?,
                    end_year: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<AffiliationRecord>>>()?;
        Ok(records)
    }

    /// 批量查询多人的任职记录(作者集合一次取回)
    pub fn find_affiliations_of(
        &self,
        person_ids: &[String],
    ) -> RepositoryResult<Vec<AffiliationRecord>> {
        if person_ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.get_conn()?;
        let placeholders = person_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            r#"
            SELECT person_id, institution, start_year, end_year
            FROM affiliation
            WHERE person_id IN ({})
            ORDER BY person_id, start_year
            "#,
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn rusqlite::ToSql> = person_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect();

        let records = stmt
            .query_map(params_vec.as_slice(), |row| {
                Ok(AffiliationRecord {
                    person_id: row.get(0)?,
                    institution: row.get(1)?,
                    start_year: row.get(2)?,
                    end_year: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<AffiliationRecord>>>()?;
        Ok(records)
    }

    // ==========================================
    // 合著记录 (coauthorship 表)
    // ==========================================

    /// 追加合著记录
    pub fn add_coauthorship(&self, rec: &CoauthorshipRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO coauthorship (person_id, counterpart_id, year)
            VALUES (?1, ?2, ?3)
            "#,
            params![rec.person_id, rec.counterpart_id, rec.year],
        )?;
        Ok(())
    }

    /// 查询某人的合著记录(双向: 本人在任一侧均返回)
    pub fn find_coauthorships(&self, person_id: &str) -> RepositoryResult<Vec<CoauthorshipRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT person_id, counterpart_id, year
            FROM coauthorship
            WHERE person_id = ?1 OR counterpart_id = ?1
            ORDER BY year DESC
            "#,
        )?;

        let records = stmt
            .query_map(params![person_id], |row| {
                Ok(CoauthorshipRecord {
                    person_id: row.get(0)?,
                    counterpart_id: row.get(1)?,
                    year: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<CoauthorshipRecord>>>()?;
        Ok(records)
    }

    // ==========================================
    // 师生关系 (advisory_link 表)
    // ==========================================

    /// 追加师生关系
    pub fn add_advisory_link(&self, link: &AdvisoryLink) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO advisory_link (advisor_id, advisee_id) VALUES (?1, ?2)",
            params![link.advisor_id, link.advisee_id],
        )?;
        Ok(())
    }

    /// 查询某人的师生关系(双向)
    pub fn find_advisory_links(&self, person_id: &str) -> RepositoryResult<Vec<AdvisoryLink>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT advisor_id, advisee_id
            FROM advisory_link
            WHERE advisor_id = ?1 OR advisee_id = ?1
            "#,
        )?;

        let links = stmt
            .query_map(params![person_id], |row| {
                Ok(AdvisoryLink {
                    advisor_id: row.get(0)?,
                    advisee_id: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<AdvisoryLink>>>()?;
        Ok(links)
    }

    // ==========================================
    // 经济利益申报 (financial_disclosure 表)
    // ==========================================

    /// 追加经济利益申报
    pub fn add_financial_disclosure(&self, d: &FinancialDisclosure) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO financial_disclosure (reviewer_id, counterparty_id, nature)
            VALUES (?1, ?2, ?3)
            "#,
            params![d.reviewer_id, d.counterparty_id, d.nature],
        )?;
        Ok(())
    }

    /// 查询某评审人的全部申报
    pub fn find_financial_disclosures(
        &self,
        reviewer_id: &str,
    ) -> RepositoryResult<Vec<FinancialDisclosure>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, counterparty_id, nature
            FROM financial_disclosure
            WHERE reviewer_id = ?1
            "#,
        )?;

        let disclosures = stmt
            .query_map(params![reviewer_id], |row| {
                Ok(FinancialDisclosure {
                    reviewer_id: row.get(0)?,
                    counterparty_id: row.get(1)?,
                    nature: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<FinancialDisclosure>>>()?;
        Ok(disclosures)
    }

    /// 档案行映射
    fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<ReviewerProfile> {
        let expertise: Vec<String> = row
            .get::<_, Option<String>>(2)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(ReviewerProfile {
            reviewer_id: row.get(0)?,
            full_name: row.get(1)?,
            expertise,
            quality_metric: row.get(3)?,
            recent_review_count: row.get(4)?,
            avg_turnaround_days: row.get(5)?,
            availability: AvailabilityStatus::from_db_str(&row.get::<_, String>(6)?)
                .unwrap_or(AvailabilityStatus::Available),
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
