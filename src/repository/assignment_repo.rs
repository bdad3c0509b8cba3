// ==========================================
// 同行评审分配系统 - 评审任务数据仓储
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 7. Assignment Lifecycle
// 红线: Repository 不含业务逻辑,状态机判定在编排器
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::assignment::ReviewAssignment;
use crate::domain::types::AssignmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::manuscript_repo::parse_utc;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 评审任务仓储
/// 职责: 管理 review_assignment 表的 CRUD 操作
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 创建新的 AssignmentRepository 实例
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

    /// 插入评审任务
    pub fn insert(&self, a: &ReviewAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO review_assignment (
                assignment_id, manuscript_id, reviewer_id, status,
                invited_at, responded_at, due_date, completed_at,
                decline_reason, capacity_override, override_reason,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                      datetime('now'), datetime('now'))
            "#,
            params![
                a.assignment_id,
                a.manuscript_id,
                a.reviewer_id,
                a.status.to_db_str(),
                a.invited_at.to_rfc3339(),
                a.responded_at.map(|dt| dt.to_rfc3339()),
                a.due_date.format("%Y-%m-%d").to_string(),
                a.completed_at.map(|dt| dt.to_rfc3339()),
                a.decline_reason,
                a.capacity_override as i32,
                a.override_reason,
            ],
        )?;
        Ok(())
    }

    /// 更新评审任务(状态迁移后的落库)
    pub fn update(&self, a: &ReviewAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE review_assignment
            SET status = ?2,
                responded_at = ?3,
                completed_at = ?4,
                decline_reason = ?5,
                updated_at = datetime('now')
            WHERE assignment_id = ?1
            "#,
            params![
                a.assignment_id,
                a.status.to_db_str(),
                a.responded_at.map(|dt| dt.to_rfc3339()),
                a.completed_at.map(|dt| dt.to_rfc3339()),
                a.decline_reason,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ReviewAssignment".to_string(),
                id: a.assignment_id.clone(),
            });
        }
        Ok(())
    }

    /// 按 assignment_id 查询
    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<ReviewAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE assignment_id = ?1", SELECT_BASE))?;

        let result = stmt.query_row(params![assignment_id], Self::map_row);
        match result {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询稿件的全部评审任务
    pub fn find_by_manuscript(&self, manuscript_id: &str) -> RepositoryResult<Vec<ReviewAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE manuscript_id = ?1 ORDER BY invited_at, assignment_id",
            SELECT_BASE
        ))?;

        let assignments = stmt
            .query_map(params![manuscript_id], Self::map_row)?
            .collect::<SqliteResult<Vec<ReviewAssignment>>>()?;
        Ok(assignments)
    }

    /// 查询 (稿件, 评审人) 组合的在途任务 (INVITED/ACCEPTED)
    ///
    /// 用途: 重复邀审守卫
    pub fn find_open_by_pair(
        &self,
        manuscript_id: &str,
        reviewer_id: &str,
    ) -> RepositoryResult<Option<ReviewAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE manuscript_id = ?1 AND reviewer_id = ?2
              AND status IN ('INVITED', 'ACCEPTED')
            LIMIT 1
            "#,
            SELECT_BASE
        ))?;

        let result = stmt.query_row(params![manuscript_id, reviewer_id], Self::map_row);
        match result {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部逾期未回应任务 (INVITED 且 due_date 早于 today)
    ///
    /// 用途: 过期批量清扫入口
    pub fn find_overdue_invited(&self, today: NaiveDate) -> RepositoryResult<Vec<ReviewAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE status = 'INVITED' AND due_date < ?1
            ORDER BY due_date, assignment_id
            "#,
            SELECT_BASE
        ))?;

        let assignments = stmt
            .query_map(params![today.format("%Y-%m-%d").to_string()], Self::map_row)?
            .collect::<SqliteResult<Vec<ReviewAssignment>>>()?;
        Ok(assignments)
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<ReviewAssignment> {
        Ok(ReviewAssignment {
            assignment_id: row.get(0)?,
            manuscript_id: row.get(1)?,
            reviewer_id: row.get(2)?,
            status: AssignmentStatus::from_db_str(&row.get::<_, String>(3)?)
                .unwrap_or(AssignmentStatus::Invited),
            invited_at: parse_utc(&row.get::<_, String>(4)?),
            responded_at: row.get::<_, Option<String>>(5)?.map(|s| parse_utc(&s)),
            due_date: row
                .get::<_, String>(6)?
                .parse::<NaiveDate>()
                .unwrap_or_else(|_| Utc::now().date_naive()),
            completed_at: row.get::<_, Option<String>>(7)?.map(|s| parse_utc(&s)),
            decline_reason: row.get(8)?,
            capacity_override: row.get::<_, i32>(9)? != 0,
            override_reason: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

const SELECT_BASE: &str = r#"
    SELECT assignment_id, manuscript_id, reviewer_id, status,
           invited_at, responded_at, due_date, completed_at,
           decline_reason, capacity_override, override_reason,
           created_at, updated_at
    FROM review_assignment
"#;
