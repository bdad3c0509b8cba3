// ==========================================
// 同行评审分配系统 - 活动日志数据仓储
// ==========================================
// 依据: Editorial_Master_Spec.md - PART A3 审计增强
// 依据: schema activity_log 表
// 红线: 所有状态变更必须记录
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::activity_log::{ActivityLog, ActivityType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 活动日志仓储
/// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActivityLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityLogRepository {
    /// 创建新的 ActivityLogRepository 实例
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

    /// 插入活动日志
    ///
    /// # 返回
    /// - Ok(activity_id): 成功插入
    pub fn insert(&self, log: &ActivityLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO activity_log (
                activity_id, activity_type, manuscript_id, reviewer_id,
                assignment_id, operator, detail_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
            "#,
            params![
                log.activity_id,
                log.activity_type.to_db_str(),
                log.manuscript_id,
                log.reviewer_id,
                log.assignment_id,
                log.operator,
                log.detail_json,
            ],
        )?;
        Ok(log.activity_id.clone())
    }

    /// 查询稿件的活动历史(时间倒序)
    pub fn find_by_manuscript(&self, manuscript_id: &str) -> RepositoryResult<Vec<ActivityLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, activity_id, activity_type, manuscript_id, reviewer_id,
                   assignment_id, operator, detail_json, created_at
            FROM activity_log
            WHERE manuscript_id = ?1
            ORDER BY id DESC
            "#,
        )?;

        let logs = stmt
            .query_map(params![manuscript_id], Self::map_row)?
            .collect::<SqliteResult<Vec<ActivityLog>>>()?;
        Ok(logs)
    }

    /// 查询最近 N 条活动(全局,时间倒序)
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActivityLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, activity_id, activity_type, manuscript_id, reviewer_id,
                   assignment_id, operator, detail_json, created_at
            FROM activity_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<ActivityLog>>>()?;
        Ok(logs)
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<ActivityLog> {
        let type_str: String = row.get(2)?;
        Ok(ActivityLog {
            id: row.get(0)?,
            activity_id: row.get(1)?,
            activity_type: ActivityType::from_db_str(&type_str)
                .unwrap_or(ActivityType::InviteCreated),
            manuscript_id: row.get(3)?,
            reviewer_id: row.get(4)?,
            assignment_id: row.get(5)?,
            operator: row.get(6)?,
            detail_json: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}
