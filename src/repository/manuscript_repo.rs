// ==========================================
// 同行评审分配系统 - 稿件数据仓储
// ==========================================
// 依据: Editorial_Master_Spec.md - PART D 引擎铁律
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::manuscript::Manuscript;
use crate::domain::types::{ManuscriptStatus, Priority};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 稿件仓储
/// 职责: 管理 manuscript 表的 CRUD 操作
/// 红线: 不含业务逻辑,只负责数据访问
pub struct ManuscriptRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ManuscriptRepository {
    /// 创建新的 ManuscriptRepository 实例
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

    /// 插入或整体替换稿件(投稿系统同步入口)
    pub fn upsert(&self, m: &Manuscript) -> RepositoryResult<()> {
        let keywords_json = serde_json::to_string(&m.keywords)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let co_authors_json = serde_json::to_string(&m.co_author_ids)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO manuscript (
                manuscript_id, title, field_of_study, subfield, keywords_json,
                author_id, co_author_ids_json, status, priority, priority_override,
                submitted_at, created_at, updated_at, accepted_at, published_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                m.manuscript_id,
                m.title,
                m.field_of_study,
                m.subfield,
                keywords_json,
                m.author_id,
                co_authors_json,
                m.status.to_db_str(),
                m.priority.to_db_str(),
                m.priority_override.map(|p| p.to_db_str()),
                m.submitted_at.to_rfc3339(),
                m.created_at.to_rfc3339(),
                m.updated_at.to_rfc3339(),
                m.accepted_at.map(|dt| dt.to_rfc3339()),
                m.published_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 按 manuscript_id 查询稿件
    pub fn find_by_id(&self, manuscript_id: &str) -> RepositoryResult<Option<Manuscript>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                manuscript_id, title, field_of_study, subfield, keywords_json,
                author_id, co_author_ids_json, status, priority, priority_override,
                submitted_at, created_at, updated_at, accepted_at, published_at
            FROM manuscript
            WHERE manuscript_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![manuscript_id], Self::map_row);
        match result {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 更新稿件状态 (同时刷新 updated_at)
    pub fn update_status(
        &self,
        manuscript_id: &str,
        status: ManuscriptStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE manuscript SET status = ?2, updated_at = ?3 WHERE manuscript_id = ?1",
            params![manuscript_id, status.to_db_str(), Utc::now().to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Manuscript".to_string(),
                id: manuscript_id.to_string(),
            });
        }
        Ok(())
    }

    /// 刷新优先级缓存列
    ///
    /// 注意: 不触碰 updated_at,优先级刷新不算内容更新,
    /// 否则会反过来影响滞留天数计算
    pub fn update_priority_cache(
        &self,
        manuscript_id: &str,
        priority: Priority,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE manuscript SET priority = ?2 WHERE manuscript_id = ?1",
            params![manuscript_id, priority.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Manuscript".to_string(),
                id: manuscript_id.to_string(),
            });
        }
        Ok(())
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<Manuscript> {
        let keywords: Vec<String> = row
            .get::<_, Option<String>>(4)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let co_author_ids: Vec<String> = row
            .get::<_, Option<String>>(6)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(Manuscript {
            manuscript_id: row.get(0)?,
            title: row.get(1)?,
            field_of_study: row.get(2)?,
            subfield: row.get(3)?,
            keywords,
            author_id: row.get(5)?,
            co_author_ids,
            status: ManuscriptStatus::from_db_str(&row.get::<_, String>(7)?)
                .unwrap_or(ManuscriptStatus::Submitted),
            priority: Priority::from_db_str(&row.get::<_, String>(8)?)
                .unwrap_or(Priority::Normal),
            priority_override: row
                .get::<_, Option<String>>(9)?
                .and_then(|s| Priority::from_db_str(&s)),
            submitted_at: parse_utc(&row.get::<_, String>(10)?),
            created_at: parse_utc(&row.get::<_, String>(11)?),
            updated_at: parse_utc(&row.get::<_, String>(12)?),
            accepted_at: row.get::<_, Option<String>>(13)?.map(|s| parse_utc(&s)),
            published_at: row.get::<_, Option<String>>(14)?.map(|s| parse_utc(&s)),
        })
    }
}

/// RFC3339 时间解析,失败时落到当前时刻
pub(crate) fn parse_utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
