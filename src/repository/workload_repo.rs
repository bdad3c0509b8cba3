// ==========================================
// 同行评审分配系统 - 负载设置数据仓储
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 4. Workload Tracker
// 依据: TD-002 并发预留设计
// 红线: 预留必须单条条件 UPDATE 原子完成,禁止先读后写
// 红线: 版本化更新不触碰 current_assignments
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::workload::{AutoDeclineRule, BlackoutRange, WorkloadSettings};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 负载设置仓储
/// 职责: 管理 workload_settings 表,承载原子预留/释放
pub struct WorkloadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkloadRepository {
    /// 创建新的 WorkloadRepository 实例
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

    /// 插入或整体替换负载设置(初始化/测试种子用)
    pub fn upsert_settings(&self, s: &WorkloadSettings) -> RepositoryResult<()> {
        let blackouts_json = serde_json::to_string(&s.blackout_ranges)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let rules_json = serde_json::to_string(&s.auto_decline_rules)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO workload_settings (
                reviewer_id, monthly_capacity, current_assignments,
                preferred_deadline_days, blackout_ranges_json,
                auto_decline_rules_json, revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                s.reviewer_id,
                s.monthly_capacity,
                s.current_assignments,
                s.preferred_deadline_days,
                blackouts_json,
                rules_json,
                s.revision,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 按 reviewer_id 查询负载设置
    pub fn find_by_reviewer(&self, reviewer_id: &str) -> RepositoryResult<Option<WorkloadSettings>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reviewer_id, monthly_capacity, current_assignments,
                   preferred_deadline_days, blackout_ranges_json,
                   auto_decline_rules_json, revision, updated_at
            FROM workload_settings
            WHERE reviewer_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![reviewer_id], Self::map_row);
        match result {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 条件预留: current_assignments < monthly_capacity 时原子 +1
    ///
    /// # 返回
    /// - Ok(true): 预留成功
    /// - Ok(false): 容量已满,未预留
    /// - Err(NotFound): 评审人无负载设置记录
    ///
    /// # 说明
    /// 条件 UPDATE 本身就是原子的检查加增量,互斥锁只保护连接;
    /// 两个并发预留争抢最后一个名额时至多一个返回 true
    pub fn try_reserve(&self, reviewer_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE workload_settings
            SET current_assignments = current_assignments + 1,
                updated_at = ?2
            WHERE reviewer_id = ?1
              AND current_assignments < monthly_capacity
            "#,
            params![reviewer_id, Utc::now().to_rfc3339()],
        )?;

        if rows == 1 {
            return Ok(true);
        }

        // 区分"容量满"与"记录不存在"
        let exists: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM workload_settings WHERE reviewer_id = ?1",
                params![reviewer_id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound {
                entity: "WorkloadSettings".to_string(),
                id: reviewer_id.to_string(),
            }),
        }
    }

    /// 覆写预留: 无条件 +1 (容量不变,可越限)
    pub fn force_reserve(&self, reviewer_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE workload_settings
            SET current_assignments = current_assignments + 1,
                updated_at = ?2
            WHERE reviewer_id = ?1
            "#,
            params![reviewer_id, Utc::now().to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkloadSettings".to_string(),
                id: reviewer_id.to_string(),
            });
        }
        Ok(())
    }

    /// 释放: 原子 -1,下限 0
    pub fn release(&self, reviewer_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE workload_settings
            SET current_assignments = MAX(current_assignments - 1, 0),
                updated_at = ?2
            WHERE reviewer_id = ?1
            "#,
            params![reviewer_id, Utc::now().to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkloadSettings".to_string(),
                id: reviewer_id.to_string(),
            });
        }
        Ok(())
    }

    /// 乐观锁更新设置 (容量/周期/屏蔽期/规则)
    ///
    /// # 参数
    /// - s: 期望写入的设置内容
    /// - expected_revision: 调用方读到的版本号
    ///
    /// # 返回
    /// - Ok(new_revision): 更新成功,版本号 +1
    /// - Err(OptimisticLockFailure): 版本不匹配,调用方需重读重试
    ///
    /// # 说明
    /// current_assignments 不在更新列内,在途计数只经预留/释放变更
    pub fn update_settings_versioned(
        &self,
        s: &WorkloadSettings,
        expected_revision: i32,
    ) -> RepositoryResult<i32> {
        let blackouts_json = serde_json::to_string(&s.blackout_ranges)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let rules_json = serde_json::to_string(&s.auto_decline_rules)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE workload_settings
            SET monthly_capacity = ?2,
                preferred_deadline_days = ?3,
                blackout_ranges_json = ?4,
                auto_decline_rules_json = ?5,
                revision = revision + 1,
                updated_at = ?6
            WHERE reviewer_id = ?1
              AND revision = ?7
            "#,
            params![
                s.reviewer_id,
                s.monthly_capacity,
                s.preferred_deadline_days,
                blackouts_json,
                rules_json,
                Utc::now().to_rfc3339(),
                expected_revision,
            ],
        )?;

        if rows == 1 {
            return Ok(expected_revision + 1);
        }

        let actual: Option<i32> = conn
            .query_row(
                "SELECT revision FROM workload_settings WHERE reviewer_id = ?1",
                params![s.reviewer_id],
                |row| row.get(0),
            )
            .optional()?;
        match actual {
            Some(actual) => Err(RepositoryError::OptimisticLockFailure {
                reviewer_id: s.reviewer_id.clone(),
                expected: expected_revision,
                actual,
            }),
            None => Err(RepositoryError::NotFound {
                entity: "WorkloadSettings".to_string(),
                id: s.reviewer_id.clone(),
            }),
        }
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<WorkloadSettings> {
        let blackout_ranges: Vec<BlackoutRange> = row
            .get::<_, Option<String>>(4)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let auto_decline_rules: Vec<AutoDeclineRule> = row
            .get::<_, Option<String>>(5)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(WorkloadSettings {
            reviewer_id: row.get(0)?,
            monthly_capacity: row.get(1)?,
            current_assignments: row.get(2)?,
            preferred_deadline_days: row.get(3)?,
            blackout_ranges,
            auto_decline_rules,
            revision: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
