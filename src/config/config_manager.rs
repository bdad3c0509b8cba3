// ==========================================
// 同行评审分配系统 - 配置管理器
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 9. 配置项全集
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::assign_config_trait::AssignConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT 语义）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

// ==========================================
// AssignConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AssignConfigReader for ConfigManager {
    async fn get_affiliation_recency_years(&self) -> Result<i32, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::COI_AFFILIATION_RECENCY_YEARS, "3")?;
        Ok(value.parse::<i32>().unwrap_or(3))
    }

    async fn get_coauthorship_recency_years(&self) -> Result<i32, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::COI_COAUTHORSHIP_RECENCY_YEARS, "3")?;
        Ok(value.parse::<i32>().unwrap_or(3))
    }

    async fn get_default_review_deadline_days(&self) -> Result<i64, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::DEFAULT_REVIEW_DEADLINE_DAYS, "21")?;
        Ok(value.parse::<i64>().unwrap_or(21))
    }
}

// ==========================================
// 配置键常量 (依据 Review_Engine_Specs 9)
// ==========================================
pub mod config_keys {
    // 冲突时效窗口
    pub const COI_AFFILIATION_RECENCY_YEARS: &str = "coi_affiliation_recency_years";
    pub const COI_COAUTHORSHIP_RECENCY_YEARS: &str = "coi_coauthorship_recency_years";

    // 邀审默认参数
    pub const DEFAULT_REVIEW_DEADLINE_DAYS: &str = "default_review_deadline_days";
}
