// ==========================================
// 同行评审分配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 集中持有引擎自有的建表 DDL (init_schema)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化引擎自有的全部表结构(幂等)
///
/// 稿件/档案表由外部系统同步填充,表结构由本引擎定义;
/// workload_settings 与 review_assignment 为本引擎的权威数据。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS manuscript (
            manuscript_id       TEXT PRIMARY KEY,
            title               TEXT NOT NULL,
            field_of_study      TEXT NOT NULL,
            subfield            TEXT,
            keywords_json       TEXT,
            author_id           TEXT NOT NULL,
            co_author_ids_json  TEXT,
            status              TEXT NOT NULL DEFAULT 'SUBMITTED',
            priority            TEXT NOT NULL DEFAULT 'NORMAL',
            priority_override   TEXT,
            submitted_at        TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            accepted_at         TEXT,
            published_at        TEXT
        );

        CREATE TABLE IF NOT EXISTS reviewer (
            reviewer_id          TEXT PRIMARY KEY,
            full_name            TEXT NOT NULL,
            expertise_json       TEXT,
            quality_metric       REAL NOT NULL DEFAULT 0,
            recent_review_count  INTEGER NOT NULL DEFAULT 0,
            avg_turnaround_days  REAL NOT NULL DEFAULT 0,
            availability         TEXT NOT NULL DEFAULT 'AVAILABLE',
            created_at           TEXT,
            updated_at           TEXT
        );

        CREATE TABLE IF NOT EXISTS affiliation (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id   TEXT NOT NULL,
            institution TEXT NOT NULL,
            start_year  INTEGER NOT NULL,
            end_year    INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_affiliation_person ON affiliation(person_id);

        CREATE TABLE IF NOT EXISTS coauthorship (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id      TEXT NOT NULL,
            counterpart_id TEXT NOT NULL,
            year           INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_coauthorship_person ON coauthorship(person_id);
        CREATE INDEX IF NOT EXISTS idx_coauthorship_counterpart ON coauthorship(counterpart_id);

        CREATE TABLE IF NOT EXISTS advisory_link (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            advisor_id TEXT NOT NULL,
            advisee_id TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_advisory_advisor ON advisory_link(advisor_id);
        CREATE INDEX IF NOT EXISTS idx_advisory_advisee ON advisory_link(advisee_id);

        CREATE TABLE IF NOT EXISTS financial_disclosure (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            reviewer_id     TEXT NOT NULL,
            counterparty_id TEXT NOT NULL,
            nature          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_financial_reviewer ON financial_disclosure(reviewer_id);

        CREATE TABLE IF NOT EXISTS workload_settings (
            reviewer_id             TEXT PRIMARY KEY,
            monthly_capacity        INTEGER NOT NULL CHECK (monthly_capacity > 0),
            current_assignments     INTEGER NOT NULL DEFAULT 0 CHECK (current_assignments >= 0),
            preferred_deadline_days INTEGER NOT NULL DEFAULT 21,
            blackout_ranges_json    TEXT,
            auto_decline_rules_json TEXT,
            revision                INTEGER NOT NULL DEFAULT 0,
            updated_at              TEXT
        );

        CREATE TABLE IF NOT EXISTS review_assignment (
            assignment_id     TEXT PRIMARY KEY,
            manuscript_id     TEXT NOT NULL,
            reviewer_id       TEXT NOT NULL,
            status            TEXT NOT NULL DEFAULT 'INVITED',
            invited_at        TEXT NOT NULL,
            responded_at      TEXT,
            due_date          TEXT NOT NULL,
            completed_at      TEXT,
            decline_reason    TEXT,
            capacity_override INTEGER NOT NULL DEFAULT 0,
            override_reason   TEXT,
            created_at        TEXT,
            updated_at        TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_assignment_manuscript ON review_assignment(manuscript_id);
        CREATE INDEX IF NOT EXISTS idx_assignment_reviewer ON review_assignment(reviewer_id);
        CREATE INDEX IF NOT EXISTS idx_assignment_status_due ON review_assignment(status, due_date);

        CREATE TABLE IF NOT EXISTS activity_log (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_id   TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            manuscript_id TEXT,
            reviewer_id   TEXT,
            assignment_id TEXT,
            operator      TEXT NOT NULL DEFAULT 'system',
            detail_json   TEXT,
            created_at    TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_activity_manuscript ON activity_log(manuscript_id);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id   TEXT NOT NULL DEFAULT 'global',
            key        TEXT NOT NULL,
            value      TEXT,
            updated_at TEXT,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    Ok(())
}
