// ==========================================
// 同行评审分配系统 - 分配配置读取 Trait
// ==========================================
// 依据: Editorial_Master_Spec.md - PART E 工程结构
// 依据: Review_Engine_Specs_v0.2.md - 9. 配置项全集
// 职责: 定义冲突引擎与编排器所需的配置读取接口(不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// AssignConfigReader Trait
// ==========================================
// 用途: 冲突时效窗口与邀审默认参数的读取接口
// 实现者: ConfigManager(从 config_kv 表读取)
#[async_trait]
pub trait AssignConfigReader: Send + Sync {
    // ===== 冲突时效窗口 =====

    /// 获取机构任职冲突的时效窗口(年)
    ///
    /// # 返回
    /// - i32: 共同任职在最近 N 年内视为近期机构冲突
    ///
    /// # 默认值
    /// - 3
    async fn get_affiliation_recency_years(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取合著冲突的时效窗口(年)
    ///
    /// # 返回
    /// - i32: 合著发生在最近 N 年内视为近期合著冲突
    ///
    /// # 默认值
    /// - 3
    async fn get_coauthorship_recency_years(&self) -> Result<i32, Box<dyn Error>>;

    // ===== 邀审默认参数 =====

    /// 获取默认评审周期(天)
    ///
    /// # 返回
    /// - i64: 调用方未显式给出截止日时,以今天 + N 天作为截止日
    ///
    /// # 默认值
    /// - 21
    async fn get_default_review_deadline_days(&self) -> Result<i64, Box<dyn Error>>;
}
