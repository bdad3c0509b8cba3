// ==========================================
// 同行评审分配系统 - 配置层
// ==========================================
// 依据: Review_Engine_Specs_v0.2.md - 9. 配置项全集
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod assign_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use assign_config_trait::AssignConfigReader;
pub use config_manager::{config_keys, ConfigManager};
