// ==========================================
// 负载设置集成测试
// ==========================================
// 测试范围:
// 1. 读-改-写循环与丢失更新防护 (乐观锁)
// 2. 规则/屏蔽区间经 JSON 列持久化后跨连接可读
// 3. 设置校验
// ==========================================


use std::sync::{Arc, Mutex};

use peer_review_engine::api::{ApiError, WorkloadApi};
use peer_review_engine::domain::workload::{AutoDeclineRule, BlackoutRange, WorkloadSettings};
use peer_review_engine::engine::WorkloadTracker;
use peer_review_engine::repository::{ActivityLogRepository, WorkloadRepository};

use test_helpers::{create_test_db, date, open_test_connection};

fn build_workload_api(db_path: &str) -> WorkloadApi {
    let conn = Arc::new(Mutex::new(open_test_connection(db_path).unwrap()));
    let workload_repo = Arc::new(WorkloadRepository::from_connection(conn.clone()));
    let activity_log_repo = Arc::new(ActivityLogRepository::from_connection(conn));
    WorkloadApi::new(Arc::new(WorkloadTracker::new(workload_repo)), activity_log_repo)
}

#[test]
fn test_lost_update_prevented_then_retry_succeeds() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = build_workload_api(&db_path);
    api.save_settings(&WorkloadSettings::new("R1".to_string(), 5), "editor01")
        .unwrap();

    // 两个会话各自读到 revision=0
    let session_a = api.get_settings("R1").unwrap();
    let session_b = api.get_settings("R1").unwrap();

    // 会话A先提交
    let mut a_settings = session_a.clone();
    a_settings.monthly_capacity = 8;
    api.update_settings(&a_settings, session_a.revision, "editor_a")
        .unwrap();

    // 会话B携带过期版本提交: 拒绝,避免覆盖A的修改
    let mut b_settings = session_b.clone();
    b_settings.monthly_capacity = 2;
    let err = api
        .update_settings(&b_settings, session_b.revision, "editor_b")
        .unwrap_err();
    assert!(matches!(err, ApiError::OptimisticLockFailure(_)));

    // 会话B重读后重试: 成功,且A的容量已可见
    let fresh = api.get_settings("R1").unwrap();
    assert_eq!(fresh.monthly_capacity, 8);
    let mut retry = fresh.clone();
    retry.monthly_capacity = 2;
    api.update_settings(&retry, fresh.revision, "editor_b")
        .unwrap();
    assert_eq!(api.get_settings("R1").unwrap().monthly_capacity, 2);
}

#[test]
fn test_settings_roundtrip_across_connections() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = build_workload_api(&db_path);

    api.save_settings(&WorkloadSettings::new("R1".to_string(), 5), "editor01")
        .unwrap();
    api.upsert_rule(
        "R1",
        AutoDeclineRule {
            rule_id: "AD1".to_string(),
            name: "高负载保护".to_string(),
            enabled: true,
            max_workload_percentage: Some(80.0),
            min_days_to_deadline: Some(10),
        },
        "R1",
    )
    .unwrap();
    api.add_blackout(
        "R1",
        BlackoutRange::new(date(2026, 9, 1), date(2026, 9, 15)),
        "R1",
    )
    .unwrap();

    // 另开连接读取: JSON 列反序列化完整
    let api2 = build_workload_api(&db_path);
    let loaded = api2.get_settings("R1").unwrap();
    assert_eq!(loaded.auto_decline_rules.len(), 1);
    assert_eq!(loaded.auto_decline_rules[0].rule_id, "AD1");
    assert_eq!(
        loaded.auto_decline_rules[0].max_workload_percentage,
        Some(80.0)
    );
    assert_eq!(loaded.blackout_ranges.len(), 1);
    assert!(loaded.blackout_ranges[0].contains(date(2026, 9, 1)));
    assert!(!loaded.blackout_ranges[0].contains(date(2026, 9, 15)));
}

#[test]
fn test_capacity_must_be_positive() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = build_workload_api(&db_path);
    api.save_settings(&WorkloadSettings::new("R1".to_string(), 5), "editor01")
        .unwrap();

    let mut settings = api.get_settings("R1").unwrap();
    settings.monthly_capacity = 0;
    let revision = settings.revision;
    let err = api
        .update_settings(&settings, revision, "editor01")
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}
