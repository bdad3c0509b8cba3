// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 验证各仓储在真实文件库上的持久化行为
// (JSON 列、关系查询、条件更新、日志排序)
// ==========================================


use chrono::{Duration, Utc};
use peer_review_engine::domain::activity_log::{ActivityLog, ActivityType};
use peer_review_engine::domain::assignment::ReviewAssignment;
use peer_review_engine::domain::reviewer::{
    AffiliationRecord, CoauthorshipRecord, FinancialDisclosure,
};
use peer_review_engine::domain::types::{AssignmentStatus, Priority};
use peer_review_engine::logging;
use peer_review_engine::repository::{
    ActivityLogRepository, AssignmentRepository, ManuscriptRepository, ReviewerRepository,
    WorkloadRepository,
};

use test_helpers::{create_test_db, date, sample_manuscript, sample_reviewer};

#[test]
fn test_manuscript_json_columns_roundtrip() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = ManuscriptRepository::new(&db_path).unwrap();

    let mut m = sample_manuscript("M001", "A1");
    m.co_author_ids = vec!["A2".to_string(), "A3".to_string()];
    m.priority_override = Some(Priority::High);
    repo.upsert(&m).unwrap();

    let loaded = repo.find_by_id("M001").unwrap().unwrap();
    assert_eq!(loaded.keywords, vec!["光纤", "增益"]);
    assert_eq!(loaded.co_author_ids, vec!["A2", "A3"]);
    assert_eq!(loaded.priority_override, Some(Priority::High));
    assert_eq!(loaded.all_author_ids(), vec!["A1", "A2", "A3"]);

    // 缓存列单独更新,不破坏其他字段
    repo.update_priority_cache("M001", Priority::Urgent).unwrap();
    let after = repo.find_by_id("M001").unwrap().unwrap();
    assert_eq!(after.priority, Priority::Urgent);
    assert_eq!(after.title, m.title);
}

#[test]
fn test_reviewer_relationship_queries() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = ReviewerRepository::new(&db_path).unwrap();

    repo.upsert_profile(&sample_reviewer("R1", &["photonics"])).unwrap();
    repo.replace_affiliations(
        "R1",
        &[
            AffiliationRecord {
                person_id: "R1".to_string(),
                institution: "清华大学".to_string(),
                start_year: 2018,
                end_year: None,
            },
            AffiliationRecord {
                person_id: "R1".to_string(),
                institution: "中科院物理所".to_string(),
                start_year: 2012,
                end_year: Some(2017),
            },
        ],
    )
    .unwrap();

    let affs = repo.find_affiliations("R1").unwrap();
    assert_eq!(affs.len(), 2);
    assert!(affs.iter().any(|a| a.is_current()));

    // 批量按人员查询 (作者侧取数用)
    let batch = repo
        .find_affiliations_of(&["R1".to_string(), "A9".to_string()])
        .unwrap();
    assert_eq!(batch.len(), 2);

    // 合著记录双向可查
    repo.add_coauthorship(&CoauthorshipRecord {
        person_id: "R1".to_string(),
        counterpart_id: "A1".to_string(),
        year: 2024,
    })
    .unwrap();
    assert_eq!(repo.find_coauthorships("R1").unwrap().len(), 1);
    assert_eq!(repo.find_coauthorships("A1").unwrap().len(), 1);

    repo.add_financial_disclosure(&FinancialDisclosure {
        reviewer_id: "R1".to_string(),
        counterparty_id: "A1".to_string(),
        nature: "同一初创公司股东".to_string(),
    })
    .unwrap();
    assert_eq!(repo.find_financial_disclosures("R1").unwrap().len(), 1);
}

#[test]
fn test_assignment_queries() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = AssignmentRepository::new(&db_path).unwrap();
    let today = Utc::now().date_naive();

    let mut overdue = ReviewAssignment::new("M001".to_string(), "R1".to_string(), today - Duration::days(3));
    repo.insert(&overdue).unwrap();
    let fresh = ReviewAssignment::new("M001".to_string(), "R2".to_string(), today + Duration::days(10));
    repo.insert(&fresh).unwrap();

    // 在途查询: INVITED/ACCEPTED 视为 open
    assert!(repo.find_open_by_pair("M001", "R1").unwrap().is_some());
    assert!(repo.find_open_by_pair("M001", "R9").unwrap().is_none());

    // 过期扫描只命中截止日已过的 INVITED
    let hits = repo.find_overdue_invited(today).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].reviewer_id, "R1");

    // 状态更新后不再是 open,也不再被扫描
    overdue.status = AssignmentStatus::Expired;
    repo.update(&overdue).unwrap();
    assert!(repo.find_open_by_pair("M001", "R1").unwrap().is_none());
    assert!(repo.find_overdue_invited(today).unwrap().is_empty());

    let all = repo.find_by_manuscript("M001").unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_release_never_goes_negative() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = WorkloadRepository::new(&db_path).unwrap();
    repo.upsert_settings(&peer_review_engine::domain::workload::WorkloadSettings::new(
        "R1".to_string(),
        2,
    ))
    .unwrap();

    assert!(repo.try_reserve("R1").unwrap());
    repo.release("R1").unwrap();
    // 已归零后再释放: 保持 0
    repo.release("R1").unwrap();
    let settings = repo.find_by_reviewer("R1").unwrap().unwrap();
    assert_eq!(settings.current_assignments, 0);
}

#[test]
fn test_activity_log_ordering_and_detail() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = ActivityLogRepository::new(&db_path).unwrap();

    for i in 0..3 {
        repo.insert(
            &ActivityLog::new(ActivityType::InviteCreated)
                .with_manuscript("M001")
                .with_reviewer(&format!("R{}", i))
                .with_detail(&serde_json::json!({"seq": i})),
        )
        .unwrap();
    }
    repo.insert(&ActivityLog::new(ActivityType::SettingsUpdated).with_reviewer("R9"))
        .unwrap();

    // 稿件维度: 只含该稿件,新在前
    let logs = repo.find_by_manuscript("M001").unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].reviewer_id.as_deref(), Some("R2"));
    assert!(logs[0].detail_json.as_deref().unwrap().contains("\"seq\":2"));

    // 全局最近 N 条
    let recent = repo.find_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].activity_type, ActivityType::SettingsUpdated);
}
