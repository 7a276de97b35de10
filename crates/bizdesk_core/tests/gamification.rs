mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::gamification::{Achievement, LeaderboardPeriod, UserAchievement};
use bizdesk_core::model::workspace::User;
use bizdesk_core::repo::gamification_repo::{GamificationRepository, SqliteGamificationRepository};
use bizdesk_core::service::gamification_service::{AwardOutcome, GamificationServiceError};
use bizdesk_core::GamificationService;
use chrono::NaiveDate;
use common::date;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

#[test]
fn awards_are_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn);
    let achievement = service
        .define_achievement(&Achievement::new(ws, "first_login", "First login", "onboarding", 10))
        .unwrap();

    let first = service
        .award_achievement(ws, seed.user.id, achievement.id)
        .unwrap();
    assert!(first.is_awarded());
    let again = service
        .award_achievement(ws, seed.user.id, achievement.id)
        .unwrap();
    assert_eq!(again, AwardOutcome::AlreadyEarned);
    assert_eq!(service.awards_for_user(ws, seed.user.id).unwrap().len(), 1);

    let err = service
        .award_achievement(ws, Uuid::new_v4(), achievement.id)
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::UserNotFound(_)));
    let err = service
        .award_achievement(ws, seed.user.id, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::AchievementNotFound(_)));
}

#[test]
fn definitions_are_validated() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn);

    service
        .define_achievement(&Achievement::new(ws, "mentor", "Mentor", "people", 25))
        .unwrap();
    let err = service
        .define_achievement(&Achievement::new(ws, "mentor", "Mentor again", "people", 25))
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::DuplicateCode(code) if code == "mentor"));

    let err = service
        .define_achievement(&Achievement::new(ws, "zero", "Zero", "people", 0))
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::Validation(_)));
    let err = service
        .define_achievement(&Achievement::new(ws, "all", "All", "Overall", 5))
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::Validation(_)));

    let mut retired = Achievement::new(ws, "retired", "Retired", "people", 5);
    retired.is_active = false;
    let retired = service.define_achievement(&retired).unwrap();
    let err = service
        .award_achievement(ws, seed.user.id, retired.id)
        .unwrap_err();
    assert!(matches!(err, GamificationServiceError::AchievementInactive(id) if id == retired.id));
    assert_eq!(service.list_achievements(ws, true).unwrap().len(), 1);
    assert_eq!(service.list_achievements(ws, false).unwrap().len(), 2);
}

#[test]
fn events_award_matching_achievements_once() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn);

    let mut learner = Achievement::new(ws, "learner", "Learner", "training", 15);
    learner.criteria = json!({ "events": ["training_completed"] });
    service.define_achievement(&learner).unwrap();
    let mut closer = Achievement::new(ws, "closer", "Closer", "sales", 20);
    closer.criteria = json!({ "events": ["deal_closed"], "min": 1 });
    service.define_achievement(&closer).unwrap();

    let earned = service
        .record_event(ws, seed.user.id, "training_completed")
        .unwrap();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].points, 15);
    assert!(service
        .record_event(ws, seed.user.id, "training_completed")
        .unwrap()
        .is_empty());
    assert!(service
        .record_event(ws, seed.user.id, "unknown_event")
        .unwrap()
        .is_empty());

    let today = chrono::Utc::now().date_naive();
    assert_eq!(
        service
            .user_points(ws, seed.user.id, LeaderboardPeriod::AllTime, today, "overall")
            .unwrap(),
        15
    );
    assert_eq!(
        service
            .user_points(ws, seed.user.id, LeaderboardPeriod::AllTime, today, "sales")
            .unwrap(),
        0
    );
}

#[test]
fn leaderboard_ranks_are_contiguous_with_deterministic_ties() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn);
    let repo = SqliteGamificationRepository::try_new(&conn).unwrap();

    let small = service
        .define_achievement(&Achievement::new(ws, "deal_small", "Small deal", "sales", 10))
        .unwrap();
    let big = service
        .define_achievement(&Achievement::new(ws, "deal_big", "Big deal", "sales", 20))
        .unwrap();
    let course = service
        .define_achievement(&Achievement::new(ws, "course", "Course", "learning", 30))
        .unwrap();

    let ada = common::register(&conn, "Ada", "ada@example.com");
    let bea = common::register(&conn, "Bea", "bea@example.com");
    let cal = common::register(&conn, "Cal", "cal@example.com");
    let dan = common::register(&conn, "Dan", "dan@example.com");

    grant(&repo, ws, &ada, &small, date(2025, 3, 2));
    grant(&repo, ws, &ada, &big, date(2025, 3, 10));
    grant(&repo, ws, &bea, &course, date(2025, 3, 5));
    grant(&repo, ws, &cal, &small, date(2025, 3, 11));
    grant(&repo, ws, &dan, &course, date(2025, 4, 2));

    let anchor = date(2025, 3, 13);
    let monthly = service
        .recompute_leaderboard(ws, LeaderboardPeriod::Monthly, anchor, "overall")
        .unwrap();
    let order: Vec<_> = monthly.iter().map(|e| (e.user_id, e.points, e.rank)).collect();
    // Ada and Bea tie on 30; Bea's last award is earlier.
    assert_eq!(
        order,
        vec![(bea.id, 30, 1), (ada.id, 30, 2), (cal.id, 10, 3)]
    );
    assert!(monthly.iter().all(|e| e.period_start == date(2025, 3, 1)));

    let sales = service
        .recompute_leaderboard(ws, LeaderboardPeriod::Monthly, anchor, "sales")
        .unwrap();
    let order: Vec<_> = sales.iter().map(|e| (e.user_id, e.rank)).collect();
    assert_eq!(order, vec![(ada.id, 1), (cal.id, 2)]);

    let weekly = service
        .recompute_leaderboard(ws, LeaderboardPeriod::Weekly, anchor, "Overall")
        .unwrap();
    let order: Vec<_> = weekly.iter().map(|e| (e.user_id, e.points)).collect();
    assert_eq!(order, vec![(ada.id, 20), (cal.id, 10)]);

    let stored = service
        .leaderboard(ws, LeaderboardPeriod::Monthly, date(2025, 3, 31), "overall", None)
        .unwrap();
    assert_eq!(stored, monthly);
    let top = service
        .leaderboard(ws, LeaderboardPeriod::Monthly, anchor, "overall", Some(2))
        .unwrap();
    assert_eq!(top.len(), 2);

    let cal_rank = service
        .user_rank(ws, cal.id, LeaderboardPeriod::Monthly, anchor, "overall")
        .unwrap()
        .unwrap();
    assert_eq!(cal_rank.rank, 3);
    assert!(service
        .user_rank(ws, dan.id, LeaderboardPeriod::Monthly, anchor, "overall")
        .unwrap()
        .is_none());

    let all_time = service
        .recompute_leaderboard(ws, LeaderboardPeriod::AllTime, anchor, "overall")
        .unwrap();
    let ranks: Vec<_> = all_time.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[test]
fn exact_ties_fall_back_to_user_id() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn);
    let repo = SqliteGamificationRepository::try_new(&conn).unwrap();
    let badge = service
        .define_achievement(&Achievement::new(ws, "badge", "Badge", "misc", 5))
        .unwrap();

    let eve = common::register(&conn, "Eve", "eve@example.com");
    let fay = common::register(&conn, "Fay", "fay@example.com");
    grant(&repo, ws, &eve, &badge, date(2024, 8, 1));
    grant(&repo, ws, &fay, &badge, date(2024, 8, 1));

    let board = service
        .recompute_leaderboard(ws, LeaderboardPeriod::Yearly, date(2024, 12, 31), "overall")
        .unwrap();
    let mut expected = vec![eve.id, fay.id];
    expected.sort();
    let actual: Vec<_> = board.iter().map(|e| e.user_id).collect();
    assert_eq!(actual, expected);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].rank, 2);

    // recomputing replaces the partition instead of appending to it
    let again = service
        .recompute_leaderboard(ws, LeaderboardPeriod::Yearly, date(2024, 1, 1), "overall")
        .unwrap();
    assert_eq!(again, board);
    let stored = service
        .leaderboard(ws, LeaderboardPeriod::Yearly, date(2024, 6, 1), "overall", None)
        .unwrap();
    assert_eq!(stored.len(), 2);
}

fn service(conn: &Connection) -> GamificationService<SqliteGamificationRepository<'_>> {
    GamificationService::new(SqliteGamificationRepository::try_new(conn).unwrap())
}

fn grant(
    repo: &SqliteGamificationRepository<'_>,
    workspace_id: Uuid,
    user: &User,
    achievement: &Achievement,
    on: NaiveDate,
) {
    let earned_at = on.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp_millis();
    let inserted = repo
        .award(&UserAchievement {
            id: Uuid::new_v4(),
            workspace_id,
            user_id: user.id,
            achievement_id: achievement.id,
            points: achievement.points,
            earned_at,
        })
        .unwrap();
    assert!(inserted);
}
