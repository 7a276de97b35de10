mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::certification::{Certification, CertificationStatus};
use bizdesk_core::repo::certification_repo::SqliteCertificationRepository;
use bizdesk_core::service::certification_service::CertificationServiceError;
use bizdesk_core::CertificationService;
use common::date;
use uuid::Uuid;

#[test]
fn award_defaults_expiry_from_validity() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service =
        CertificationService::new(SqliteCertificationRepository::try_new(&conn).unwrap());

    let mut cert = Certification::new(seed.workspace.id, "CKA", "CNCF");
    cert.validity_months = Some(36);
    let cert = service.create_certification(&cert).unwrap();

    let award = service
        .award_certification(
            seed.workspace.id,
            alice.id,
            cert.id,
            date(2024, 3, 1),
            None,
            Some("  LF-123 ".to_string()),
        )
        .unwrap();
    assert_eq!(award.expires_on, Some(date(2027, 3, 1)));
    assert_eq!(award.credential_id.as_deref(), Some("LF-123"));

    let explicit = service
        .award_certification(
            seed.workspace.id,
            alice.id,
            cert.id,
            date(2024, 3, 1),
            Some(date(2025, 1, 1)),
            None,
        )
        .unwrap();
    assert_eq!(explicit.expires_on, Some(date(2025, 1, 1)));
}

#[test]
fn status_transitions_with_reference_date() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service = CertificationService::new(SqliteCertificationRepository::try_new(&conn).unwrap())
        .with_warning_days(30);

    let mut cert = Certification::new(seed.workspace.id, "PMP", "PMI");
    cert.validity_months = Some(12);
    let cert = service.create_certification(&cert).unwrap();
    let award = service
        .award_certification(seed.workspace.id, alice.id, cert.id, date(2024, 1, 1), None, None)
        .unwrap();

    let status = |today| {
        service
            .certification_status(seed.workspace.id, award.id, today)
            .unwrap()
    };
    assert_eq!(status(date(2024, 6, 1)), CertificationStatus::Active);
    assert_eq!(status(date(2024, 12, 15)), CertificationStatus::ExpiringSoon);
    assert_eq!(status(date(2025, 1, 2)), CertificationStatus::Expired);

    let lifetime = service
        .create_certification(&Certification::new(seed.workspace.id, "BSc", "Uni"))
        .unwrap();
    let degree = service
        .award_certification(seed.workspace.id, alice.id, lifetime.id, date(2010, 6, 1), None, None)
        .unwrap();
    assert_eq!(
        service
            .certification_status(seed.workspace.id, degree.id, date(2030, 1, 1))
            .unwrap(),
        CertificationStatus::NoExpiry
    );
}

#[test]
fn renew_recomputes_expiry_and_listing_reports_status() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service =
        CertificationService::new(SqliteCertificationRepository::try_new(&conn).unwrap());

    let mut cert = Certification::new(seed.workspace.id, "CISSP", "ISC2");
    cert.validity_months = Some(12);
    let cert = service.create_certification(&cert).unwrap();
    let award = service
        .award_certification(seed.workspace.id, alice.id, cert.id, date(2023, 1, 1), None, None)
        .unwrap();

    let today = date(2024, 2, 1);
    let expiring = service
        .expiring_certifications(seed.workspace.id, today)
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].status, CertificationStatus::Expired);

    let renewed = service
        .renew(seed.workspace.id, award.id, date(2024, 1, 15), None)
        .unwrap();
    assert_eq!(renewed.expires_on, Some(date(2025, 1, 15)));
    assert!(service
        .expiring_certifications(seed.workspace.id, today)
        .unwrap()
        .is_empty());

    let held = service
        .list_for_employee(seed.workspace.id, alice.id, today)
        .unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].status, CertificationStatus::Active);
}

#[test]
fn missing_references_are_semantic_errors() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service =
        CertificationService::new(SqliteCertificationRepository::try_new(&conn).unwrap());

    let err = service
        .award_certification(
            seed.workspace.id,
            alice.id,
            Uuid::new_v4(),
            date(2024, 1, 1),
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CertificationServiceError::CertificationNotFound(_)));

    let cert = service
        .create_certification(&Certification::new(seed.workspace.id, "OSCP", "OffSec"))
        .unwrap();
    let err = service
        .award_certification(
            seed.workspace.id,
            Uuid::new_v4(),
            cert.id,
            date(2024, 1, 1),
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CertificationServiceError::EmployeeNotFound(_)));

    let err = service
        .revoke_award(seed.workspace.id, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, CertificationServiceError::AwardNotFound(_)));
}
