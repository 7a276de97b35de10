//! Certification catalog and awarded certificates.

use crate::model::certification::{Certification, CertificationId, EmployeeCertification};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    date_to_db, employee_is_active, ensure_connection_ready, optional_date_to_db, parse_date,
    parse_optional_date, parse_unsigned, parse_uuid, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const CERTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    name,
    issuing_organization,
    validity_months,
    description
FROM certifications";

const AWARD_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    employee_id,
    certification_id,
    issued_on,
    expires_on,
    credential_id
FROM employee_certifications";

#[derive(Debug, Clone, Default)]
pub struct AwardListQuery {
    pub employee_id: Option<EmployeeId>,
    pub certification_id: Option<CertificationId>,
}

pub trait CertificationRepository {
    fn create_certification(&self, certification: &Certification) -> RepoResult<CertificationId>;
    fn update_certification(&self, certification: &Certification) -> RepoResult<()>;
    fn get_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> RepoResult<Option<Certification>>;
    fn list_certifications(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Certification>>;
    fn soft_delete_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> RepoResult<()>;

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
    fn create_award(&self, award: &EmployeeCertification) -> RepoResult<Uuid>;
    fn update_award(&self, award: &EmployeeCertification) -> RepoResult<()>;
    fn get_award(
        &self,
        workspace_id: WorkspaceId,
        id: Uuid,
    ) -> RepoResult<Option<EmployeeCertification>>;
    fn list_awards(
        &self,
        workspace_id: WorkspaceId,
        query: &AwardListQuery,
    ) -> RepoResult<Vec<EmployeeCertification>>;
    /// Awards expiring on or before `until`, soonest first.
    fn list_awards_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<EmployeeCertification>>;
    fn soft_delete_award(&self, workspace_id: WorkspaceId, id: Uuid) -> RepoResult<()>;
}

pub struct SqliteCertificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCertificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["certifications", "employee_certifications"])?;
        Ok(Self { conn })
    }
}

impl CertificationRepository for SqliteCertificationRepository<'_> {
    fn create_certification(&self, certification: &Certification) -> RepoResult<CertificationId> {
        certification.validate()?;
        self.conn.execute(
            "INSERT INTO certifications (
                id,
                workspace_id,
                name,
                issuing_organization,
                validity_months,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                certification.id.to_string(),
                certification.workspace_id.to_string(),
                certification.name.as_str(),
                certification.issuing_organization.as_str(),
                certification.validity_months,
                certification.description.as_deref(),
            ],
        )?;
        Ok(certification.id)
    }

    fn update_certification(&self, certification: &Certification) -> RepoResult<()> {
        certification.validate()?;
        let changed = self.conn.execute(
            "UPDATE certifications
             SET
                name = ?1,
                issuing_organization = ?2,
                validity_months = ?3,
                description = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5 AND workspace_id = ?6 AND is_deleted = 0;",
            params![
                certification.name.as_str(),
                certification.issuing_organization.as_str(),
                certification.validity_months,
                certification.description.as_deref(),
                certification.id.to_string(),
                certification.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("certification", certification.id));
        }
        Ok(())
    }

    fn get_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> RepoResult<Option<Certification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CERTIFICATION_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_certification_row(row)?));
        }
        Ok(None)
    }

    fn list_certifications(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Certification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CERTIFICATION_SELECT_SQL}
             WHERE workspace_id = ?1 AND is_deleted = 0
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string()])?;
        let mut certifications = Vec::new();
        while let Some(row) = rows.next()? {
            certifications.push(parse_certification_row(row)?);
        }
        Ok(certifications)
    }

    fn soft_delete_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE certifications
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("certification", id));
        }
        Ok(())
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }

    fn create_award(&self, award: &EmployeeCertification) -> RepoResult<Uuid> {
        award.validate()?;
        self.conn.execute(
            "INSERT INTO employee_certifications (
                id,
                workspace_id,
                employee_id,
                certification_id,
                issued_on,
                expires_on,
                credential_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                award.id.to_string(),
                award.workspace_id.to_string(),
                award.employee_id.to_string(),
                award.certification_id.to_string(),
                date_to_db(award.issued_on),
                optional_date_to_db(award.expires_on),
                award.credential_id.as_deref(),
            ],
        )?;
        Ok(award.id)
    }

    fn update_award(&self, award: &EmployeeCertification) -> RepoResult<()> {
        award.validate()?;
        let changed = self.conn.execute(
            "UPDATE employee_certifications
             SET
                issued_on = ?1,
                expires_on = ?2,
                credential_id = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4 AND workspace_id = ?5 AND is_deleted = 0;",
            params![
                date_to_db(award.issued_on),
                optional_date_to_db(award.expires_on),
                award.credential_id.as_deref(),
                award.id.to_string(),
                award.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("employee certification", award.id));
        }
        Ok(())
    }

    fn get_award(
        &self,
        workspace_id: WorkspaceId,
        id: Uuid,
    ) -> RepoResult<Option<EmployeeCertification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AWARD_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_award_row(row)?));
        }
        Ok(None)
    }

    fn list_awards(
        &self,
        workspace_id: WorkspaceId,
        query: &AwardListQuery,
    ) -> RepoResult<Vec<EmployeeCertification>> {
        let mut sql = format!("{AWARD_SELECT_SQL} WHERE workspace_id = ? AND is_deleted = 0");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];
        if let Some(employee_id) = query.employee_id {
            sql.push_str(" AND employee_id = ?");
            bind_values.push(Value::Text(employee_id.to_string()));
        }
        if let Some(certification_id) = query.certification_id {
            sql.push_str(" AND certification_id = ?");
            bind_values.push(Value::Text(certification_id.to_string()));
        }
        sql.push_str(" ORDER BY issued_on DESC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut awards = Vec::new();
        while let Some(row) = rows.next()? {
            awards.push(parse_award_row(row)?);
        }
        Ok(awards)
    }

    fn list_awards_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<EmployeeCertification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AWARD_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND expires_on IS NOT NULL
               AND expires_on <= ?2
             ORDER BY expires_on ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string(), date_to_db(until)])?;
        let mut awards = Vec::new();
        while let Some(row) = rows.next()? {
            awards.push(parse_award_row(row)?);
        }
        Ok(awards)
    }

    fn soft_delete_award(&self, workspace_id: WorkspaceId, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE employee_certifications
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("employee certification", id));
        }
        Ok(())
    }
}

fn parse_certification_row(row: &Row<'_>) -> RepoResult<Certification> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let validity: Option<i64> = row.get(4)?;
    Ok(Certification {
        id: parse_uuid(&id, "certifications.id")?,
        workspace_id: parse_uuid(&workspace_id, "certifications.workspace_id")?,
        name: row.get(2)?,
        issuing_organization: row.get(3)?,
        validity_months: validity
            .map(|months| parse_unsigned(months, "certifications.validity_months"))
            .transpose()?,
        description: row.get(5)?,
    })
}

fn parse_award_row(row: &Row<'_>) -> RepoResult<EmployeeCertification> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let certification_id: String = row.get(3)?;
    let issued_on: String = row.get(4)?;
    Ok(EmployeeCertification {
        id: parse_uuid(&id, "employee_certifications.id")?,
        workspace_id: parse_uuid(&workspace_id, "employee_certifications.workspace_id")?,
        employee_id: parse_uuid(&employee_id, "employee_certifications.employee_id")?,
        certification_id: parse_uuid(
            &certification_id,
            "employee_certifications.certification_id",
        )?,
        issued_on: parse_date(&issued_on, "employee_certifications.issued_on")?,
        expires_on: parse_optional_date(row.get(5)?, "employee_certifications.expires_on")?,
        credential_id: row.get(6)?,
    })
}
