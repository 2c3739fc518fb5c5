use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment row joined with the counterpart user's display fields.
/// Which side is populated depends on the caller's role: a patient sees
/// doctor fields (specialty/hospital), a doctor sees patient fields
/// (age/gender).
#[derive(Debug, FromRow, Serialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub counterpart_name: String,
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True if the given user is one of the two parties on this appointment.
    /// No implicit admin override: exact id match only.
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }

    /// True if the given user is the owning patient. Mutations (update,
    /// delete, document attach/remove) are patient-only.
    pub fn owned_by(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id
    }

    pub async fn create(
        pool: &PgPool,
        patient_id: Uuid,
        doctor_id: Uuid,
        appointment_date: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let appointment = Appointment {
            patient_id,
            doctor_id,
            appointment_date,
            notes: notes.map(str::to_string),
            ..Default::default()
        };

        sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments
                (id, patient_id, doctor_id, appointment_date, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_date)
        .bind(&appointment.notes)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent appointments for a user, counterpart fields populated
    /// according to the caller's role. The unused side's columns come back
    /// NULL so one row shape serves both roles.
    pub async fn list_for(
        pool: &PgPool,
        user_id: Uuid,
        role: Role,
        limit: i64,
    ) -> Result<Vec<AppointmentSummary>, sqlx::Error> {
        let sql = match role {
            Role::Patient => {
                r#"
                SELECT a.id, a.patient_id, a.doctor_id, a.appointment_date, a.notes,
                       u.name AS counterpart_name, u.specialty, u.hospital,
                       NULL::int AS age, NULL::text AS gender,
                       a.created_at, a.updated_at
                FROM appointments a
                JOIN users u ON u.id = a.doctor_id
                WHERE a.patient_id = $1
                ORDER BY a.appointment_date DESC
                LIMIT $2
                "#
            }
            Role::Doctor => {
                r#"
                SELECT a.id, a.patient_id, a.doctor_id, a.appointment_date, a.notes,
                       u.name AS counterpart_name, NULL::text AS specialty, NULL::text AS hospital,
                       u.age, u.gender,
                       a.created_at, a.updated_at
                FROM appointments a
                JOIN users u ON u.id = a.patient_id
                WHERE a.doctor_id = $1
                ORDER BY a.appointment_date DESC
                LIMIT $2
                "#
            }
        };

        sqlx::query_as::<_, AppointmentSummary>(sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Counterpart-joined view of a single appointment for the given role.
    pub async fn summary_for(
        pool: &PgPool,
        id: Uuid,
        role: Role,
    ) -> Result<Option<AppointmentSummary>, sqlx::Error> {
        let sql = match role {
            Role::Patient => {
                r#"
                SELECT a.id, a.patient_id, a.doctor_id, a.appointment_date, a.notes,
                       u.name AS counterpart_name, u.specialty, u.hospital,
                       NULL::int AS age, NULL::text AS gender,
                       a.created_at, a.updated_at
                FROM appointments a
                JOIN users u ON u.id = a.doctor_id
                WHERE a.id = $1
                "#
            }
            Role::Doctor => {
                r#"
                SELECT a.id, a.patient_id, a.doctor_id, a.appointment_date, a.notes,
                       u.name AS counterpart_name, NULL::text AS specialty, NULL::text AS hospital,
                       u.age, u.gender,
                       a.created_at, a.updated_at
                FROM appointments a
                JOIN users u ON u.id = a.patient_id
                WHERE a.id = $1
                "#
            }
        };

        sqlx::query_as::<_, AppointmentSummary>(sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        appointment_date: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments SET
                appointment_date = COALESCE($2, appointment_date),
                notes = COALESCE($3, notes),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(appointment_date)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Deletes the appointment; its documents go with it (cascade FK).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl Default for Appointment {
    fn default() -> Self {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::nil(),
            doctor_id: Uuid::nil(),
            appointment_date: Utc::now(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_check_matches_exactly() {
        let patient = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let appointment = Appointment {
            patient_id: patient,
            doctor_id: doctor,
            ..Default::default()
        };

        assert!(appointment.is_party(patient));
        assert!(appointment.is_party(doctor));
        assert!(!appointment.is_party(stranger));
    }

    #[test]
    fn only_the_patient_owns_the_appointment() {
        let patient = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let appointment = Appointment {
            patient_id: patient,
            doctor_id: doctor,
            ..Default::default()
        };

        assert!(appointment.owned_by(patient));
        assert!(!appointment.owned_by(doctor));
    }
}
