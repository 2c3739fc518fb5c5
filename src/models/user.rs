use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "role_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "PascalCase")] // JSON value name
pub enum Role {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    // Patient display fields
    pub age: Option<i32>,
    pub gender: Option<String>,
    // Doctor-only fields, ignored for the Patient role
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn create(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Self, sqlx::Error> {
        let user = User {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            ..Default::default()
        };

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// All registered doctors, for the patient-side booking picker.
    pub async fn list_doctors(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = $1 ORDER BY name")
            .bind(Role::Doctor)
            .fetch_all(pool)
            .await
    }

    /// Distinct patients who have booked with the given doctor.
    pub async fn patients_of(pool: &PgPool, doctor_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT DISTINCT u.* FROM users u
            JOIN appointments a ON a.patient_id = u.id
            WHERE a.doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_all(pool)
        .await
    }

    /// Updates mutable profile fields; absent fields keep their value.
    /// Role and email are immutable here.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<&str>,
        profile_image: Option<&str>,
        bio: Option<&str>,
        age: Option<i32>,
        gender: Option<&str>,
        specialty: Option<&str>,
        hospital: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                profile_image = COALESCE($3, profile_image),
                bio = COALESCE($4, bio),
                age = COALESCE($5, age),
                gender = COALESCE($6, gender),
                specialty = COALESCE($7, specialty),
                hospital = COALESCE($8, hospital),
                phone = COALESCE($9, phone),
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(profile_image)
        .bind(bio)
        .bind(age)
        .bind(gender)
        .bind(specialty)
        .bind(hospital)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }
}

impl Default for User {
    fn default() -> Self {
        User {
            id: Uuid::new_v4(),
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            role: Role::Patient,
            profile_image: None,
            bio: None,
            age: None,
            gender: None,
            specialty: None,
            hospital: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
