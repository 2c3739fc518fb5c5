use serde::Deserialize;

use crate::models::Role;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    // Optional profile fields accepted at signup
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// All fields optional; absent fields keep their stored value. Role and
/// email are not accepted here.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub phone: Option<String>,
}
