// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::required;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

// ---
// 1. Role (o "Cargo")
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    #[validate(custom(function = "required"), length(max = 50))]
    pub name: String,
    pub description: Option<String>,
}

impl Record for Role {
    const TABLE: Table = Table::Roles;
    type Draft = NewRole;

    fn as_draft(&self) -> NewRole {
        NewRole {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            _ => None,
        }
    }
}

impl NewRecord for NewRole {
    type Record = Role;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Role {
        Role {
            id,
            name: self.name,
            description: self.description,
            created_at: now,
        }
    }
}

// ---
// 2. User (conta de funcionário/sistema)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub role_id: i64,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub full_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub role_id: i64,
    #[validate(custom(function = "required"), length(max = 50))]
    pub username: String,
    #[validate(
        custom(function = "required"),
        email(message = "O e-mail fornecido é inválido."),
        length(max = 100)
    )]
    pub email: String,
    #[validate(custom(function = "required"), length(max = 255))]
    pub password_hash: String,
    #[validate(custom(function = "required"), length(max = 100))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

impl Record for User {
    const TABLE: Table = Table::Users;
    type Draft = NewUser;

    fn as_draft(&self) -> NewUser {
        NewUser {
            role_id: self.role_id,
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "username" => Some(self.username.clone()),
            "email" => Some(self.email.clone()),
            _ => None,
        }
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "role_id" => Some(self.role_id),
            _ => None,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewUser {
    type Record = User;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> User {
        User {
            id,
            role_id: self.role_id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            phone: self.phone,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// Dados para registro de um novo usuário (senha em texto puro, antes do hash)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(custom(function = "required"), length(max = 50))]
    pub role_name: String,
    #[validate(custom(function = "required"), length(max = 50))]
    pub username: String,
    #[validate(
        custom(function = "required"),
        email(message = "O e-mail fornecido é inválido."),
        length(max = 100)
    )]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(custom(function = "required"), length(max = 100))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}
