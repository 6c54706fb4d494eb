// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::required;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

/// Registro imutável de uma ação. O autor vira NULL se o usuário for removido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditLog {
    pub user_id: Option<i64>,
    #[validate(custom(function = "required"), length(max = 100))]
    pub action: String,
    pub details: Option<String>,
}

impl Record for AuditLog {
    const TABLE: Table = Table::AuditLogs;
    type Draft = NewAuditLog;

    fn as_draft(&self) -> NewAuditLog {
        NewAuditLog {
            user_id: self.user_id,
            action: self.action.clone(),
            details: self.details.clone(),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, _column: &str) -> Option<String> {
        None
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "user_id" => self.user_id,
            _ => None,
        }
    }

    fn clear_foreign_key(&mut self, column: &str) {
        if column == "user_id" {
            self.user_id = None;
        }
    }
}

impl NewRecord for NewAuditLog {
    type Record = AuditLog;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> AuditLog {
        AuditLog {
            id,
            user_id: self.user_id,
            action: self.action,
            details: self.details,
            created_at: now,
        }
    }
}
