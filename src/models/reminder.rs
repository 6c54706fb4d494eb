// src/models/reminder.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::required;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

// Lembrete agendado. O envio em si não é responsabilidade deste serviço,
// só a marcação `is_sent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub lease_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub user_id: Option<i64>,
    pub message: String,
    pub remind_at: DateTime<Utc>,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub lease_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub user_id: Option<i64>,
    #[validate(custom(function = "required"))]
    pub message: String,
    pub remind_at: DateTime<Utc>,
}

impl Record for Reminder {
    const TABLE: Table = Table::Reminders;
    type Draft = NewReminder;

    fn as_draft(&self) -> NewReminder {
        NewReminder {
            lease_id: self.lease_id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            message: self.message.clone(),
            remind_at: self.remind_at,
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
            "lease_id" => self.lease_id,
            "tenant_id" => self.tenant_id,
            "user_id" => self.user_id,
            _ => None,
        }
    }

    fn check_constraints(&self) -> Result<(), &'static str> {
        if self.lease_id.is_none() && self.tenant_id.is_none() && self.user_id.is_none() {
            return Err("ck_reminders_target");
        }
        Ok(())
    }
}

impl NewRecord for NewReminder {
    type Record = Reminder;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Reminder {
        Reminder {
            id,
            lease_id: self.lease_id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            message: self.message,
            remind_at: self.remind_at,
            is_sent: false,
            created_at: now,
        }
    }
}
