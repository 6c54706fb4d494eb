// src/models/maintenance.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::required;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub id: i64,
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    pub description: String,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceRequest {
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    #[validate(custom(function = "required"))]
    pub description: String,
    #[serde(default)]
    pub priority: MaintenancePriority,
}

impl MaintenanceRequest {
    /// Fecha o chamado registrando o momento da resolução.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.status = MaintenanceStatus::Resolved;
        self.resolved_at = Some(at);
    }
}

impl Record for MaintenanceRequest {
    const TABLE: Table = Table::MaintenanceRequests;
    type Draft = NewMaintenanceRequest;

    fn as_draft(&self) -> NewMaintenanceRequest {
        NewMaintenanceRequest {
            unit_id: self.unit_id,
            tenant_id: self.tenant_id,
            description: self.description.clone(),
            priority: self.priority,
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
            "unit_id" => Some(self.unit_id),
            "tenant_id" => self.tenant_id,
            _ => None,
        }
    }

    fn clear_foreign_key(&mut self, column: &str) {
        if column == "tenant_id" {
            self.tenant_id = None;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewMaintenanceRequest {
    type Record = MaintenanceRequest;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> MaintenanceRequest {
        MaintenanceRequest {
            id,
            unit_id: self.unit_id,
            tenant_id: self.tenant_id,
            description: self.description,
            priority: self.priority,
            status: MaintenanceStatus::Open,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Store};

    #[tokio::test]
    async fn resolving_a_ticket_is_persisted() {
        use crate::models::property::{NewProperty, NewUnit};
        use rust_decimal::Decimal;

        let store = MemoryStore::new();
        let property = store
            .insert(NewProperty {
                name: "Riverside Plaza".into(),
                address: "Riverside Drive".into(),
                city: "Nairobi".into(),
                owner_id: None,
            })
            .await
            .unwrap();
        let unit = store
            .insert(NewUnit {
                property_id: property.id,
                unit_number: "Shop-1".into(),
                bedrooms: 0,
                area_sqm: None,
                status: Default::default(),
                monthly_rent: Decimal::new(30000, 0),
            })
            .await
            .unwrap();
        let mut ticket = store
            .insert(NewMaintenanceRequest {
                unit_id: unit.id,
                tenant_id: None,
                description: "Porta de enrolar travada".into(),
                priority: MaintenancePriority::Urgent,
            })
            .await
            .unwrap();
        assert_eq!(ticket.status, MaintenanceStatus::Open);

        let at = Utc::now();
        ticket.resolve(at);
        store.update(&ticket).await.unwrap();

        let saved = store.get::<MaintenanceRequest>(ticket.id).await.unwrap();
        assert_eq!(saved.status, MaintenanceStatus::Resolved);
        assert_eq!(saved.resolved_at, Some(at));
    }

    #[test]
    fn draft_defaults_to_medium_priority() {
        let draft: NewMaintenanceRequest =
            serde_json::from_str(r#"{"unitId": 1, "tenantId": null, "description": "Lâmpada"}"#).unwrap();
        assert_eq!(draft.priority, MaintenancePriority::Medium);
    }
}
