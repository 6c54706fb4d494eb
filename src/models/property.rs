// src/models/property.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::{AREA, MONEY, fit_decimal, required};
use crate::common::error::AppError;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "unit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Vacant,
    Occupied,
    UnderMaintenance,
    Reserved,
}

// ---
// 1. Property (o prédio / condomínio)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    // Dono opcional; vira NULL quando o usuário é removido
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    #[validate(custom(function = "required"), length(max = 100))]
    pub name: String,
    #[validate(custom(function = "required"), length(max = 255))]
    pub address: String,
    #[validate(custom(function = "required"), length(max = 100))]
    pub city: String,
    pub owner_id: Option<i64>,
}

impl Record for Property {
    const TABLE: Table = Table::Properties;
    type Draft = NewProperty;

    fn as_draft(&self) -> NewProperty {
        NewProperty {
            name: self.name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            owner_id: self.owner_id,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "address" => Some(self.address.clone()),
            _ => None,
        }
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "owner_id" => self.owner_id,
            _ => None,
        }
    }

    fn clear_foreign_key(&mut self, column: &str) {
        if column == "owner_id" {
            self.owner_id = None;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewProperty {
    type Record = Property;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Property {
        Property {
            id,
            name: self.name,
            address: self.address,
            city: self.city,
            owner_id: self.owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---
// 2. Unit (o espaço alugável dentro de uma Property)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: i64,
    pub property_id: i64,
    pub unit_number: String,
    pub bedrooms: i32,
    pub area_sqm: Option<Decimal>,
    pub status: UnitStatus,
    pub monthly_rent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    pub property_id: i64,
    #[validate(custom(function = "required"), length(max = 20))]
    pub unit_number: String,
    #[serde(default)]
    pub bedrooms: i32,
    pub area_sqm: Option<Decimal>,
    #[serde(default)]
    pub status: UnitStatus,
    pub monthly_rent: Decimal,
}

impl Record for Unit {
    const TABLE: Table = Table::Units;
    type Draft = NewUnit;

    fn as_draft(&self) -> NewUnit {
        NewUnit {
            property_id: self.property_id,
            unit_number: self.unit_number.clone(),
            bedrooms: self.bedrooms,
            area_sqm: self.area_sqm,
            status: self.status,
            monthly_rent: self.monthly_rent,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "property_id" => Some(self.property_id.to_string()),
            "unit_number" => Some(self.unit_number.clone()),
            _ => None,
        }
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "property_id" => Some(self.property_id),
            _ => None,
        }
    }

    fn check_constraints(&self) -> Result<(), &'static str> {
        if self.monthly_rent < Decimal::ZERO {
            return Err("ck_units_monthly_rent");
        }
        if self.bedrooms < 0 {
            return Err("ck_units_bedrooms");
        }
        Ok(())
    }

    fn fit_numeric(&mut self) -> Result<(), AppError> {
        fit_decimal(&mut self.monthly_rent, MONEY, Table::Units, "monthly_rent")?;
        if let Some(area) = self.area_sqm.as_mut() {
            fit_decimal(area, AREA, Table::Units, "area_sqm")?;
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewUnit {
    type Record = Unit;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Unit {
        Unit {
            id,
            property_id: self.property_id,
            unit_number: self.unit_number,
            bedrooms: self.bedrooms,
            area_sqm: self.area_sqm,
            status: self.status,
            monthly_rent: self.monthly_rent,
            created_at: now,
            updated_at: now,
        }
    }
}
