// src/models/tenancy.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::common::db_utils::{MONEY, fit_decimal, required};
use crate::common::error::AppError;
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_cycle", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lease_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    #[default]
    Active,
    Ended,
    Terminated,
}

// ---
// 1. Tenant (o "Inquilino")
// ---
// Existe independente de qualquer contrato
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub national_id: String,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    #[validate(custom(function = "required"), length(max = 20))]
    pub national_id: String,
    #[validate(custom(function = "required"), length(max = 100))]
    pub full_name: String,
    #[validate(custom(function = "required"), length(max = 20))]
    pub phone: String,
    #[validate(email(message = "O e-mail fornecido é inválido."), length(max = 100))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
}

impl Record for Tenant {
    const TABLE: Table = Table::Tenants;
    type Draft = NewTenant;

    fn as_draft(&self) -> NewTenant {
        NewTenant {
            national_id: self.national_id.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            emergency_contact_name: self.emergency_contact_name.clone(),
            emergency_contact_phone: self.emergency_contact_phone.clone(),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "national_id" => Some(self.national_id.clone()),
            _ => None,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewTenant {
    type Record = Tenant;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Tenant {
        Tenant {
            id,
            national_id: self.national_id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            emergency_contact_name: self.emergency_contact_name,
            emergency_contact_phone: self.emergency_contact_phone,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---
// 2. Lease (o "Contrato" Inquilino <-> Unidade)
// ---
// `rent_amount` é uma cópia do valor acordado; não acompanha o preço atual da unidade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: i64,
    pub unit_id: i64,
    pub tenant_id: i64,
    pub lease_start: NaiveDate,
    // None = contrato sem data de término
    pub lease_end: Option<NaiveDate>,
    pub rent_amount: Decimal,
    pub deposit_amount: Decimal,
    pub billing_cycle: BillingCycle,
    pub status: LeaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLease {
    pub unit_id: i64,
    pub tenant_id: i64,
    pub lease_start: NaiveDate,
    pub lease_end: Option<NaiveDate>,
    pub rent_amount: Decimal,
    #[serde(default)]
    pub deposit_amount: Decimal,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub status: LeaseStatus,
}

impl Record for Lease {
    const TABLE: Table = Table::Leases;
    type Draft = NewLease;

    fn as_draft(&self) -> NewLease {
        NewLease {
            unit_id: self.unit_id,
            tenant_id: self.tenant_id,
            lease_start: self.lease_start,
            lease_end: self.lease_end,
            rent_amount: self.rent_amount,
            deposit_amount: self.deposit_amount,
            billing_cycle: self.billing_cycle,
            status: self.status,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "unit_id" => Some(self.unit_id.to_string()),
            "tenant_id" => Some(self.tenant_id.to_string()),
            "lease_start" => Some(self.lease_start.to_string()),
            _ => None,
        }
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "unit_id" => Some(self.unit_id),
            "tenant_id" => Some(self.tenant_id),
            _ => None,
        }
    }

    fn check_constraints(&self) -> Result<(), &'static str> {
        if self.rent_amount < Decimal::ZERO || self.deposit_amount < Decimal::ZERO {
            return Err("ck_leases_amounts");
        }
        if self.lease_end.is_some_and(|end| end < self.lease_start) {
            return Err("ck_leases_period");
        }
        Ok(())
    }

    fn fit_numeric(&mut self) -> Result<(), AppError> {
        fit_decimal(&mut self.rent_amount, MONEY, Table::Leases, "rent_amount")?;
        fit_decimal(&mut self.deposit_amount, MONEY, Table::Leases, "deposit_amount")
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewLease {
    type Record = Lease;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Lease {
        Lease {
            id,
            unit_id: self.unit_id,
            tenant_id: self.tenant_id,
            lease_start: self.lease_start,
            lease_end: self.lease_end,
            rent_amount: self.rent_amount,
            deposit_amount: self.deposit_amount,
            billing_cycle: self.billing_cycle,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}
