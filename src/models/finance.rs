// src/models/finance.rs

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

// Nenhuma transição é validada: o esquema aceita, por exemplo, `paid` -> `unpaid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    BankTransfer,
    Cheque,
    Card,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub lease_id: i64,
    pub invoice_number: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub lease_id: i64,
    #[validate(custom(function = "required"), length(max = 30))]
    pub invoice_number: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub status: InvoiceStatus,
}

impl Record for Invoice {
    const TABLE: Table = Table::Invoices;
    type Draft = NewInvoice;

    fn as_draft(&self) -> NewInvoice {
        NewInvoice {
            lease_id: self.lease_id,
            invoice_number: self.invoice_number.clone(),
            period_start: self.period_start,
            period_end: self.period_end,
            due_date: self.due_date,
            amount: self.amount,
            status: self.status,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_part(&self, column: &str) -> Option<String> {
        match column {
            "invoice_number" => Some(self.invoice_number.clone()),
            _ => None,
        }
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        match column {
            "lease_id" => Some(self.lease_id),
            _ => None,
        }
    }

    fn check_constraints(&self) -> Result<(), &'static str> {
        if self.amount < Decimal::ZERO {
            return Err("ck_invoices_amount");
        }
        if self.period_end < self.period_start {
            return Err("ck_invoices_period");
        }
        Ok(())
    }

    fn fit_numeric(&mut self) -> Result<(), AppError> {
        fit_decimal(&mut self.amount, MONEY, Table::Invoices, "amount")
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl NewRecord for NewInvoice {
    type Record = Invoice;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            lease_id: self.lease_id,
            invoice_number: self.invoice_number,
            period_start: self.period_start,
            period_end: self.period_end,
            due_date: self.due_date,
            amount: self.amount,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

// Recebimento contra uma fatura (várias por fatura)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Option<i64>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub invoice_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    pub received_by: Option<i64>,
    // Quando ausente, o momento da gravação
    pub paid_at: Option<DateTime<Utc>>,
}

impl Record for Payment {
    const TABLE: Table = Table::Payments;
    type Draft = NewPayment;

    fn as_draft(&self) -> NewPayment {
        NewPayment {
            invoice_id: self.invoice_id,
            amount: self.amount,
            method: self.method,
            reference: self.reference.clone(),
            received_by: self.received_by,
            paid_at: Some(self.paid_at),
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
            "invoice_id" => Some(self.invoice_id),
            "received_by" => self.received_by,
            _ => None,
        }
    }

    fn clear_foreign_key(&mut self, column: &str) {
        if column == "received_by" {
            self.received_by = None;
        }
    }

    fn check_constraints(&self) -> Result<(), &'static str> {
        if self.amount <= Decimal::ZERO {
            return Err("ck_payments_amount");
        }
        Ok(())
    }

    fn fit_numeric(&mut self) -> Result<(), AppError> {
        fit_decimal(&mut self.amount, MONEY, Table::Payments, "amount")
    }
}

impl NewRecord for NewPayment {
    type Record = Payment;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Payment {
        Payment {
            id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            method: self.method,
            reference: self.reference,
            received_by: self.received_by,
            paid_at: self.paid_at.unwrap_or(now),
            created_at: now,
        }
    }
}
