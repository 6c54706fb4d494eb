// src/db/pg_record.rs

// SQL de escrita de cada tabela. Leituras usam `SELECT *` + FromRow, então só
// INSERT e UPDATE precisam ser escritos à mão.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};

use crate::models::audit::AuditLog;
use crate::models::auth::{Role, User};
use crate::models::finance::{Invoice, Payment};
use crate::models::maintenance::MaintenanceRequest;
use crate::models::property::{Property, Unit};
use crate::models::record::Record;
use crate::models::reminder::Reminder;
use crate::models::tenancy::{Lease, Tenant};

pub type PgQueryAs<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

pub trait PgRecord: Record + for<'r> FromRow<'r, PgRow> {
    const INSERT_SQL: &'static str;

    /// `$1` é sempre o id; `None` para tabelas que só aceitam INSERT.
    const UPDATE_SQL: Option<&'static str>;

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self>;

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self>;
}

impl PgRecord for Role {
    const INSERT_SQL: &'static str =
        "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING *";
    const UPDATE_SQL: Option<&'static str> =
        Some("UPDATE roles SET name = $2, description = $3 WHERE id = $1 RETURNING *");

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query.bind(&draft.name).bind(&draft.description)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query.bind(self.id).bind(&self.name).bind(&self.description)
    }
}

impl PgRecord for User {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO users (role_id, username, email, password_hash, full_name, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE users
        SET role_id = $2, username = $3, email = $4, password_hash = $5,
            full_name = $6, phone = $7, is_active = $8, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.role_id)
            .bind(&draft.username)
            .bind(&draft.email)
            .bind(&draft.password_hash)
            .bind(&draft.full_name)
            .bind(&draft.phone)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.role_id)
            .bind(&self.username)
            .bind(&self.email)
            .bind(&self.password_hash)
            .bind(&self.full_name)
            .bind(&self.phone)
            .bind(self.is_active)
    }
}

impl PgRecord for Property {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO properties (name, address, city, owner_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE properties
        SET name = $2, address = $3, city = $4, owner_id = $5, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&draft.name)
            .bind(&draft.address)
            .bind(&draft.city)
            .bind(draft.owner_id)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.address)
            .bind(&self.city)
            .bind(self.owner_id)
    }
}

impl PgRecord for Unit {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO units (property_id, unit_number, bedrooms, area_sqm, status, monthly_rent)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE units
        SET property_id = $2, unit_number = $3, bedrooms = $4, area_sqm = $5,
            status = $6, monthly_rent = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.property_id)
            .bind(&draft.unit_number)
            .bind(draft.bedrooms)
            .bind(draft.area_sqm)
            .bind(draft.status)
            .bind(draft.monthly_rent)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.property_id)
            .bind(&self.unit_number)
            .bind(self.bedrooms)
            .bind(self.area_sqm)
            .bind(self.status)
            .bind(self.monthly_rent)
    }
}

impl PgRecord for Tenant {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO tenants (
            national_id, full_name, phone, email,
            emergency_contact_name, emergency_contact_phone
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE tenants
        SET national_id = $2, full_name = $3, phone = $4, email = $5,
            emergency_contact_name = $6, emergency_contact_phone = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&draft.national_id)
            .bind(&draft.full_name)
            .bind(&draft.phone)
            .bind(&draft.email)
            .bind(&draft.emergency_contact_name)
            .bind(&draft.emergency_contact_phone)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(&self.national_id)
            .bind(&self.full_name)
            .bind(&self.phone)
            .bind(&self.email)
            .bind(&self.emergency_contact_name)
            .bind(&self.emergency_contact_phone)
    }
}

impl PgRecord for Lease {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO leases (
            unit_id, tenant_id, lease_start, lease_end,
            rent_amount, deposit_amount, billing_cycle, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE leases
        SET unit_id = $2, tenant_id = $3, lease_start = $4, lease_end = $5,
            rent_amount = $6, deposit_amount = $7, billing_cycle = $8, status = $9,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.unit_id)
            .bind(draft.tenant_id)
            .bind(draft.lease_start)
            .bind(draft.lease_end)
            .bind(draft.rent_amount)
            .bind(draft.deposit_amount)
            .bind(draft.billing_cycle)
            .bind(draft.status)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.unit_id)
            .bind(self.tenant_id)
            .bind(self.lease_start)
            .bind(self.lease_end)
            .bind(self.rent_amount)
            .bind(self.deposit_amount)
            .bind(self.billing_cycle)
            .bind(self.status)
    }
}

impl PgRecord for Invoice {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO invoices (
            lease_id, invoice_number, period_start, period_end, due_date, amount, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE invoices
        SET lease_id = $2, invoice_number = $3, period_start = $4, period_end = $5,
            due_date = $6, amount = $7, status = $8, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.lease_id)
            .bind(&draft.invoice_number)
            .bind(draft.period_start)
            .bind(draft.period_end)
            .bind(draft.due_date)
            .bind(draft.amount)
            .bind(draft.status)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.lease_id)
            .bind(&self.invoice_number)
            .bind(self.period_start)
            .bind(self.period_end)
            .bind(self.due_date)
            .bind(self.amount)
            .bind(self.status)
    }
}

impl PgRecord for Payment {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO payments (invoice_id, amount, method, reference, received_by, paid_at)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()))
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE payments
        SET invoice_id = $2, amount = $3, method = $4, reference = $5,
            received_by = $6, paid_at = $7
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.invoice_id)
            .bind(draft.amount)
            .bind(draft.method)
            .bind(&draft.reference)
            .bind(draft.received_by)
            .bind(draft.paid_at)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.invoice_id)
            .bind(self.amount)
            .bind(self.method)
            .bind(&self.reference)
            .bind(self.received_by)
            .bind(self.paid_at)
    }
}

impl PgRecord for MaintenanceRequest {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO maintenance_requests (unit_id, tenant_id, description, priority)
        VALUES ($1, $2, $3, $4)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE maintenance_requests
        SET unit_id = $2, tenant_id = $3, description = $4, priority = $5,
            status = $6, resolved_at = $7, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.unit_id)
            .bind(draft.tenant_id)
            .bind(&draft.description)
            .bind(draft.priority)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.unit_id)
            .bind(self.tenant_id)
            .bind(&self.description)
            .bind(self.priority)
            .bind(self.status)
            .bind(self.resolved_at)
    }
}

impl PgRecord for Reminder {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO reminders (lease_id, tenant_id, user_id, message, remind_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = Some(
        r#"
        UPDATE reminders
        SET lease_id = $2, tenant_id = $3, user_id = $4, message = $5,
            remind_at = $6, is_sent = $7
        WHERE id = $1
        RETURNING *
        "#,
    );

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.lease_id)
            .bind(draft.tenant_id)
            .bind(draft.user_id)
            .bind(&draft.message)
            .bind(draft.remind_at)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.id)
            .bind(self.lease_id)
            .bind(self.tenant_id)
            .bind(self.user_id)
            .bind(&self.message)
            .bind(self.remind_at)
            .bind(self.is_sent)
    }
}

impl PgRecord for AuditLog {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO audit_logs (user_id, action, details)
        VALUES ($1, $2, $3)
        RETURNING *
    "#;
    const UPDATE_SQL: Option<&'static str> = None;

    fn bind_insert<'q>(draft: &'q Self::Draft, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(draft.user_id)
            .bind(&draft.action)
            .bind(&draft.details)
    }

    fn bind_update<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    fn sql_of<T: PgRecord>() -> (&'static str, Option<&'static str>) {
        (T::INSERT_SQL, T::UPDATE_SQL)
    }

    #[test]
    fn statements_target_their_own_table() {
        let statements = [
            (Role::TABLE, sql_of::<Role>()),
            (User::TABLE, sql_of::<User>()),
            (Property::TABLE, sql_of::<Property>()),
            (Unit::TABLE, sql_of::<Unit>()),
            (Tenant::TABLE, sql_of::<Tenant>()),
            (Lease::TABLE, sql_of::<Lease>()),
            (Invoice::TABLE, sql_of::<Invoice>()),
            (Payment::TABLE, sql_of::<Payment>()),
            (MaintenanceRequest::TABLE, sql_of::<MaintenanceRequest>()),
            (Reminder::TABLE, sql_of::<Reminder>()),
            (AuditLog::TABLE, sql_of::<AuditLog>()),
        ];

        for (table, (insert, update)) in statements {
            assert!(insert.contains(&format!("INSERT INTO {} ", table)), "{}", table);
            assert!(insert.contains("RETURNING *"), "{}", table);
            match update {
                Some(sql) => {
                    assert!(!table.is_append_only());
                    assert!(sql.contains(&format!("UPDATE {}", table)), "{}", table);
                    assert!(sql.contains("WHERE id = $1"), "{}", table);
                }
                None => assert_eq!(table, Table::AuditLogs),
            }
        }
    }
}
