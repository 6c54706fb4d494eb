// src/schema.rs

// Catálogo declarativo do esquema: tabelas, chaves únicas e chaves estrangeiras.
// As migrações em `migrations/` são a versão SQL deste mesmo contrato; o MemoryStore
// usa o catálogo para aplicar as mesmas regras sem banco de dados.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Roles,
    Users,
    Properties,
    Units,
    Tenants,
    Leases,
    Invoices,
    Payments,
    MaintenanceRequests,
    Reminders,
    AuditLogs,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Roles,
        Table::Users,
        Table::Properties,
        Table::Units,
        Table::Tenants,
        Table::Leases,
        Table::Invoices,
        Table::Payments,
        Table::MaintenanceRequests,
        Table::Reminders,
        Table::AuditLogs,
    ];

    /// Nome da tabela no banco.
    pub const fn name(self) -> &'static str {
        match self {
            Table::Roles => "roles",
            Table::Users => "users",
            Table::Properties => "properties",
            Table::Units => "units",
            Table::Tenants => "tenants",
            Table::Leases => "leases",
            Table::Invoices => "invoices",
            Table::Payments => "payments",
            Table::MaintenanceRequests => "maintenance_requests",
            Table::Reminders => "reminders",
            Table::AuditLogs => "audit_logs",
        }
    }

    /// Tabelas que só aceitam INSERT pela aplicação.
    pub const fn is_append_only(self) -> bool {
        matches!(self, Table::AuditLogs)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferentialAction {
    Restrict,
    Cascade,
    SetNull,
}

impl ReferentialAction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub name: &'static str,
    pub table: Table,
    pub column: &'static str,
    pub references: Table,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub table: Table,
    pub columns: &'static [&'static str],
}

const fn fk(
    name: &'static str,
    table: Table,
    column: &'static str,
    references: Table,
    on_delete: ReferentialAction,
) -> ForeignKey {
    // Todas as FKs do esquema propagam alterações de chave (ON UPDATE CASCADE)
    ForeignKey {
        name,
        table,
        column,
        references,
        on_delete,
        on_update: ReferentialAction::Cascade,
    }
}

use ReferentialAction::{Cascade, Restrict, SetNull};

pub const FOREIGN_KEYS: &[ForeignKey] = &[
    fk("fk_users_role", Table::Users, "role_id", Table::Roles, Restrict),
    fk("fk_properties_owner", Table::Properties, "owner_id", Table::Users, SetNull),
    fk("fk_units_property", Table::Units, "property_id", Table::Properties, Cascade),
    fk("fk_leases_unit", Table::Leases, "unit_id", Table::Units, Restrict),
    fk("fk_leases_tenant", Table::Leases, "tenant_id", Table::Tenants, Restrict),
    fk("fk_invoices_lease", Table::Invoices, "lease_id", Table::Leases, Restrict),
    fk("fk_payments_invoice", Table::Payments, "invoice_id", Table::Invoices, Restrict),
    fk("fk_payments_received_by", Table::Payments, "received_by", Table::Users, SetNull),
    fk("fk_maintenance_unit", Table::MaintenanceRequests, "unit_id", Table::Units, Cascade),
    fk("fk_maintenance_tenant", Table::MaintenanceRequests, "tenant_id", Table::Tenants, SetNull),
    fk("fk_reminders_lease", Table::Reminders, "lease_id", Table::Leases, Cascade),
    fk("fk_reminders_tenant", Table::Reminders, "tenant_id", Table::Tenants, Cascade),
    fk("fk_reminders_user", Table::Reminders, "user_id", Table::Users, Cascade),
    fk("fk_audit_logs_user", Table::AuditLogs, "user_id", Table::Users, SetNull),
];

pub const UNIQUE_CONSTRAINTS: &[UniqueConstraint] = &[
    UniqueConstraint { name: "uq_roles_name", table: Table::Roles, columns: &["name"] },
    UniqueConstraint { name: "uq_users_username", table: Table::Users, columns: &["username"] },
    UniqueConstraint { name: "uq_users_email", table: Table::Users, columns: &["email"] },
    UniqueConstraint {
        name: "uq_properties_name_address",
        table: Table::Properties,
        columns: &["name", "address"],
    },
    UniqueConstraint {
        name: "uq_units_property_number",
        table: Table::Units,
        columns: &["property_id", "unit_number"],
    },
    UniqueConstraint {
        name: "uq_tenants_national_id",
        table: Table::Tenants,
        columns: &["national_id"],
    },
    UniqueConstraint {
        name: "uq_leases_unit_tenant_start",
        table: Table::Leases,
        columns: &["unit_id", "tenant_id", "lease_start"],
    },
    UniqueConstraint {
        name: "uq_invoices_number",
        table: Table::Invoices,
        columns: &["invoice_number"],
    },
];

/// FKs declaradas pela tabela (lado filho).
pub fn foreign_keys_of(table: Table) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.table == table)
}

/// FKs de outras tabelas que apontam para `table` (lado pai).
pub fn referencing(table: Table) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.references == table)
}

pub fn unique_constraints_of(table: Table) -> impl Iterator<Item = &'static UniqueConstraint> {
    UNIQUE_CONSTRAINTS.iter().filter(move |uq| uq.table == table)
}
