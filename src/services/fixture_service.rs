// src/services/fixture_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{Store, Transactional, UnitOfWork},
    models::{
        audit::AuditLog,
        auth::{NewRole, NewUser, Role, User},
        finance::{Invoice, InvoiceStatus, NewInvoice, NewPayment, Payment, PaymentMethod},
        maintenance::MaintenanceRequest,
        property::{NewProperty, NewUnit, Property, Unit, UnitStatus},
        reminder::Reminder,
        tenancy::{BillingCycle, Lease, LeaseStatus, NewLease, NewTenant, Tenant},
    },
    schema::Table,
};

// Mesmos hashes da migration de seed (senhas: admin123 / manager123)
const ADMIN_PASSWORD_HASH: &str = "$2b$10$Rzwr51KkXmHEDf7gT1.8XuVBAxYQdDBRq.sJLbDkfii08pmAd1Dei";
const MANAGER_PASSWORD_HASH: &str = "$2b$10$XyayWTbmb5KjYR8SMtCG7uXyXSKXIFdesCdOp.7sKtJli2u6baTLe";

pub const FIXTURE_INVOICE_NUMBER: &str = "INV-2025-0001";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureReport {
    pub row_counts: BTreeMap<String, usize>,
    pub invoice_number: String,
    pub invoice_status: InvoiceStatus,
    pub amount_paid: Decimal,
}

pub struct FixtureService<S> {
    store: Arc<S>,
}

impl<S> Clone for FixtureService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow::anyhow!("Data inválida no fixture: {}-{}-{}", year, month, day).into())
}

fn ensure(condition: bool, message: &str) -> Result<(), AppError> {
    if condition {
        Ok(())
    } else {
        Err(AppError::FixtureMismatch(message.to_string()))
    }
}

impl<S: Transactional> FixtureService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Grava o cenário de referência, na mesma ordem da migration de seed.
    /// Tudo numa transação: se uma linha falhar, nenhuma fica gravada.
    pub async fn seed(&self) -> Result<(), AppError> {
        let tx = self.store.begin().await?;
        let store = &tx;

        // --- Cargos e usuários ---
        let admin_role = store
            .insert(NewRole {
                name: "admin".into(),
                description: Some("Acesso total ao sistema".into()),
            })
            .await?;
        let manager_role = store
            .insert(NewRole {
                name: "manager".into(),
                description: Some("Gerencia imóveis, contratos e cobranças".into()),
            })
            .await?;
        store
            .insert(NewRole {
                name: "owner".into(),
                description: Some("Proprietário de imóveis".into()),
            })
            .await?;

        store
            .insert(NewUser {
                role_id: admin_role.id,
                username: "admin".into(),
                email: "admin@example.com".into(),
                password_hash: ADMIN_PASSWORD_HASH.into(),
                full_name: "System Administrator".into(),
                phone: Some("+254700000001".into()),
            })
            .await?;
        let manager = store
            .insert(NewUser {
                role_id: manager_role.id,
                username: "manager1".into(),
                email: "manager1@example.com".into(),
                password_hash: MANAGER_PASSWORD_HASH.into(),
                full_name: "Property Manager".into(),
                phone: Some("+254700000002".into()),
            })
            .await?;

        // --- Imóveis e unidades ---
        let kilimani = store
            .insert(NewProperty {
                name: "Kilimani Apartments".into(),
                address: "Argwings Kodhek Road".into(),
                city: "Nairobi".into(),
                owner_id: Some(manager.id),
            })
            .await?;
        let riverside = store
            .insert(NewProperty {
                name: "Riverside Plaza".into(),
                address: "Riverside Drive".into(),
                city: "Nairobi".into(),
                owner_id: None,
            })
            .await?;

        let a101 = store
            .insert(NewUnit {
                property_id: kilimani.id,
                unit_number: "A101".into(),
                bedrooms: 2,
                area_sqm: Some(Decimal::new(7550, 2)),
                status: UnitStatus::Occupied,
                monthly_rent: Decimal::new(45000, 0),
            })
            .await?;
        store
            .insert(NewUnit {
                property_id: kilimani.id,
                unit_number: "A102".into(),
                bedrooms: 1,
                area_sqm: Some(Decimal::new(5200, 2)),
                status: UnitStatus::Vacant,
                monthly_rent: Decimal::new(35000, 0),
            })
            .await?;
        let shop = store
            .insert(NewUnit {
                property_id: riverside.id,
                unit_number: "Shop-1".into(),
                bedrooms: 0,
                area_sqm: Some(Decimal::new(4000, 2)),
                status: UnitStatus::Occupied,
                monthly_rent: Decimal::new(30000, 0),
            })
            .await?;

        // --- Inquilinos e contratos ---
        let james = store
            .insert(NewTenant {
                national_id: "12345678".into(),
                full_name: "James Osukuku".into(),
                phone: "+254712345678".into(),
                email: Some("james@example.com".into()),
                emergency_contact_name: Some("Mary Osukuku".into()),
                emergency_contact_phone: Some("+254722000111".into()),
            })
            .await?;
        let maximilla = store
            .insert(NewTenant {
                national_id: "23456789".into(),
                full_name: "Maximilla Sikuyu".into(),
                phone: "+254723456789".into(),
                email: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
            })
            .await?;

        let james_lease = store
            .insert(NewLease {
                unit_id: a101.id,
                tenant_id: james.id,
                lease_start: date(2025, 1, 1)?,
                lease_end: Some(date(2025, 12, 31)?),
                rent_amount: Decimal::new(45000, 0),
                deposit_amount: Decimal::new(45000, 0),
                billing_cycle: BillingCycle::Monthly,
                status: LeaseStatus::Active,
            })
            .await?;
        store
            .insert(NewLease {
                unit_id: shop.id,
                tenant_id: maximilla.id,
                lease_start: date(2025, 3, 15)?,
                lease_end: None,
                rent_amount: Decimal::new(30000, 0),
                deposit_amount: Decimal::new(60000, 0),
                billing_cycle: BillingCycle::Monthly,
                status: LeaseStatus::Active,
            })
            .await?;

        // --- Cobrança, pagamento e baixa ---
        let invoice = store
            .insert(NewInvoice {
                lease_id: james_lease.id,
                invoice_number: FIXTURE_INVOICE_NUMBER.into(),
                period_start: date(2025, 9, 1)?,
                period_end: date(2025, 9, 30)?,
                due_date: date(2025, 9, 5)?,
                amount: Decimal::new(45000, 0),
                status: InvoiceStatus::Unpaid,
            })
            .await?;

        store
            .insert(NewPayment {
                invoice_id: invoice.id,
                amount: Decimal::new(45000, 0),
                method: PaymentMethod::Mpesa,
                reference: Some("QJK4XYZ123".into()),
                received_by: Some(manager.id),
                paid_at: None,
            })
            .await?;

        let mut invoice = invoice;
        invoice.status = InvoiceStatus::Paid;
        store.update(&invoice).await?;
        tx.commit().await?;

        tracing::info!("🌱 Fixture gravado ({} quitada)", FIXTURE_INVOICE_NUMBER);
        Ok(())
    }

    /// Confere o estado final do fixture. Linhas extras não atrapalham;
    /// faltas ou divergências viram `FixtureMismatch`.
    pub async fn verify(&self) -> Result<FixtureReport, AppError> {
        let store = &self.store;

        // --- Cargos e usuários ---
        let mut roles = Vec::new();
        for name in ["admin", "manager", "owner"] {
            let role = store.find_role_by_name(name).await?;
            ensure(role.is_some(), &format!("cargo '{}' ausente", name))?;
            roles.extend(role);
        }

        let admin = self.user("admin").await?;
        let manager = self.user("manager1").await?;
        ensure(admin.role_id == roles[0].id, "admin deveria ter o cargo 'admin'")?;
        ensure(manager.role_id == roles[1].id, "manager1 deveria ter o cargo 'manager'")?;

        // --- Imóveis e unidades ---
        let properties = store.list::<Property>().await?;
        let kilimani = properties
            .iter()
            .find(|p| p.name == "Kilimani Apartments")
            .ok_or_else(|| AppError::FixtureMismatch("imóvel 'Kilimani Apartments' ausente".into()))?;
        let riverside = properties
            .iter()
            .find(|p| p.name == "Riverside Plaza")
            .ok_or_else(|| AppError::FixtureMismatch("imóvel 'Riverside Plaza' ausente".into()))?;
        ensure(kilimani.owner_id == Some(manager.id), "Kilimani Apartments deveria pertencer a manager1")?;
        ensure(riverside.owner_id.is_none(), "Riverside Plaza não deveria ter proprietário")?;

        let units = store.list::<Unit>().await?;
        let unit = |number: &str, property_id: i64| {
            units
                .iter()
                .find(|u| u.unit_number == number && u.property_id == property_id)
                .ok_or_else(|| AppError::FixtureMismatch(format!("unidade '{}' ausente", number)))
        };
        let a101 = unit("A101", kilimani.id)?;
        unit("A102", kilimani.id)?;
        let shop = unit("Shop-1", riverside.id)?;

        // --- Inquilinos e contratos ---
        let tenants = store.list::<Tenant>().await?;
        let tenant = |name: &str| {
            tenants
                .iter()
                .find(|t| t.full_name == name)
                .ok_or_else(|| AppError::FixtureMismatch(format!("inquilino '{}' ausente", name)))
        };
        let james = tenant("James Osukuku")?;
        let maximilla = tenant("Maximilla Sikuyu")?;

        let leases = store.list::<Lease>().await?;
        let james_lease = leases
            .iter()
            .find(|l| l.unit_id == a101.id && l.tenant_id == james.id)
            .ok_or_else(|| AppError::FixtureMismatch("contrato A101 / James Osukuku ausente".into()))?;
        ensure(
            james_lease.lease_start == date(2025, 1, 1)?
                && james_lease.lease_end == Some(date(2025, 12, 31)?)
                && james_lease.rent_amount == Decimal::new(45000, 0),
            "contrato A101 / James Osukuku divergente",
        )?;

        let shop_lease = leases
            .iter()
            .find(|l| l.unit_id == shop.id && l.tenant_id == maximilla.id)
            .ok_or_else(|| AppError::FixtureMismatch("contrato Shop-1 / Maximilla Sikuyu ausente".into()))?;
        ensure(
            shop_lease.lease_start == date(2025, 3, 15)?
                && shop_lease.lease_end.is_none()
                && shop_lease.rent_amount == Decimal::new(30000, 0),
            "contrato Shop-1 / Maximilla Sikuyu divergente",
        )?;

        // --- Cobrança e pagamento ---
        let invoice = store
            .find_invoice_by_number(FIXTURE_INVOICE_NUMBER)
            .await?
            .ok_or_else(|| AppError::FixtureMismatch(format!("fatura {} ausente", FIXTURE_INVOICE_NUMBER)))?;
        ensure(invoice.lease_id == james_lease.id, "fatura ligada ao contrato errado")?;
        ensure(
            invoice.period_start == date(2025, 9, 1)?
                && invoice.period_end == date(2025, 9, 30)?
                && invoice.amount == Decimal::new(45000, 0),
            "período ou valor da fatura divergente",
        )?;
        ensure(invoice.status == InvoiceStatus::Paid, "fatura deveria estar paga")?;

        let payments = store.payments_for_invoice(invoice.id).await?;
        let amount_paid: Decimal = payments.iter().map(|p| p.amount).sum();
        ensure(
            payments.iter().any(|p| p.method == PaymentMethod::Mpesa),
            "pagamento via mpesa ausente",
        )?;
        ensure(amount_paid == invoice.amount, "total pago diferente do valor da fatura")?;

        let report = FixtureReport {
            row_counts: self.row_counts().await?,
            invoice_number: invoice.invoice_number,
            invoice_status: invoice.status,
            amount_paid,
        };

        tracing::info!("✅ Fixture conferido: {} tabelas", report.row_counts.len());
        Ok(report)
    }

    async fn user(&self, username: &str) -> Result<User, AppError> {
        self.store
            .find_user_by_login(username)
            .await?
            .ok_or_else(|| AppError::FixtureMismatch(format!("usuário '{}' ausente", username)))
    }

    async fn row_counts(&self) -> Result<BTreeMap<String, usize>, AppError> {
        let store = &self.store;
        let counts = [
            (Table::Roles, store.list::<Role>().await?.len()),
            (Table::Users, store.list::<User>().await?.len()),
            (Table::Properties, store.list::<Property>().await?.len()),
            (Table::Units, store.list::<Unit>().await?.len()),
            (Table::Tenants, store.list::<Tenant>().await?.len()),
            (Table::Leases, store.list::<Lease>().await?.len()),
            (Table::Invoices, store.list::<Invoice>().await?.len()),
            (Table::Payments, store.list::<Payment>().await?.len()),
            (Table::MaintenanceRequests, store.list::<MaintenanceRequest>().await?.len()),
            (Table::Reminders, store.list::<Reminder>().await?.len()),
            (Table::AuditLogs, store.list::<AuditLog>().await?.len()),
        ];

        Ok(counts
            .into_iter()
            .map(|(table, count)| (table.name().to_string(), count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ReferenceConflict;
    use crate::db::MemoryStore;

    async fn seeded() -> (Arc<MemoryStore>, FixtureService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let fixture = FixtureService::new(store.clone());
        fixture.seed().await.unwrap();
        (store, fixture)
    }

    #[tokio::test]
    async fn seed_then_verify_reports_final_state() {
        let (_, fixture) = seeded().await;

        let report = fixture.verify().await.unwrap();
        assert_eq!(report.invoice_number, "INV-2025-0001");
        assert_eq!(report.invoice_status, InvoiceStatus::Paid);
        assert_eq!(report.amount_paid, Decimal::new(45000, 0));

        let expected = [
            ("roles", 3),
            ("users", 2),
            ("properties", 2),
            ("units", 3),
            ("tenants", 2),
            ("leases", 2),
            ("invoices", 1),
            ("payments", 1),
            ("maintenance_requests", 0),
            ("reminders", 0),
            ("audit_logs", 0),
        ];
        for (table, count) in expected {
            assert_eq!(report.row_counts[table], count, "tabela {}", table);
        }
    }

    #[tokio::test]
    async fn seeding_twice_hits_unique_constraints() {
        let (_, fixture) = seeded().await;

        let err = fixture.seed().await.unwrap_err();
        assert_eq!(err.constraint(), Some("uq_roles_name"));
    }

    #[tokio::test]
    async fn failed_seed_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        // Mesmo documento da segunda inquilina: o seed falha no meio do caminho
        store
            .insert(NewTenant {
                national_id: "23456789".into(),
                full_name: "Someone Else".into(),
                phone: "+254700999888".into(),
                email: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
            })
            .await
            .unwrap();

        let fixture = FixtureService::new(store.clone());
        let err = fixture.seed().await.unwrap_err();
        assert_eq!(err.constraint(), Some("uq_tenants_national_id"));

        let counts = fixture.row_counts().await.unwrap();
        assert_eq!(counts["tenants"], 1);
        assert!(counts.iter().all(|(table, n)| table == "tenants" || *n == 0));
    }

    #[tokio::test]
    async fn verify_on_empty_store_is_a_mismatch() {
        let fixture = FixtureService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(fixture.verify().await, Err(AppError::FixtureMismatch(_))));
    }

    #[tokio::test]
    async fn reopened_invoice_fails_verification() {
        let (store, fixture) = seeded().await;

        // Sem máquina de estados: pago -> em aberto é aceito pelo store
        let mut invoice = store.find_invoice_by_number("inv-2025-0001").await.unwrap().unwrap();
        invoice.status = InvoiceStatus::Unpaid;
        store.update(&invoice).await.unwrap();

        assert!(matches!(fixture.verify().await, Err(AppError::FixtureMismatch(_))));
    }

    #[tokio::test]
    async fn fixture_relations_behave_like_the_schema() {
        let (store, _) = seeded().await;

        // Unidade com contrato não pode ser removida
        let units = store.list::<Unit>().await.unwrap();
        let a101 = units.iter().find(|u| u.unit_number == "A101").unwrap();
        let err = store.delete::<Unit>(a101.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ForeignKeyViolation { conflict: ReferenceConflict::StillReferenced, .. }
        ));
        assert_eq!(err.constraint(), Some("fk_leases_unit"));

        // A102 não tem contrato: sai sem problemas
        let a102 = units.iter().find(|u| u.unit_number == "A102").unwrap();
        store.delete::<Unit>(a102.id).await.unwrap();

        // Cargo em uso não pode ser removido
        let admin_role = store.find_role_by_name("admin").await.unwrap().unwrap();
        let err = store.delete::<Role>(admin_role.id).await.unwrap_err();
        assert_eq!(err.constraint(), Some("fk_users_role"));
    }

    #[tokio::test]
    async fn removing_manager_clears_owner_and_receiver() {
        let (store, _) = seeded().await;
        let manager = store.find_user_by_login("manager1").await.unwrap().unwrap();

        store.delete::<User>(manager.id).await.unwrap();

        let properties = store.list::<Property>().await.unwrap();
        assert!(properties.iter().all(|p| p.owner_id.is_none()));
        let payments = store.list::<Payment>().await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].received_by, None);
    }

    #[test]
    fn report_serializes_as_camel_case() {
        let report = FixtureReport {
            row_counts: BTreeMap::from([("roles".to_string(), 3)]),
            invoice_number: FIXTURE_INVOICE_NUMBER.into(),
            invoice_status: InvoiceStatus::Paid,
            amount_paid: Decimal::new(45000, 0),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["invoiceNumber"], "INV-2025-0001");
        assert_eq!(json["invoiceStatus"], "paid");
        assert_eq!(json["amountPaid"], "45000");
        assert_eq!(json["rowCounts"]["roles"], 3);
    }
}
