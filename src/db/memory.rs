// src/db/memory.rs

// Store em processo. Não existe banco por trás, então as regras do esquema
// (únicas, FKs e ações ON DELETE) são aplicadas aqui a partir do catálogo em `schema.rs`.

use async_trait::async_trait;
use chrono::Utc;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use crate::common::db_utils::validate_draft;
use crate::common::error::{AppError, ReferenceConflict};
use crate::db::store::{Entity, Store, Transactional, UnitOfWork};
use crate::models::auth::{Role, User};
use crate::models::finance::{Invoice, Payment};
use crate::models::record::{NewRecord, Record};
use crate::schema::{self, ReferentialAction, Table};

// Visão dinâmica de uma linha, para percorrer FKs entre tabelas de tipos diferentes
trait StoredRow: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn StoredRow>;
    fn key_part(&self, column: &str) -> Option<String>;
    fn foreign_key(&self, column: &str) -> Option<i64>;
    fn clear_foreign_key(&mut self, column: &str);
}

impl<T: Record> StoredRow for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn StoredRow> {
        Box::new(self.clone())
    }

    fn key_part(&self, column: &str) -> Option<String> {
        Record::key_part(self, column)
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        Record::foreign_key(self, column)
    }

    fn clear_foreign_key(&mut self, column: &str) {
        Record::clear_foreign_key(self, column)
    }
}

impl Clone for Box<dyn StoredRow> {
    fn clone(&self) -> Self {
        (**self).clone_box()
    }
}

#[derive(Debug, Default, Clone)]
struct TableData {
    last_id: i64,
    rows: BTreeMap<i64, Box<dyn StoredRow>>,
}

#[derive(Debug, Default)]
struct DeletePlan {
    removed: BTreeSet<(Table, i64)>,
    nullified: Vec<(Table, i64, &'static str)>,
}

#[derive(Debug, Default, Clone)]
struct Database {
    tables: HashMap<Table, TableData>,
}

/// Chave de uma restrição única; `None` se alguma coluna for nula.
/// Texto comparado sem diferenciar maiúsculas, como a collation `ci` do Postgres.
// `to_lowercase` não é o case folding completo do ICU: "STRASSE" e "straße" são
// iguais no Postgres e diferentes aqui. Nenhum crate do projeto faz case folding.
fn unique_key(row: &dyn StoredRow, columns: &[&str]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| row.key_part(column).map(|value| value.to_lowercase()))
        .collect()
}

impl Database {
    fn rows(&self, table: Table) -> impl Iterator<Item = (&i64, &Box<dyn StoredRow>)> {
        self.tables.get(&table).into_iter().flat_map(|data| data.rows.iter())
    }

    fn typed_rows<T: Record>(&self) -> impl Iterator<Item = &T> {
        self.rows(T::TABLE)
            .filter_map(|(_, row)| row.as_any().downcast_ref::<T>())
    }

    fn typed_row<T: Record>(&self, id: i64) -> Option<&T> {
        self.tables
            .get(&T::TABLE)
            .and_then(|data| data.rows.get(&id))
            .and_then(|row| row.as_any().downcast_ref::<T>())
    }

    fn contains(&self, table: Table, id: i64) -> bool {
        self.tables
            .get(&table)
            .is_some_and(|data| data.rows.contains_key(&id))
    }

    fn check_row<T: Record>(&self, record: &T) -> Result<(), AppError> {
        record
            .check_constraints()
            .map_err(|constraint| AppError::CheckViolation { constraint: constraint.to_string() })?;

        let row: &dyn StoredRow = record;

        for uq in schema::unique_constraints_of(T::TABLE) {
            let Some(key) = unique_key(row, uq.columns) else {
                continue;
            };
            let clash = self.rows(T::TABLE).any(|(id, other)| {
                *id != record.id() && unique_key(&**other, uq.columns).as_ref() == Some(&key)
            });
            if clash {
                return Err(AppError::UniqueViolation { constraint: uq.name.to_string() });
            }
        }

        for fk in schema::foreign_keys_of(T::TABLE) {
            if let Some(parent_id) = row.foreign_key(fk.column) {
                if !self.contains(fk.references, parent_id) {
                    return Err(AppError::ForeignKeyViolation {
                        constraint: fk.name.to_string(),
                        conflict: ReferenceConflict::MissingParent,
                    });
                }
            }
        }

        Ok(())
    }

    // Arredonda, confere as restrições e grava por cima da linha de mesmo id
    fn store_row<T: Record>(&mut self, mut record: T) -> Result<T, AppError> {
        let checked = record.fit_numeric().and_then(|_| self.check_row(&record));
        if let Err(err) = checked {
            tracing::warn!("Restrição violada em {}: {}", T::TABLE, err);
            return Err(err);
        }

        let data = self.tables.entry(T::TABLE).or_default();
        data.last_id = data.last_id.max(record.id());
        data.rows.insert(record.id(), Box::new(record.clone()));
        Ok(record)
    }

    fn insert<D>(&mut self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
    {
        let table = <D::Record as Record>::TABLE;
        validate_draft(&draft, table)?;

        // O id só é consumido se a linha for gravada
        let id = self.tables.get(&table).map_or(0, |data| data.last_id) + 1;
        let record = self.store_row(draft.into_record(id, Utc::now()))?;

        tracing::debug!("Linha {} inserida em {}", id, table);
        Ok(record)
    }

    fn update<T: Record>(&mut self, record: &T) -> Result<T, AppError> {
        if T::TABLE.is_append_only() {
            return Err(AppError::AppendOnly(T::TABLE));
        }
        validate_draft(&record.as_draft(), T::TABLE)?;

        if !self.contains(T::TABLE, record.id()) {
            return Err(AppError::NotFound { table: T::TABLE, id: record.id() });
        }

        let mut updated = record.clone();
        updated.touch(Utc::now());
        self.store_row(updated)
    }

    fn set_user_role(&mut self, user_id: i64, role_id: i64) -> Result<User, AppError> {
        let mut user = self
            .typed_row::<User>(user_id)
            .cloned()
            .ok_or(AppError::NotFound { table: Table::Users, id: user_id })?;

        user.role_id = role_id;
        user.touch(Utc::now());
        self.store_row(user)
    }

    fn delete(&mut self, table: Table, id: i64) -> Result<(), AppError> {
        if table.is_append_only() {
            return Err(AppError::AppendOnly(table));
        }
        if !self.contains(table, id) {
            return Err(AppError::NotFound { table, id });
        }

        let mut plan = DeletePlan::default();
        if let Err(err) = self.plan_delete(table, id, &mut plan) {
            tracing::warn!("DELETE em {} bloqueado: {}", table, err);
            return Err(err);
        }

        self.apply(&plan);

        let cascaded = plan.removed.len() - 1;
        if cascaded > 0 || !plan.nullified.is_empty() {
            tracing::info!(
                "Linha {} removida de {} ({} em cascata, {} referências anuladas)",
                id,
                table,
                cascaded,
                plan.nullified.len()
            );
        } else {
            tracing::info!("Linha {} removida de {}", id, table);
        }

        Ok(())
    }

    // Monta o plano completo antes de tocar em qualquer linha: um RESTRICT
    // em qualquer nível aborta o DELETE inteiro.
    fn plan_delete(&self, table: Table, id: i64, plan: &mut DeletePlan) -> Result<(), AppError> {
        if !plan.removed.insert((table, id)) {
            return Ok(());
        }

        for fk in schema::referencing(table) {
            let children: Vec<i64> = self
                .rows(fk.table)
                .filter(|(_, row)| row.foreign_key(fk.column) == Some(id))
                .map(|(child_id, _)| *child_id)
                .collect();

            for child_id in children {
                match fk.on_delete {
                    ReferentialAction::Restrict => {
                        return Err(AppError::ForeignKeyViolation {
                            constraint: fk.name.to_string(),
                            conflict: ReferenceConflict::StillReferenced,
                        });
                    }
                    ReferentialAction::Cascade => self.plan_delete(fk.table, child_id, plan)?,
                    ReferentialAction::SetNull => plan.nullified.push((fk.table, child_id, fk.column)),
                }
            }
        }

        Ok(())
    }

    fn apply(&mut self, plan: &DeletePlan) {
        for (table, id, column) in &plan.nullified {
            if plan.removed.contains(&(*table, *id)) {
                continue;
            }
            if let Some(row) = self.tables.get_mut(table).and_then(|data| data.rows.get_mut(id)) {
                row.clear_foreign_key(column);
            }
        }

        for (table, id) in &plan.removed {
            if let Some(data) = self.tables.get_mut(table) {
                data.rows.remove(id);
            }
        }
    }

    fn role_by_name(&self, name: &str) -> Option<Role> {
        let needle = name.to_lowercase();
        self.typed_rows::<Role>()
            .find(|role| role.name.to_lowercase() == needle)
            .cloned()
    }

    fn user_by_login(&self, login: &str) -> Option<User> {
        let needle = login.to_lowercase();
        self.typed_rows::<User>()
            .find(|user| user.username.to_lowercase() == needle || user.email.to_lowercase() == needle)
            .cloned()
    }

    fn invoice_by_number(&self, number: &str) -> Option<Invoice> {
        let needle = number.to_lowercase();
        self.typed_rows::<Invoice>()
            .find(|invoice| invoice.invoice_number.to_lowercase() == needle)
            .cloned()
    }

    fn invoice_payments(&self, invoice_id: i64) -> Vec<Payment> {
        self.typed_rows::<Payment>()
            .filter(|payment| payment.invoice_id == invoice_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Database>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transação em memória: segura o lock de escrita do store até o fim e grava
/// numa cópia, que só substitui os dados no `commit`.
pub struct MemoryTx {
    guard: OwnedRwLockWriteGuard<Database>,
    work: Mutex<Database>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert<D>(&self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
        D::Record: Entity,
    {
        self.inner.write().await.insert(draft)
    }

    async fn find_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, AppError> {
        Ok(self.inner.read().await.typed_row::<T>(id).cloned())
    }

    async fn list<T: Entity>(&self) -> Result<Vec<T>, AppError> {
        Ok(self.inner.read().await.typed_rows::<T>().cloned().collect())
    }

    async fn update<T: Entity>(&self, record: &T) -> Result<T, AppError> {
        self.inner.write().await.update(record)
    }

    async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<User, AppError> {
        self.inner.write().await.set_user_role(user_id, role_id)
    }

    async fn delete<T: Entity>(&self, id: i64) -> Result<(), AppError> {
        self.inner.write().await.delete(T::TABLE, id)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        Ok(self.inner.read().await.role_by_name(name))
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.user_by_login(login))
    }

    async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self.inner.read().await.invoice_by_number(number))
    }

    async fn payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, AppError> {
        Ok(self.inner.read().await.invoice_payments(invoice_id))
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, AppError> {
        let guard = self.inner.clone().write_owned().await;
        let work = Mutex::new((*guard).clone());
        Ok(MemoryTx { guard, work })
    }
}

#[async_trait]
impl Store for MemoryTx {
    async fn insert<D>(&self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
        D::Record: Entity,
    {
        self.work.lock().await.insert(draft)
    }

    async fn find_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, AppError> {
        Ok(self.work.lock().await.typed_row::<T>(id).cloned())
    }

    async fn list<T: Entity>(&self) -> Result<Vec<T>, AppError> {
        Ok(self.work.lock().await.typed_rows::<T>().cloned().collect())
    }

    async fn update<T: Entity>(&self, record: &T) -> Result<T, AppError> {
        self.work.lock().await.update(record)
    }

    async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<User, AppError> {
        self.work.lock().await.set_user_role(user_id, role_id)
    }

    async fn delete<T: Entity>(&self, id: i64) -> Result<(), AppError> {
        self.work.lock().await.delete(T::TABLE, id)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        Ok(self.work.lock().await.role_by_name(name))
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        Ok(self.work.lock().await.user_by_login(login))
    }

    async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self.work.lock().await.invoice_by_number(number))
    }

    async fn payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, AppError> {
        Ok(self.work.lock().await.invoice_payments(invoice_id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn commit(self) -> Result<(), AppError> {
        let MemoryTx { mut guard, work } = self;
        *guard = work.into_inner();
        tracing::debug!("Transação em memória confirmada");
        Ok(())
    }
}
