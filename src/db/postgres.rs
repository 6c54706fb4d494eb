// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::common::db_utils::{Operation, classify_db_error, validate_draft};
use crate::common::error::AppError;
use crate::db::pg_record::PgRecord;
use crate::db::store::{Entity, Store, Transactional, UnitOfWork};
use crate::models::auth::{Role, User};
use crate::models::finance::{Invoice, Payment};
use crate::models::record::{NewRecord, Record};
use crate::schema::Table;

// O Store do Postgres: as restrições ficam a cargo do banco (ver migrations/),
// aqui só convertemos os erros.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Transação aberta no Postgres. Se for solta sem `commit`, o sqlx faz ROLLBACK.
pub struct PgTx {
    tx: Mutex<Transaction<'static, Postgres>>,
}

// ---
// Consultas, genéricas sobre o executor (pool ou transação)
// ---

async fn insert_row<'e, E, D>(executor: E, draft: D) -> Result<D::Record, AppError>
where
    E: Executor<'e, Database = Postgres>,
    D: NewRecord,
    D::Record: Entity,
{
    let table = <D::Record as Record>::TABLE;
    validate_draft(&draft, table)?;

    let query = sqlx::query_as::<_, D::Record>(<D::Record as PgRecord>::INSERT_SQL);
    let record = <D::Record as PgRecord>::bind_insert(&draft, query)
        .fetch_one(executor)
        .await
        .map_err(|e| classify_db_error(e, table, Operation::Write))?;

    tracing::debug!("Linha {} inserida em {}", record.id(), table);
    Ok(record)
}

async fn find_row<'e, E, T>(executor: E, id: i64) -> Result<Option<T>, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: Entity,
{
    let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row)
}

async fn list_rows<'e, E, T>(executor: E) -> Result<Vec<T>, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: Entity,
{
    let sql = format!("SELECT * FROM {} ORDER BY id ASC", T::TABLE);
    let rows = sqlx::query_as::<_, T>(&sql).fetch_all(executor).await?;

    Ok(rows)
}

async fn update_row<'e, E, T>(executor: E, record: &T) -> Result<T, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: Entity,
{
    let Some(sql) = T::UPDATE_SQL else {
        return Err(AppError::AppendOnly(T::TABLE));
    };
    validate_draft(&record.as_draft(), T::TABLE)?;

    let query = sqlx::query_as::<_, T>(sql);
    record
        .bind_update(query)
        .fetch_optional(executor)
        .await
        .map_err(|e| classify_db_error(e, T::TABLE, Operation::Write))?
        .ok_or(AppError::NotFound { table: T::TABLE, id: record.id() })
}

async fn update_user_role<'e, E>(executor: E, user_id: i64, role_id: i64) -> Result<User, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, User>(
        "UPDATE users SET role_id = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(role_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| classify_db_error(e, Table::Users, Operation::Write))?
    .ok_or(AppError::NotFound { table: Table::Users, id: user_id })
}

async fn delete_row<'e, E>(executor: E, table: Table, id: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    if table.is_append_only() {
        return Err(AppError::AppendOnly(table));
    }

    // CASCADE / SET NULL / RESTRICT são aplicados pelo próprio Postgres
    let sql = format!("DELETE FROM {} WHERE id = $1", table);
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| classify_db_error(e, table, Operation::Delete))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound { table, id });
    }

    tracing::info!("Linha {} removida de {}", id, table);
    Ok(())
}

async fn role_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Role>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    // A collation `ci` da coluna torna a comparação insensível a maiúsculas
    let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(role)
}

async fn user_by_login<'e, E>(executor: E, login: &str) -> Result<Option<User>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE username = $1 OR email = $1 ORDER BY id ASC LIMIT 1",
    )
    .bind(login)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

async fn invoice_by_number<'e, E>(executor: E, number: &str) -> Result<Option<Invoice>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = $1")
        .bind(number)
        .fetch_optional(executor)
        .await?;

    Ok(invoice)
}

async fn invoice_payments<'e, E>(executor: E, invoice_id: i64) -> Result<Vec<Payment>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE invoice_id = $1 ORDER BY id ASC",
    )
    .bind(invoice_id)
    .fetch_all(executor)
    .await?;

    Ok(payments)
}

#[async_trait]
impl Store for PgStore {
    async fn insert<D>(&self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
        D::Record: Entity,
    {
        insert_row(&self.pool, draft).await
    }

    async fn find_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, AppError> {
        find_row(&self.pool, id).await
    }

    async fn list<T: Entity>(&self) -> Result<Vec<T>, AppError> {
        list_rows(&self.pool).await
    }

    async fn update<T: Entity>(&self, record: &T) -> Result<T, AppError> {
        update_row(&self.pool, record).await
    }

    async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<User, AppError> {
        update_user_role(&self.pool, user_id, role_id).await
    }

    async fn delete<T: Entity>(&self, id: i64) -> Result<(), AppError> {
        delete_row(&self.pool, T::TABLE, id).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        role_by_name(&self.pool, name).await
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        user_by_login(&self.pool, login).await
    }

    async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, AppError> {
        invoice_by_number(&self.pool, number).await
    }

    async fn payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, AppError> {
        invoice_payments(&self.pool, invoice_id).await
    }
}

#[async_trait]
impl Transactional for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx: Mutex::new(tx) })
    }
}

// Mesmas consultas, executadas na conexão da transação (`&mut **tx`)
#[async_trait]
impl Store for PgTx {
    async fn insert<D>(&self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
        D::Record: Entity,
    {
        let mut tx = self.tx.lock().await;
        insert_row(&mut **tx, draft).await
    }

    async fn find_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, AppError> {
        let mut tx = self.tx.lock().await;
        find_row(&mut **tx, id).await
    }

    async fn list<T: Entity>(&self) -> Result<Vec<T>, AppError> {
        let mut tx = self.tx.lock().await;
        list_rows(&mut **tx).await
    }

    async fn update<T: Entity>(&self, record: &T) -> Result<T, AppError> {
        let mut tx = self.tx.lock().await;
        update_row(&mut **tx, record).await
    }

    async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<User, AppError> {
        let mut tx = self.tx.lock().await;
        update_user_role(&mut **tx, user_id, role_id).await
    }

    async fn delete<T: Entity>(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.tx.lock().await;
        delete_row(&mut **tx, T::TABLE, id).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let mut tx = self.tx.lock().await;
        role_by_name(&mut **tx, name).await
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let mut tx = self.tx.lock().await;
        user_by_login(&mut **tx, login).await
    }

    async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, AppError> {
        let mut tx = self.tx.lock().await;
        invoice_by_number(&mut **tx, number).await
    }

    async fn payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, AppError> {
        let mut tx = self.tx.lock().await;
        invoice_payments(&mut **tx, invoice_id).await
    }
}

#[async_trait]
impl UnitOfWork for PgTx {
    async fn commit(self) -> Result<(), AppError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}
