// src/db/store.rs

use async_trait::async_trait;

use crate::common::error::AppError;
use crate::db::pg_record::PgRecord;
use crate::models::auth::{Role, User};
use crate::models::finance::{Invoice, Payment};
use crate::models::record::{NewRecord, Record};

/// Qualquer tabela do esquema que os dois backends sabem persistir.
pub trait Entity: Record + PgRecord {}

impl<T: Record + PgRecord> Entity for T {}

// ---
// O "Store": a única porta de acesso aos dados
// ---
// Implementado pelo PgStore (Postgres) e pelo MemoryStore (em processo).
// Ambos devolvem os mesmos tipos de erro para as mesmas violações.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insere um rascunho e devolve a linha gravada (com id e datas).
    async fn insert<D>(&self, draft: D) -> Result<D::Record, AppError>
    where
        D: NewRecord,
        D::Record: Entity;

    async fn find_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, AppError>;

    /// Todas as linhas da tabela, ordenadas por id.
    async fn list<T: Entity>(&self) -> Result<Vec<T>, AppError>;

    /// Regrava todas as colunas mutáveis e renova `updated_at`.
    async fn update<T: Entity>(&self, record: &T) -> Result<T, AppError>;

    /// Remove a linha aplicando as ações ON DELETE de cada FK (CASCADE, SET NULL, RESTRICT).
    async fn delete<T: Entity>(&self, id: i64) -> Result<(), AppError>;

    /// Troca só o `role_id` (e `updated_at`), sem regravar as outras colunas.
    async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<User, AppError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError>;

    /// Busca por username ou e-mail, sem diferenciar maiúsculas.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, AppError>;

    async fn payments_for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, AppError>;

    async fn get<T: Entity>(&self, id: i64) -> Result<T, AppError> {
        self.find_by_id::<T>(id)
            .await?
            .ok_or(AppError::NotFound { table: T::TABLE, id })
    }
}

// ---
// Transações
// ---
// Tudo o que for gravado pelo `Tx` só aparece para os outros leitores depois
// do `commit`. Soltar o `Tx` sem commit descarta as escritas.
#[async_trait]
pub trait Transactional: Store {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

#[async_trait]
pub trait UnitOfWork: Store + Sized {
    async fn commit(self) -> Result<(), AppError>;
}
