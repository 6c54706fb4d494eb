// src/models/record.rs

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use validator::Validate;

use crate::common::error::AppError;
use crate::schema::Table;

// ---
// Contrato comum de todas as linhas do esquema
// ---
// Os backends (Postgres e memória) só conhecem as tabelas através destes dois traits.
pub trait Record: Debug + Clone + Send + Sync + Unpin + 'static {
    const TABLE: Table;

    type Draft: NewRecord<Record = Self>;

    fn id(&self) -> i64;

    /// Colunas editáveis na forma de rascunho; o UPDATE revalida por aqui.
    fn as_draft(&self) -> Self::Draft;

    /// Valor textual de uma coluna que participa de uma restrição única.
    /// `None` quando a coluna é nula (NULLs nunca colidem).
    fn key_part(&self, column: &str) -> Option<String>;

    /// Valor de uma coluna de chave estrangeira.
    fn foreign_key(&self, _column: &str) -> Option<i64> {
        None
    }

    /// Aplica `ON DELETE SET NULL` numa coluna de chave estrangeira.
    fn clear_foreign_key(&mut self, _column: &str) {}

    /// Restrições CHECK da tabela; devolve o nome da restrição violada.
    fn check_constraints(&self) -> Result<(), &'static str> {
        Ok(())
    }

    /// Arredonda as colunas NUMERIC para a escala do esquema, como o Postgres
    /// faz ao gravar. Valores que não cabem na precisão viram `ValueOutOfRange`.
    fn fit_numeric(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    /// Atualiza `updated_at`, quando a tabela tem essa coluna.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

/// Rascunho de criação (tudo menos as colunas geradas pelo banco).
pub trait NewRecord: Validate + Debug + Send + Sync + 'static {
    type Record: Record<Draft = Self>;

    fn into_record(self, id: i64, now: DateTime<Utc>) -> Self::Record;
}
