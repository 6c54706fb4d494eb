use serde::Serialize;
use thiserror::Error;

use crate::schema::Table;

/// Lado da chave estrangeira que falhou.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceConflict {
    /// INSERT/UPDATE apontando para uma linha-pai inexistente.
    MissingParent,
    /// DELETE de uma linha-pai ainda referenciada por uma FK RESTRICT.
    StillReferenced,
}

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Valor duplicado viola a restrição única '{constraint}'")]
    UniqueViolation { constraint: String },

    #[error("Violação de integridade referencial em '{constraint}' ({conflict:?})")]
    ForeignKeyViolation {
        constraint: String,
        conflict: ReferenceConflict,
    },

    #[error("Campo obrigatório ausente: {table}.{column}")]
    MissingRequiredField { table: Table, column: String },

    #[error("Valor fora do tamanho ou da precisão da coluna {table}.{column}")]
    ValueOutOfRange { table: Table, column: String },

    #[error("Restrição de verificação violada: '{constraint}'")]
    CheckViolation { constraint: String },

    #[error("Registro {id} não encontrado em {table}")]
    NotFound { table: Table, id: i64 },

    #[error("A tabela {0} aceita apenas inserções")]
    AppendOnly(Table),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Estado dos fixtures divergente: {0}")]
    FixtureMismatch(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),
}

impl AppError {
    /// Verdadeiro para os erros gerados por restrições do esquema
    /// ou pelo tipo das colunas.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            AppError::UniqueViolation { .. }
                | AppError::ForeignKeyViolation { .. }
                | AppError::MissingRequiredField { .. }
                | AppError::ValueOutOfRange { .. }
                | AppError::CheckViolation { .. }
        )
    }

    pub fn constraint(&self) -> Option<&str> {
        match self {
            AppError::UniqueViolation { constraint }
            | AppError::ForeignKeyViolation { constraint, .. }
            | AppError::CheckViolation { constraint } => Some(constraint),
            _ => None,
        }
    }
}
