use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::error::ErrorKind;
use sqlx::postgres::PgDatabaseError;
use validator::Validate;

use crate::common::error::{AppError, ReferenceConflict};
use crate::schema::Table;

/// Tipo de comando que gerou o erro; decide o lado da violação de FK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Write,
    Delete,
}

// ---
// Converte erros do banco nos tipos de restrição da aplicação
// ---
pub(crate) fn classify_db_error(err: sqlx::Error, table: Table, op: Operation) -> AppError {
    let classified = if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("desconhecida").to_string();
        let column = || {
            db_err
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.column())
                .unwrap_or("desconhecida")
                .to_string()
        };
        match db_err.kind() {
            ErrorKind::UniqueViolation => Some(AppError::UniqueViolation { constraint }),
            ErrorKind::ForeignKeyViolation => Some(AppError::ForeignKeyViolation {
                constraint,
                conflict: match op {
                    Operation::Write => ReferenceConflict::MissingParent,
                    Operation::Delete => ReferenceConflict::StillReferenced,
                },
            }),
            // O Postgres informa a coluna no campo `column` do erro
            ErrorKind::NotNullViolation => Some(AppError::MissingRequiredField { table, column: column() }),
            ErrorKind::CheckViolation => Some(AppError::CheckViolation { constraint }),
            // 22001: texto maior que o VARCHAR; 22003: número fora do NUMERIC
            _ => match db_err.code().as_deref() {
                Some("22001") | Some("22003") => {
                    Some(AppError::ValueOutOfRange { table, column: column() })
                }
                _ => None,
            },
        }
    } else {
        None
    };

    match classified {
        Some(app_err) => {
            tracing::warn!("Restrição violada em {}: {}", table, app_err);
            app_err
        }
        None => AppError::DatabaseError(err),
    }
}

// ---
// Precisão das colunas NUMERIC (dígitos totais, casas decimais)
// ---
pub(crate) const MONEY: (u32, u32) = (12, 2);
pub(crate) const AREA: (u32, u32) = (10, 2);

/// Arredonda para a escala da coluna (meio para longe do zero, como o Postgres)
/// e rejeita valores com mais dígitos inteiros do que a precisão permite.
pub(crate) fn fit_decimal(
    value: &mut Decimal,
    (precision, scale): (u32, u32),
    table: Table,
    column: &str,
) -> Result<(), AppError> {
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    let limit = Decimal::from_i128_with_scale(10_i128.pow(precision - scale), 0);

    if rounded.abs() >= limit {
        return Err(AppError::ValueOutOfRange { table, column: column.to_string() });
    }

    *value = rounded;
    Ok(())
}

/// Valida um rascunho antes de qualquer escrita.
/// Campos de texto obrigatórios vazios viram `MissingRequiredField`, o resto `ValidationError`.
pub(crate) fn validate_draft<D: Validate>(draft: &D, table: Table) -> Result<(), AppError> {
    let Err(errors) = draft.validate() else {
        return Ok(());
    };

    let mut missing: Vec<String> = errors
        .field_errors()
        .into_iter()
        .filter(|(_, field_errors)| field_errors.iter().any(|e| e.code == "required"))
        .map(|(field, _)| field.to_string())
        .collect();
    missing.sort();

    match missing.into_iter().next() {
        Some(column) => Err(AppError::MissingRequiredField { table, column }),
        None => Err(AppError::ValidationError(errors)),
    }
}

/// Validador usado nos rascunhos: texto obrigatório não pode ser vazio.
pub fn required(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("required");
        err.message = Some("Este campo é obrigatório.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::DatabaseError;
    use std::borrow::Cow;
    use std::fmt;
    use validator::Validate;

    #[derive(Debug)]
    struct FakeDbError {
        kind: ErrorKind,
        constraint: Option<&'static str>,
        code: Option<&'static str>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(kind: ErrorKind, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { kind, constraint, code: None }))
    }

    fn db_error_with_code(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError {
            kind: ErrorKind::Other,
            constraint: None,
            code: Some(code),
        }))
    }

    #[test]
    fn unique_violation_keeps_constraint_name() {
        let err = classify_db_error(
            db_error(ErrorKind::UniqueViolation, Some("uq_roles_name")),
            Table::Roles,
            Operation::Write,
        );
        assert!(matches!(err, AppError::UniqueViolation { ref constraint } if constraint == "uq_roles_name"));
    }

    #[test]
    fn foreign_key_side_depends_on_operation() {
        let on_write = classify_db_error(
            db_error(ErrorKind::ForeignKeyViolation, Some("fk_units_property")),
            Table::Units,
            Operation::Write,
        );
        assert!(matches!(
            on_write,
            AppError::ForeignKeyViolation { conflict: ReferenceConflict::MissingParent, .. }
        ));

        let on_delete = classify_db_error(
            db_error(ErrorKind::ForeignKeyViolation, Some("fk_leases_unit")),
            Table::Units,
            Operation::Delete,
        );
        assert!(matches!(
            on_delete,
            AppError::ForeignKeyViolation { conflict: ReferenceConflict::StillReferenced, .. }
        ));
    }

    #[test]
    fn not_null_without_pg_details_still_classified() {
        let err = classify_db_error(
            db_error(ErrorKind::NotNullViolation, None),
            Table::Tenants,
            Operation::Write,
        );
        assert!(matches!(err, AppError::MissingRequiredField { table: Table::Tenants, .. }));
    }

    #[test]
    fn overflow_and_overlong_text_are_out_of_range() {
        for code in ["22003", "22001"] {
            let err = classify_db_error(db_error_with_code(code), Table::Units, Operation::Write);
            assert!(
                matches!(err, AppError::ValueOutOfRange { table: Table::Units, .. }),
                "SQLSTATE {}",
                code
            );
        }

        let err = classify_db_error(db_error_with_code("40001"), Table::Units, Operation::Write);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn decimals_fit_the_column_scale() {
        let mut rent = Decimal::new(12_345, 3);
        fit_decimal(&mut rent, MONEY, Table::Units, "monthly_rent").unwrap();
        assert_eq!(rent, Decimal::new(1_235, 2));

        let mut negative = Decimal::new(-12_345, 3);
        fit_decimal(&mut negative, MONEY, Table::Units, "monthly_rent").unwrap();
        assert_eq!(negative, Decimal::new(-1_235, 2));

        // 9_999_999_999.995 arredonda para onze dígitos inteiros
        let mut edge = Decimal::new(9_999_999_999_995, 3);
        assert!(fit_decimal(&mut edge, MONEY, Table::Units, "monthly_rent").is_err());

        let mut max = Decimal::new(999_999_999_999, 2);
        fit_decimal(&mut max, MONEY, Table::Units, "monthly_rent").unwrap();
        assert_eq!(max, Decimal::new(999_999_999_999, 2));
    }

    #[test]
    fn other_errors_pass_through() {
        let err = classify_db_error(sqlx::Error::RowNotFound, Table::Roles, Operation::Write);
        assert!(matches!(err, AppError::DatabaseError(sqlx::Error::RowNotFound)));
        assert!(!err.is_constraint_violation());
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(custom(function = "required"))]
        name: String,
        #[validate(length(max = 3))]
        code: String,
    }

    #[test]
    fn blank_required_field_is_reported_as_missing() {
        let draft = Sample { name: "  ".into(), code: "ok".into() };
        let err = validate_draft(&draft, Table::Roles).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredField { ref column, .. } if column == "name"));
    }

    #[test]
    fn other_validation_failures_stay_generic() {
        let draft = Sample { name: "admin".into(), code: "toolong".into() };
        let err = validate_draft(&draft, Table::Roles).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
