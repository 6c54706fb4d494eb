// src/services/auth.rs

use bcrypt::{hash, verify};
use std::sync::Arc;

use crate::{
    common::{
        db_utils::validate_draft,
        error::{AppError, ReferenceConflict},
    },
    db::{Store, Transactional, UnitOfWork},
    models::auth::{NewUser, RegisterUserPayload, Role, User},
    schema::Table,
    services::audit_service,
};

pub struct AccountService<S> {
    store: Arc<S>,
    bcrypt_cost: u32,
}

impl<S> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bcrypt_cost: self.bcrypt_cost,
        }
    }
}

impl<S: Transactional> AccountService<S> {
    pub fn new(store: Arc<S>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Cria o usuário e a entrada de auditoria na mesma transação.
    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        validate_draft(&payload, Table::Users)?;

        // 1. Hashing em thread separada (bcrypt é caro de propósito), antes de abrir a transação
        let password = payload.password;
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let tx = self.store.begin().await?;
        let role = resolve_role(&tx, &payload.role_name).await?;

        // 2. Cria o usuário
        let user = tx
            .insert(NewUser {
                role_id: role.id,
                username: payload.username,
                email: payload.email,
                password_hash,
                full_name: payload.full_name,
                phone: payload.phone,
            })
            .await?;

        audit_service::append(&tx, Some(user.id), "user.registered", Some(format!("role={}", role.name)))
            .await?;
        tx.commit().await?;

        tracing::info!("👤 Usuário '{}' registrado com o cargo '{}'", user.username, role.name);
        Ok(user)
    }

    /// Login por username ou e-mail. Qualquer falha vira `InvalidCredentials`,
    /// sem indicar se o usuário existe.
    pub async fn verify_credentials(&self, login: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_user_by_login(login)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Troca só o cargo; outras colunas alteradas em paralelo não são sobrescritas.
    pub async fn change_role(&self, user_id: i64, role_name: &str) -> Result<User, AppError> {
        let tx = self.store.begin().await?;
        let role = resolve_role(&tx, role_name).await?;
        let previous_role_id = tx.get::<User>(user_id).await?.role_id;

        let user = tx.set_user_role(user_id, role.id).await?;

        audit_service::append(
            &tx,
            Some(user.id),
            "user.role_changed",
            Some(format!("role_id {} -> {}", previous_role_id, role.id)),
        )
        .await?;
        tx.commit().await?;

        Ok(user)
    }
}

// Cargo inexistente equivale a uma FK quebrada em users.role_id
async fn resolve_role<St: Store>(store: &St, role_name: &str) -> Result<Role, AppError> {
    store
        .find_role_by_name(role_name)
        .await?
        .ok_or_else(|| AppError::ForeignKeyViolation {
            constraint: "fk_users_role".to_string(),
            conflict: ReferenceConflict::MissingParent,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::audit::AuditLog;
    use crate::models::auth::NewRole;

    async fn service() -> (Arc<MemoryStore>, AccountService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for name in ["admin", "manager"] {
            store
                .insert(NewRole { name: name.into(), description: None })
                .await
                .unwrap();
        }
        let accounts = AccountService::new(store.clone(), bcrypt::DEFAULT_COST.min(4));
        (store, accounts)
    }

    fn payload(username: &str, email: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            role_name: "manager".into(),
            username: username.into(),
            email: email.into(),
            password: "s3cret-pass".into(),
            full_name: "Grace Wanjiru".into(),
            phone: Some("+254700111222".into()),
        }
    }

    #[tokio::test]
    async fn register_hashes_password_and_audits() {
        let (store, accounts) = service().await;

        let user = accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(user.password_hash.starts_with("$2"));

        let audit = store.list::<AuditLog>().await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "user.registered");
        assert_eq!(audit[0].user_id, Some(user.id));
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let (_, accounts) = service().await;
        accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        let by_name = accounts.verify_credentials("GRACE", "s3cret-pass").await.unwrap();
        let by_email = accounts
            .verify_credentials("grace@example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(by_name.id, by_email.id);
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_user_is_rejected() {
        let (_, accounts) = service().await;
        accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        assert!(matches!(
            accounts.verify_credentials("grace", "wrong-pass").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.verify_credentials("nobody", "s3cret-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let (store, accounts) = service().await;
        let mut user = accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();
        user.is_active = false;
        store.update(&user).await.unwrap();

        assert!(matches!(
            accounts.verify_credentials("grace", "s3cret-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let (_, accounts) = service().await;
        accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        let err = accounts
            .register_user(payload("Grace", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.constraint(), Some("uq_users_username"));
    }

    #[tokio::test]
    async fn unknown_role_is_a_reference_conflict() {
        let (_, accounts) = service().await;
        let mut request = payload("grace", "grace@example.com");
        request.role_name = "janitor".into();

        let err = accounts.register_user(request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ForeignKeyViolation { conflict: ReferenceConflict::MissingParent, .. }
        ));
    }

    #[tokio::test]
    async fn change_role_updates_and_audits() {
        let (store, accounts) = service().await;
        let user = accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        let promoted = accounts.change_role(user.id, "admin").await.unwrap();
        let admin = store.find_role_by_name("admin").await.unwrap().unwrap();
        assert_eq!(promoted.role_id, admin.id);

        let actions: Vec<_> = store
            .list::<AuditLog>()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["user.registered", "user.role_changed"]);
    }

    #[tokio::test]
    async fn payload_requires_email_and_limits_phone() {
        let (store, accounts) = service().await;

        let mut request = payload("grace", "grace@example.com");
        request.email = "".into();
        let err = accounts.register_user(request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingRequiredField { table: Table::Users, ref column } if column == "email"
        ));

        let mut request = payload("grace", "grace@example.com");
        request.phone = Some("+2547001112223334445556".into());
        let err = accounts.register_user(request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert!(store.list::<User>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn change_role_keeps_other_columns() {
        let (store, accounts) = service().await;
        let user = accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        // Alteração feita por outro caminho entre a leitura e a troca de cargo
        let mut stale = user.clone();
        stale.is_active = false;
        stale.full_name = "Grace W. Wanjiru".into();
        store.update(&stale).await.unwrap();

        let promoted = accounts.change_role(user.id, "admin").await.unwrap();
        assert!(!promoted.is_active);
        assert_eq!(promoted.full_name, "Grace W. Wanjiru");
    }

    #[tokio::test]
    async fn failed_role_change_leaves_no_audit_entry() {
        let (store, accounts) = service().await;
        let user = accounts.register_user(payload("grace", "grace@example.com")).await.unwrap();

        assert!(matches!(
            accounts.change_role(42, "admin").await,
            Err(AppError::NotFound { table: Table::Users, id: 42 })
        ));
        assert!(accounts.change_role(user.id, "janitor").await.is_err());

        assert_eq!(store.list::<AuditLog>().await.unwrap().len(), 1);
        assert_eq!(store.get::<User>(user.id).await.unwrap().role_id, user.role_id);
    }
}
