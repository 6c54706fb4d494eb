// src/services/audit_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::Store,
    models::audit::{AuditLog, NewAuditLog},
};

/// Grava uma entrada de auditoria em qualquer `Store`, inclusive numa transação
/// aberta, para que a entrada só exista se a operação auditada for confirmada.
pub(crate) async fn append<St: Store>(
    store: &St,
    actor: Option<i64>,
    action: &str,
    details: Option<String>,
) -> Result<AuditLog, AppError> {
    let entry = store
        .insert(NewAuditLog {
            user_id: actor,
            action: action.to_string(),
            details,
        })
        .await?;

    tracing::info!("📝 Auditoria: {} (autor: {:?})", entry.action, entry.user_id);
    Ok(entry)
}

// Trilha de auditoria: só grava, nunca altera nem apaga.
pub struct AuditService<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<S: Store> AuditService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        actor: Option<i64>,
        action: &str,
        details: Option<String>,
    ) -> Result<AuditLog, AppError> {
        append(&*self.store, actor, action, details).await
    }

    /// Histórico completo, do mais antigo para o mais recente.
    pub async fn history(&self) -> Result<Vec<AuditLog>, AppError> {
        self.store.list::<AuditLog>().await
    }

    pub async fn history_for_user(&self, user_id: i64) -> Result<Vec<AuditLog>, AppError> {
        let entries = self.history().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.user_id == Some(user_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::auth::{NewRole, NewUser, User};

    async fn store_with_user() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let role = store
            .insert(NewRole { name: "admin".into(), description: None })
            .await
            .unwrap();
        let user = store
            .insert(NewUser {
                role_id: role.id,
                username: "auditor".into(),
                email: "auditor@example.com".into(),
                password_hash: "hash".into(),
                full_name: "Audit Person".into(),
                phone: None,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn records_are_append_only() {
        let (store, user) = store_with_user().await;
        let audit = AuditService::new(store.clone());

        let entry = audit
            .record(Some(user.id), "invoice.marked_paid", Some("INV-2025-0001".into()))
            .await
            .unwrap();

        let mut edited = entry.clone();
        edited.action = "tampered".into();
        assert!(matches!(store.update(&edited).await, Err(AppError::AppendOnly(_))));
        assert!(matches!(
            store.delete::<AuditLog>(entry.id).await,
            Err(AppError::AppendOnly(_))
        ));

        let history = audit.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "invoice.marked_paid");
    }

    #[tokio::test]
    async fn removing_the_actor_keeps_the_entry() {
        let (store, user) = store_with_user().await;
        let audit = AuditService::new(store.clone());
        audit.record(Some(user.id), "user.login", None).await.unwrap();

        store.delete::<User>(user.id).await.unwrap();

        let history = audit.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_id, None);
        assert!(audit.history_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_action_is_a_missing_field() {
        let (store, _) = store_with_user().await;
        let audit = AuditService::new(store);

        let err = audit.record(None, " ", None).await.unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredField { ref column, .. } if column == "action"));
    }
}
