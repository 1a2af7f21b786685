//! Audit repository: append-only writes on a dedicated connection with
//! an in-process replay queue for failed writes.
//!
//! Audit durability never gates financial durability: `append` logs
//! and queues on failure instead of returning an error.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use fintra_core::audit::{AuditEvent, AuditRecord};
use fintra_core::ledger::error::LedgerError;
use fintra_shared::types::{PageRequest, TenantId};

use crate::entities::financial_audits;
use crate::store;

/// Repository for audit rows.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
    pending: Arc<Mutex<VecDeque<AuditEvent>>>,
}

impl AuditRepository {
    /// Creates a new audit repository on its own connection handle.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Appends an audit event, best-effort.
    ///
    /// On write failure the event is queued for [`Self::replay_pending`]
    /// and the failure is logged; the caller's outcome is unaffected.
    pub async fn append(&self, event: AuditEvent) {
        if let Err(err) = self.try_insert(&event).await {
            tracing::warn!(
                action = %event.action,
                tenant_id = %event.tenant_id,
                error = %err,
                "audit write failed, queueing for replay"
            );
            self.pending.lock().await.push_back(event);
        }
    }

    /// Replays queued events; events that fail again go back to the
    /// queue. Returns how many were written.
    pub async fn replay_pending(&self) -> usize {
        let mut queue = self.pending.lock().await;
        let mut written = 0;
        for _ in 0..queue.len() {
            let Some(event) = queue.pop_front() else {
                break;
            };
            if let Err(err) = self.try_insert(&event).await {
                tracing::warn!(error = %err, "audit replay failed, re-queueing");
                queue.push_back(event);
            } else {
                written += 1;
            }
        }
        written
    }

    /// Lists audit records for a tenant, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_for_tenant(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> Result<(Vec<AuditRecord>, u64), LedgerError> {
        let query = financial_audits::Entity::find()
            .filter(financial_audits::Column::TenantId.eq(tenant_id.into_inner()));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(store::map_db_err)?;

        let rows = query
            .order_by_desc(financial_audits::Column::EventTime)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(store::map_db_err)?;

        let records = rows
            .into_iter()
            .map(financial_audits::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    async fn try_insert(&self, event: &AuditEvent) -> Result<(), LedgerError> {
        let metadata = serde_json::to_value(&event.metadata)
            .map_err(|e| LedgerError::AuditWriteFailure(e.to_string()))?;
        let model = financial_audits::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(event.tenant_id.into_inner()),
            user_id: Set(event.user_id.into_inner()),
            action: Set(event.action.as_str().to_string()),
            resource_type: Set(event.resource_type.clone()),
            resource_id: Set(event.resource_id.clone()),
            transaction_id: Set(event.transaction_id.map(fintra_shared::types::TransactionId::into_inner)),
            description: Set(event.description.clone()),
            old_values: Set(event.old_values.clone()),
            new_values: Set(event.new_values.clone()),
            metadata: Set(metadata),
            severity: Set(event.severity.into()),
            event_time: Set(Utc::now().into()),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| LedgerError::AuditWriteFailure(e.to_string()))?;
        Ok(())
    }
}
