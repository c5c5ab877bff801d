use crate::application::services::SyncCoordinator;
use crate::domain::entities::{ChatMessage, MutationPayload, PendingMutation, StoredRecord};
use crate::domain::value_objects::{Collection, RecordId};
use crate::infrastructure::store::LocalStore;
use crate::shared::error::{AppError, Result};
use chrono::Utc;

/// A chat message as the conversation view renders it. `pending` is true
/// until the remote endpoint has acknowledged the message.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub id: RecordId,
    pub message: ChatMessage,
    pub pending: bool,
}

/// Dispatcher chat. Sending is the same optimistic two-step write as every
/// other mutation; the message appears in the conversation immediately and
/// sheds its pending flag once acknowledged.
pub struct MessagingService {
    store: LocalStore,
    coordinator: SyncCoordinator,
}

impl MessagingService {
    pub fn new(store: LocalStore, coordinator: SyncCoordinator) -> Self {
        Self { store, coordinator }
    }

    pub async fn send_message(
        &self,
        conversation_id: &RecordId,
        author_id: &str,
        author_name: &str,
        body: &str,
    ) -> Result<StoredRecord<ChatMessage>> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation(
                "message body must not be empty".to_string(),
            ));
        }

        let record = StoredRecord::draft(ChatMessage {
            conversation_id: conversation_id.clone(),
            author_id: author_id.to_string(),
            author_name: author_name.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        });
        let mutation = PendingMutation::draft(
            record.id.clone(),
            MutationPayload::ChatMessage(record.payload.clone()),
        );
        self.store
            .put_with_mutation(Collection::ChatMessages, &record, &mutation)
            .await?;
        self.coordinator.sync_now();
        Ok(record)
    }

    /// Every message of one conversation, local and remote alike, ordered by
    /// send time. Ids break timestamp ties; they sort by generation time.
    pub async fn conversation(
        &self,
        conversation_id: &RecordId,
    ) -> Result<Vec<ConversationMessage>> {
        let all = self
            .store
            .collection::<ChatMessage>(Collection::ChatMessages)
            .list()
            .await?;

        let mut messages: Vec<ConversationMessage> = all
            .into_iter()
            .filter(|r| &r.payload.conversation_id == conversation_id)
            .map(|r| ConversationMessage {
                id: r.id,
                pending: !r.synced,
                message: r.payload,
            })
            .collect();
        messages.sort_by(|a, b| {
            a.message
                .sent_at
                .cmp(&b.message.sent_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ConnectivityMonitor, MutationOutcome, OutcomeStatus, RemoteChanges, RemoteGateway,
    };
    use crate::infrastructure::connectivity::SharedConnectivity;
    use crate::infrastructure::database::Database;
    use crate::infrastructure::store::Outbox;
    use crate::shared::config::SyncConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullRemote;

    #[async_trait]
    impl RemoteGateway for NullRemote {
        async fn submit_batch(
            &self,
            mutations: &[PendingMutation],
        ) -> Result<Vec<MutationOutcome>> {
            Ok(mutations
                .iter()
                .map(|m| MutationOutcome {
                    id: m.id.clone(),
                    status: OutcomeStatus::Ok,
                    message: None,
                })
                .collect())
        }

        async fn fetch_changes(&self, _since: Option<&str>) -> Result<RemoteChanges> {
            Ok(RemoteChanges::default())
        }
    }

    struct Harness {
        service: MessagingService,
        store: LocalStore,
        coordinator: SyncCoordinator,
        connectivity: Arc<SharedConnectivity>,
    }

    async fn setup() -> Harness {
        let pool = Database::initialize_in_memory().await.unwrap();
        let store = LocalStore::new(pool.clone());
        let outbox = Outbox::new(pool);
        let connectivity = Arc::new(SharedConnectivity::new());
        let coordinator = SyncCoordinator::new(
            store.clone(),
            outbox,
            Arc::new(NullRemote),
            connectivity.clone(),
            SyncConfig::default(),
        );
        Harness {
            service: MessagingService::new(store.clone(), coordinator.clone()),
            store,
            coordinator,
            connectivity,
        }
    }

    #[tokio::test]
    async fn test_sent_message_is_visible_immediately_as_pending() {
        let harness = setup().await;
        let conversation = RecordId::generate();

        let record = harness
            .service
            .send_message(&conversation, "tech-7", "Dana", "running late")
            .await
            .unwrap();
        assert!(!record.synced);

        let messages = harness.service.conversation(&conversation).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].pending);
        assert_eq!(messages[0].message.body, "running late");
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let harness = setup().await;
        let result = harness
            .service
            .send_message(&RecordId::generate(), "tech-7", "Dana", "   ")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_pending_flag_clears_after_acknowledgment() {
        let harness = setup().await;
        let conversation = RecordId::generate();

        harness
            .service
            .send_message(&conversation, "tech-7", "Dana", "on site")
            .await
            .unwrap();

        harness.connectivity.mark_online();
        harness.coordinator.run_cycle().await.unwrap();

        let messages = harness.service.conversation(&conversation).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].pending);
    }

    #[tokio::test]
    async fn test_conversation_merges_local_and_remote_in_send_order() {
        let harness = setup().await;
        let conversation = RecordId::generate();
        let chats = harness
            .store
            .collection::<ChatMessage>(Collection::ChatMessages);

        // A remote message that arrived earlier.
        let remote = StoredRecord::from_remote(
            RecordId::generate(),
            ChatMessage {
                conversation_id: conversation.clone(),
                author_id: "dispatch-1".to_string(),
                author_name: "Ops".to_string(),
                body: "customer confirmed access".to_string(),
                sent_at: Utc::now() - chrono::Duration::minutes(10),
            },
        );
        chats.put(&remote).await.unwrap();

        harness
            .service
            .send_message(&conversation, "tech-7", "Dana", "thanks, heading over")
            .await
            .unwrap();

        let messages = harness.service.conversation(&conversation).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message.author_id, "dispatch-1");
        assert!(!messages[0].pending);
        assert_eq!(messages[1].message.author_id, "tech-7");
        assert!(messages[1].pending);
    }

    #[tokio::test]
    async fn test_other_conversations_are_excluded() {
        let harness = setup().await;
        let conversation_a = RecordId::generate();
        let conversation_b = RecordId::generate();

        harness
            .service
            .send_message(&conversation_a, "tech-7", "Dana", "A")
            .await
            .unwrap();
        harness
            .service
            .send_message(&conversation_b, "tech-7", "Dana", "B")
            .await
            .unwrap();

        let messages = harness.service.conversation(&conversation_a).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message.body, "A");
    }
}
