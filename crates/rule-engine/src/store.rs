//! Rule store: the authoritative ordered rule collection

use crate::error::{BackendError, StoreError, ValidationError};
use crate::model::{new_rule_id, Rule, RuleDocument, RuleDraft, STORAGE_KEY};
use crate::persistence::StorageBackend;
use crate::templates;
use crate::validator::ValidationPolicy;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Events emitted by the rule store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEvent {
    /// Collection replaced from storage
    Loaded { count: usize },
    /// A rule was appended
    Created { rule_id: String, index: usize },
    /// A rule was replaced in place
    Updated { rule_id: String, index: usize },
    /// A rule was removed
    Deleted { rule_id: String, index: usize },
}

/// A rule together with its current position
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRule {
    pub index: usize,
    pub rule: Rule,
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub index: usize,
    pub removed: Rule,
    /// The removed rule was the one open for editing; the caller should leave edit mode
    pub exit_edit: bool,
}

/// Owns the rule collection and persists it after every mutation
pub struct RuleStore {
    rules: RwLock<Vec<Rule>>,
    backend: Arc<dyn StorageBackend>,
    policy: ValidationPolicy,
    event_tx: broadcast::Sender<RuleEvent>,
}

impl RuleStore {
    /// Create an empty store; call [`RuleStore::load`] to read persisted rules
    pub fn new(backend: Arc<dyn StorageBackend>, policy: ValidationPolicy) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            rules: RwLock::new(Vec::new()),
            backend,
            policy,
            event_tx,
        }
    }

    /// Active validation policy
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Subscribe to store events
    pub fn subscribe(&self) -> broadcast::Receiver<RuleEvent> {
        self.event_tx.subscribe()
    }

    /// Replace the collection with what the backend holds.
    ///
    /// Entries without a name are called `Event {n}` after their 1-based
    /// position. Missing or repeated ids are replaced with fresh ones. A missing blob leaves the store empty; a malformed one empties
    /// it and returns [`StoreError::Load`].
    pub async fn load(&self) -> Result<usize, StoreError> {
        let mut rules = self.rules.write().await;

        let blob = match self.backend.get(STORAGE_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!("No stored rules, starting fresh");
                rules.clear();
                let _ = self.event_tx.send(RuleEvent::Loaded { count: 0 });
                return Ok(0);
            }
            Err(e) => {
                tracing::warn!("Failed to read stored rules: {}", e);
                rules.clear();
                return Err(StoreError::Load(e.to_string()));
            }
        };

        let mut document = match serde_json::from_slice::<RuleDocument>(&blob) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Failed to parse stored rules: {}", e);
                rules.clear();
                return Err(StoreError::Load(e.to_string()));
            }
        };

        let mut seen = HashSet::new();
        for (i, rule) in document.events.iter_mut().enumerate() {
            if rule.name.is_empty() {
                rule.name = format!("Event {}", i + 1);
            }
            if rule.id.is_empty() || !seen.insert(rule.id.clone()) {
                tracing::debug!("Assigning a fresh id to rule {}", i + 1);
                rule.id = new_rule_id();
                seen.insert(rule.id.clone());
            }
        }

        *rules = document.events;
        let count = rules.len();
        tracing::info!("Loaded {} rules", count);
        let _ = self.event_tx.send(RuleEvent::Loaded { count });
        Ok(count)
    }

    /// Snapshot of all rules, in order
    pub async fn list(&self) -> Vec<Rule> {
        self.rules.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }

    /// Get rule by id
    pub async fn get(&self, id: &str) -> Option<StoredRule> {
        let rules = self.rules.read().await;
        position_of(&rules, id).map(|index| StoredRule {
            index,
            rule: rules[index].clone(),
        })
    }

    /// Current position of a rule id
    pub async fn position(&self, id: &str) -> Option<usize> {
        position_of(&*self.rules.read().await, id)
    }

    /// Validate and append a new rule
    pub async fn create(&self, draft: RuleDraft) -> Result<StoredRule, StoreError> {
        let draft = self.policy.validate(draft)?;
        let action = draft.action.ok_or(ValidationError::MissingAction)?;
        let rule = draft.into_rule(new_rule_id(), action);

        let mut rules = self.rules.write().await;
        rules.push(rule.clone());
        let index = rules.len() - 1;

        tracing::info!("Created rule: {} ({})", rule.name, rule.id);
        let _ = self.event_tx.send(RuleEvent::Created {
            rule_id: rule.id.clone(),
            index,
        });

        self.persist(&rules, index).await?;
        Ok(StoredRule { index, rule })
    }

    /// Validate and replace the rule at `index`, keeping its id
    pub async fn update(&self, index: usize, draft: RuleDraft) -> Result<StoredRule, StoreError> {
        let mut rules = self.rules.write().await;
        self.replace_at(&mut rules, index, draft).await
    }

    /// Update the rule with this id wherever it currently sits
    pub async fn update_by_id(&self, id: &str, draft: RuleDraft) -> Result<StoredRule, StoreError> {
        let mut rules = self.rules.write().await;
        let index = position_of(&rules, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.replace_at(&mut rules, index, draft).await
    }

    /// Remove the rule at `index`.
    ///
    /// `editing` is the id of the rule the caller has open, if any.
    pub async fn delete(
        &self,
        index: usize,
        editing: Option<&str>,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut rules = self.rules.write().await;
        self.remove_at(&mut rules, index, editing).await
    }

    /// Delete the rule with this id wherever it currently sits
    pub async fn delete_by_id(
        &self,
        id: &str,
        editing: Option<&str>,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut rules = self.rules.write().await;
        let index = position_of(&rules, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.remove_at(&mut rules, index, editing).await
    }

    /// Append a built-in template by slug or name
    pub async fn add_template(&self, key: &str) -> Result<StoredRule, StoreError> {
        let template =
            templates::find(key).ok_or_else(|| StoreError::TemplateNotFound(key.to_string()))?;
        tracing::debug!("Adding template {}", template.slug);
        self.create(template.rule).await
    }

    async fn replace_at(
        &self,
        rules: &mut Vec<Rule>,
        index: usize,
        draft: RuleDraft,
    ) -> Result<StoredRule, StoreError> {
        if index >= rules.len() {
            return Err(StoreError::Index {
                index,
                len: rules.len(),
            });
        }

        let draft = self.policy.validate(draft)?;
        let action = draft.action.ok_or(ValidationError::MissingAction)?;
        let rule = draft.into_rule(rules[index].id.clone(), action);
        rules[index] = rule.clone();

        tracing::info!("Updated rule: {} ({})", rule.name, rule.id);
        let _ = self.event_tx.send(RuleEvent::Updated {
            rule_id: rule.id.clone(),
            index,
        });

        self.persist(rules, index).await?;
        Ok(StoredRule { index, rule })
    }

    async fn remove_at(
        &self,
        rules: &mut Vec<Rule>,
        index: usize,
        editing: Option<&str>,
    ) -> Result<DeleteOutcome, StoreError> {
        if index >= rules.len() {
            return Err(StoreError::Index {
                index,
                len: rules.len(),
            });
        }

        let removed = rules.remove(index);
        let exit_edit = editing == Some(removed.id.as_str());

        tracing::info!("Deleted rule: {} ({})", removed.name, removed.id);
        let _ = self.event_tx.send(RuleEvent::Deleted {
            rule_id: removed.id.clone(),
            index,
        });

        self.persist(rules, index).await?;
        Ok(DeleteOutcome {
            index,
            removed,
            exit_edit,
        })
    }

    /// Save the whole collection
    async fn persist(&self, rules: &[Rule], index: usize) -> Result<(), StoreError> {
        let document = RuleDocument {
            events: rules.to_vec(),
        };
        let result = match serde_json::to_vec(&document) {
            Ok(blob) => self.backend.set(STORAGE_KEY, blob).await,
            Err(e) => Err(BackendError::Other(e.to_string())),
        };

        result.map_err(|source| {
            tracing::error!("Failed to save rules: {}", source);
            StoreError::Persist { index, source }
        })
    }
}

fn position_of(rules: &[Rule], id: &str) -> Option<usize> {
    rules.iter().position(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::model::{Action, Condition};
    use crate::persistence::{FileBackend, MemoryBackend};
    use async_trait::async_trait;

    fn draft(name: &str, hour: &str) -> RuleDraft {
        RuleDraft {
            name: name.to_string(),
            action: Some(Action::Click),
            condition: Condition {
                hour: Some(hour.to_string()),
                ..Default::default()
            },
            repeat: String::new(),
        }
    }

    fn memory_store() -> (Arc<MemoryBackend>, RuleStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = RuleStore::new(backend.clone(), ValidationPolicy::lenient());
        (backend, store)
    }

    struct FailingBackend;

    #[async_trait]
    impl StorageBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, BackendError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), BackendError> {
            Err(BackendError::Other("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_create_then_load_round_trips() {
        let (backend, store) = memory_store();
        store.create(draft("First", "07:00")).await.unwrap();
        let created = store.create(draft("  Second ", "08:00")).await.unwrap();
        assert_eq!(created.index, 1);

        let reloaded = RuleStore::new(backend, ValidationPolicy::lenient());
        assert_eq!(reloaded.load().await.unwrap(), 2);
        let rules = reloaded.list().await;
        assert_eq!(rules[1], created.rule);
        assert_eq!(rules[1].name, "Second");
        assert_eq!(rules[1].repeat, "one_time");
    }

    #[tokio::test]
    async fn test_load_assigns_default_names() {
        let (backend, store) = memory_store();
        backend.insert(
            STORAGE_KEY,
            r#"{"events":[
                {"action":"click","condition":{"hour":"08:00"},"repeat":"always"},
                {"name":"Keep me","action":"click","condition":{"luminosity":80},"repeat":"always"},
                {"name":"","action":"double_click","condition":{"hour":"07:00"},"repeat":"SaSu"}
            ]}"#,
        );

        assert_eq!(store.load().await.unwrap(), 3);
        let names: Vec<String> = store.list().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Event 1", "Keep me", "Event 3"]);
    }

    #[tokio::test]
    async fn test_load_replaces_duplicate_ids() {
        let (backend, store) = memory_store();
        backend.insert(
            STORAGE_KEY,
            r#"{"events":[
                {"id":"same","name":"A","action":"click","condition":{"hour":"08:00"},"repeat":"always"},
                {"id":"same","name":"B","action":"click","condition":{"hour":"09:00"},"repeat":"always"},
                {"id":"","name":"C","action":"click","condition":{"hour":"10:00"},"repeat":"always"}
            ]}"#,
        );

        assert_eq!(store.load().await.unwrap(), 3);
        let rules = store.list().await;
        assert_eq!(rules[0].id, "same");
        assert_ne!(rules[1].id, "same");
        assert!(!rules[2].id.is_empty());
        assert_ne!(rules[1].id, rules[2].id);

        let b = store.get(&rules[1].id).await.unwrap();
        assert_eq!(b.rule.name, "B");
        let outcome = store.delete_by_id(&rules[1].id, None).await.unwrap();
        assert_eq!(outcome.index, 1);
        assert_eq!(store.get("same").await.unwrap().rule.name, "A");
    }

    #[tokio::test]
    async fn test_load_missing_blob_is_empty() {
        let (_, store) = memory_store();
        assert_eq!(store.load().await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_malformed_blob_empties_collection() {
        let (backend, store) = memory_store();
        store.create(draft("Existing", "07:00")).await.unwrap();
        backend.insert(STORAGE_KEY, "{not json");

        assert!(matches!(store.load().await, Err(StoreError::Load(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_action_without_partial_apply() {
        let (backend, store) = memory_store();
        backend.insert(
            STORAGE_KEY,
            r#"{"events":[
                {"name":"ok","action":"click","condition":{"hour":"08:00"},"repeat":"always"},
                {"name":"bad","action":"","condition":{},"repeat":""}
            ]}"#,
        );
        assert!(store.load().await.is_err());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_draft_leaves_collection_unchanged() {
        let (backend, store) = memory_store();
        let mut bad = draft("No action", "07:00");
        bad.action = None;

        let err = store.create(bad).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingAction)
        ));
        assert!(store.is_empty().await);
        assert!(backend.raw(STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_id_and_order() {
        let (_, store) = memory_store();
        let first = store.create(draft("A", "07:00")).await.unwrap();
        store.create(draft("B", "08:00")).await.unwrap();

        let updated = store.update(0, draft("A2", "09:30")).await.unwrap();
        assert_eq!(updated.rule.id, first.rule.id);

        let rules = store.list().await;
        assert_eq!(rules[0].name, "A2");
        assert_eq!(rules[0].condition.hour.as_deref(), Some("09:30"));
        assert_eq!(rules[1].name, "B");
    }

    #[tokio::test]
    async fn test_out_of_range_index() {
        let (_, store) = memory_store();
        store.create(draft("A", "07:00")).await.unwrap();

        assert!(matches!(
            store.update(1, draft("B", "08:00")).await,
            Err(StoreError::Index { index: 1, len: 1 })
        ));
        assert!(matches!(
            store.delete(3, None).await,
            Err(StoreError::Index { index: 3, len: 1 })
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_signals_exit_edit() {
        let (_, store) = memory_store();
        let a = store.create(draft("A", "07:00")).await.unwrap();
        let b = store.create(draft("B", "08:00")).await.unwrap();

        let outcome = store.delete(0, Some(&b.rule.id)).await.unwrap();
        assert!(!outcome.exit_edit);
        assert_eq!(outcome.removed.id, a.rule.id);

        // B shifted to position 0 but is still found by id
        assert_eq!(store.position(&b.rule.id).await, Some(0));
        let outcome = store.delete_by_id(&b.rule.id, Some(&b.rule.id)).await.unwrap();
        assert!(outcome.exit_edit);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_in_memory_change() {
        let store = RuleStore::new(Arc::new(FailingBackend), ValidationPolicy::lenient());
        let err = store.create(draft("A", "07:00")).await.unwrap_err();
        assert!(matches!(err, StoreError::Persist { index: 0, .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_template() {
        let (_, store) = memory_store();
        let added = store.add_template("workday-start").await.unwrap();
        assert_eq!(added.rule.name, "Workday Start");
        assert_eq!(added.rule.repeat, "MoTuWeThFr");
        assert!(matches!(
            store.add_template("nope").await,
            Err(StoreError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (_, store) = memory_store();
        let mut rx = store.subscribe();
        let created = store.create(draft("A", "07:00")).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            RuleEvent::Created {
                rule_id: created.rule.id,
                index: 0
            }
        );
    }

    #[tokio::test]
    async fn test_file_backend_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(
            Arc::new(FileBackend::new(dir.path())),
            ValidationPolicy::strict(),
        );
        let mut d = draft("Dated", "10:15");
        d.condition.date = Some("01/06/2025".to_string());
        d.repeat = "always".to_string();
        store.create(d).await.unwrap();

        let reopened = RuleStore::new(
            Arc::new(FileBackend::new(dir.path())),
            ValidationPolicy::strict(),
        );
        reopened.load().await.unwrap();
        let rules = reopened.list().await;
        assert_eq!(rules[0].condition.date.as_deref(), Some("01/06/2025"));
        assert_eq!(rules[0].repeat, "one_time");
    }
}
