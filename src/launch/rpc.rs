//! Channel to the annotation client running next to the launched content.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered annotation events per subscriber.
const ACTIVITY_CAPACITY: usize = 16;

/// Kind of annotation activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationEventType {
    /// A new annotation or reply.
    Create,
    /// An edit to an existing annotation.
    Update,
    /// An annotation was removed.
    Delete,
    /// Flagged for moderation.
    Flag,
}

/// One annotation-activity notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationActivity {
    pub event_type: AnnotationEventType,
    /// False for private annotations.
    pub is_shared: bool,
}

impl AnnotationActivity {
    /// Creating or editing a shared annotation counts as gradable work.
    #[must_use]
    pub fn qualifies_for_submission(&self) -> bool {
        matches!(
            self.event_type,
            AnnotationEventType::Create | AnnotationEventType::Update
        ) && self.is_shared
    }
}

/// Calls into the annotation client.
///
/// Dropping a receiver returned by
/// [`annotation_activity`](Self::annotation_activity) deregisters it.
pub trait ClientRpc: Send + Sync {
    /// Tells the client which groups the student belongs to.
    fn set_groups(&self, groups: Vec<String>);

    /// Subscribes to annotation-activity notifications.
    fn annotation_activity(&self) -> broadcast::Receiver<AnnotationActivity>;
}

/// In-process [`ClientRpc`] backed by a broadcast channel.
#[derive(Debug)]
pub struct BroadcastClientRpc {
    groups: Mutex<Option<Vec<String>>>,
    activity: broadcast::Sender<AnnotationActivity>,
}

impl Default for BroadcastClientRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastClientRpc {
    #[must_use]
    pub fn new() -> Self {
        let (activity, _) = broadcast::channel(ACTIVITY_CAPACITY);
        Self {
            groups: Mutex::new(None),
            activity,
        }
    }

    /// Delivers `activity` to current subscribers. Returns how many received it.
    pub fn publish(&self, activity: AnnotationActivity) -> usize {
        self.activity.send(activity).unwrap_or(0)
    }

    /// Groups last passed to [`ClientRpc::set_groups`].
    #[must_use]
    pub fn groups(&self) -> Option<Vec<String>> {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of live activity subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.activity.receiver_count()
    }
}

impl ClientRpc for BroadcastClientRpc {
    fn set_groups(&self, groups: Vec<String>) {
        debug!(count = groups.len(), "Forwarding groups to annotation client");
        *self.groups.lock().unwrap_or_else(PoisonError::into_inner) = Some(groups);
    }

    fn annotation_activity(&self) -> broadcast::Receiver<AnnotationActivity> {
        self.activity.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn activity(event_type: AnnotationEventType, is_shared: bool) -> AnnotationActivity {
        AnnotationActivity {
            event_type,
            is_shared,
        }
    }

    #[test]
    fn test_only_shared_creates_and_updates_qualify() {
        assert!(activity(AnnotationEventType::Create, true).qualifies_for_submission());
        assert!(activity(AnnotationEventType::Update, true).qualifies_for_submission());
        assert!(!activity(AnnotationEventType::Create, false).qualifies_for_submission());
        assert!(!activity(AnnotationEventType::Delete, true).qualifies_for_submission());
        assert!(!activity(AnnotationEventType::Flag, true).qualifies_for_submission());
    }

    #[test]
    fn test_activity_deserializes_from_client_payload() {
        let parsed: AnnotationActivity =
            serde_json::from_str(r#"{"eventType": "update", "isShared": true}"#).unwrap();
        assert_eq!(parsed, activity(AnnotationEventType::Update, true));
    }

    #[tokio::test]
    async fn test_dropping_receiver_deregisters() {
        let rpc = BroadcastClientRpc::new();
        let mut receiver = rpc.annotation_activity();
        assert_eq!(rpc.subscriber_count(), 1);

        assert_eq!(rpc.publish(activity(AnnotationEventType::Create, true)), 1);
        assert_eq!(
            receiver.recv().await.unwrap(),
            activity(AnnotationEventType::Create, true)
        );

        drop(receiver);
        assert_eq!(rpc.subscriber_count(), 0);
        assert_eq!(rpc.publish(activity(AnnotationEventType::Create, true)), 0);
    }

    #[test]
    fn test_set_groups_is_recorded() {
        let rpc = BroadcastClientRpc::new();
        assert_eq!(rpc.groups(), None);
        rpc.set_groups(vec!["g1".to_string(), "g2".to_string()]);
        assert_eq!(rpc.groups().unwrap(), vec!["g1", "g2"]);
    }
}
