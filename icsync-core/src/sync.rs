//! Snapshot filtering, diffing and mutation application.
//!
//! The feed is the source of truth: each run rebuilds the full canonical
//! snapshot, diffs it against the store's managed events and applies the
//! minimal set of mutations. A killed run heals on the next one, which
//! recomputes the same diff from scratch.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::canonical::canonicalize;
use crate::error::{IcsyncError, IcsyncResult};
use crate::event::{EventResource, StoredEvent};
use crate::feed::FeedEvent;
use crate::normalize::normalize;
use crate::store::TargetStore;
use crate::timezone::TzResolver;

/// Canonicalized feed snapshot, keyed by identity.
pub type Snapshot = HashMap<String, EventResource>;

/// Build the kept snapshot from parsed feed events.
///
/// Recurring masters are always kept; anything else must start on or after
/// `now - retention`. A dropped event neither inserts nor protects an
/// existing target event from deletion.
pub fn snapshot(
    events: &[FeedEvent],
    resolver: &TzResolver,
    now: DateTime<Utc>,
    retention: Duration,
) -> IcsyncResult<Snapshot> {
    let cutoff = now - retention;
    let mut kept = HashMap::new();

    for event in events {
        if !event.is_master() {
            let zone = resolver.default_zone();
            let (_, start) = normalize(&event.start, resolver, &zone)?;
            if start.with_timezone(&Utc) < cutoff {
                continue;
            }
        }

        let (uid, resource) = canonicalize(event, resolver)?;
        kept.insert(uid, resource);
    }

    Ok(kept)
}

/// One run's minimal mutation set.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Feed events with no managed counterpart in the store.
    pub to_insert: Vec<EventResource>,
    /// `(store id, replacement resource)` for fingerprint mismatches.
    pub to_patch: Vec<(String, EventResource)>,
    /// Managed events gone from the snapshot: `(store id, identity)`.
    pub to_delete: Vec<(String, String)>,
    /// Fingerprint matches skipped entirely.
    pub unchanged: usize,
}

/// Counts from an applied plan.
#[derive(Debug, Default, PartialEq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl SyncPlan {
    /// Three-way diff of the current snapshot against the store's managed
    /// events.
    pub fn compute(snapshot: &Snapshot, existing: &[StoredEvent]) -> SyncPlan {
        let existing_by_uid: HashMap<&str, &StoredEvent> =
            existing.iter().map(|e| (e.uid.as_str(), e)).collect();

        let mut plan = SyncPlan::default();

        for (uid, resource) in snapshot {
            match existing_by_uid.get(uid.as_str()) {
                None => plan.to_insert.push(resource.clone()),
                Some(stored) => {
                    if stored.fingerprint.as_deref() == Some(resource.fingerprint()) {
                        plan.unchanged += 1;
                    } else {
                        plan.to_patch.push((stored.id.clone(), resource.clone()));
                    }
                }
            }
        }

        for stored in existing {
            if !snapshot.contains_key(&stored.uid) {
                plan.to_delete.push((stored.id.clone(), stored.uid.clone()));
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_patch.is_empty() && self.to_delete.is_empty()
    }

    /// Apply every mutation sequentially, failing fast on the first store
    /// error. The error carries the triggering identity and, when present,
    /// the recurrence lines that were being written.
    pub async fn apply<S: TargetStore>(&self, store: &S) -> IcsyncResult<SyncStats> {
        let mut stats = SyncStats {
            unchanged: self.unchanged,
            ..SyncStats::default()
        };

        for resource in &self.to_insert {
            store
                .insert(resource)
                .await
                .map_err(|e| mutation_error(e, resource))?;
            stats.created += 1;
        }

        for (event_id, resource) in &self.to_patch {
            store
                .patch(event_id, resource)
                .await
                .map_err(|e| mutation_error(e, resource))?;
            stats.updated += 1;
        }

        for (event_id, uid) in &self.to_delete {
            store
                .delete(event_id)
                .await
                .map_err(|e| IcsyncError::Store(format!("event '{}': {}", uid, flatten(e))))?;
            stats.deleted += 1;
        }

        Ok(stats)
    }
}

/// Attach the identity (and recurrence lines) of the event whose write
/// failed.
fn mutation_error(err: IcsyncError, resource: &EventResource) -> IcsyncError {
    let mut message = format!("event '{}': {}", resource.uid(), flatten(err));
    if let Some(ref lines) = resource.recurrence {
        message.push_str(&format!(" (recurrence: {})", lines.join(" ")));
    }
    IcsyncError::Store(message)
}

fn flatten(err: IcsyncError) -> String {
    match err {
        IcsyncError::Store(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::feed::parse_feed;
    use crate::timezone::{UnknownZonePolicy, windows_aliases};

    fn resolver() -> TzResolver {
        TzResolver::new("Europe/Paris", windows_aliases(), UnknownZonePolicy::Lenient).unwrap()
    }

    fn feed_events(ics: &str) -> Vec<FeedEvent> {
        parse_feed(ics).expect("fixture should parse")
    }

    fn wrap(vevents: &str) -> String {
        format!("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n{vevents}END:VCALENDAR")
    }

    fn timed_vevent(uid: &str, stamp: &str) -> String {
        format!(
            "BEGIN:VEVENT\nUID:{uid}\nSUMMARY:Event {uid}\nDTSTART;TZID=Europe/Paris:{stamp}\nEND:VEVENT\n"
        )
    }

    /// In-memory store recording every mutation.
    #[derive(Default)]
    struct FakeStore {
        existing: Vec<StoredEvent>,
        log: Mutex<Vec<String>>,
        fail_on_insert: bool,
    }

    #[async_trait]
    impl TargetStore for FakeStore {
        async fn list_managed(&self) -> IcsyncResult<Vec<StoredEvent>> {
            Ok(self.existing.clone())
        }

        async fn insert(&self, resource: &EventResource) -> IcsyncResult<StoredEvent> {
            if self.fail_on_insert {
                return Err(IcsyncError::Store("backend rejected the write".into()));
            }
            self.log.lock().unwrap().push(format!("insert {}", resource.uid()));
            Ok(StoredEvent {
                id: format!("gid-{}", resource.uid()),
                uid: resource.uid().to_string(),
                fingerprint: Some(resource.fingerprint().to_string()),
            })
        }

        async fn patch(&self, event_id: &str, resource: &EventResource) -> IcsyncResult<StoredEvent> {
            self.log.lock().unwrap().push(format!("patch {event_id}"));
            Ok(StoredEvent {
                id: event_id.to_string(),
                uid: resource.uid().to_string(),
                fingerprint: Some(resource.fingerprint().to_string()),
            })
        }

        async fn delete(&self, event_id: &str) -> IcsyncResult<()> {
            self.log.lock().unwrap().push(format!("delete {event_id}"));
            Ok(())
        }
    }

    #[test]
    fn test_retention_filter_drops_old_non_recurring_events() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let ics = wrap(&format!(
            "{}{}{}",
            // Two days past the 30-day cutoff: dropped.
            timed_vevent("old", "20250430T090000"),
            // One day inside the cutoff: kept.
            timed_vevent("recent", "20250503T090000"),
            // Recurring master far in the past: always kept.
            timed_vevent("series", "20240101T090000")
                .replace("END:VEVENT", "RRULE:FREQ=WEEKLY\nEND:VEVENT"),
        ));

        let kept = snapshot(&feed_events(&ics), &resolver(), now, Duration::days(30)).unwrap();

        assert!(!kept.contains_key("old"));
        assert!(kept.contains_key("recent"));
        assert!(kept.contains_key("series"));
    }

    #[test]
    fn test_plan_inserts_patches_and_deletes() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let ics = wrap(&format!(
            "{}{}",
            timed_vevent("kept", "20250110T090000"),
            timed_vevent("changed", "20250111T090000"),
        ));
        let kept = snapshot(&feed_events(&ics), &resolver(), now, Duration::days(30)).unwrap();

        let existing = vec![
            StoredEvent {
                id: "gid-kept".to_string(),
                uid: "kept".to_string(),
                fingerprint: Some(kept["kept"].fingerprint().to_string()),
            },
            StoredEvent {
                id: "gid-changed".to_string(),
                uid: "changed".to_string(),
                fingerprint: Some("stale".to_string()),
            },
            StoredEvent {
                id: "gid-gone".to_string(),
                uid: "gone".to_string(),
                fingerprint: None,
            },
        ];

        let plan = SyncPlan::compute(&kept, &existing);

        assert!(plan.to_insert.is_empty());
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.to_patch.len(), 1);
        assert_eq!(plan.to_patch[0].0, "gid-changed");
        assert_eq!(
            plan.to_delete,
            vec![("gid-gone".to_string(), "gone".to_string())]
        );
    }

    #[tokio::test]
    async fn test_second_run_against_synced_store_is_a_no_op() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let ics = wrap(&format!(
            "{}{}",
            timed_vevent("a", "20250110T090000"),
            timed_vevent("b", "20250111T090000"),
        ));
        let kept = snapshot(&feed_events(&ics), &resolver(), now, Duration::days(30)).unwrap();

        // First run: empty store, two inserts.
        let empty = FakeStore::default();
        let plan = SyncPlan::compute(&kept, &empty.list_managed().await.unwrap());
        let stats = plan.apply(&empty).await.unwrap();
        assert_eq!(stats.created, 2);

        // Second run: the store now holds exactly what the feed says.
        let synced = FakeStore {
            existing: kept
                .iter()
                .map(|(uid, res)| StoredEvent {
                    id: format!("gid-{uid}"),
                    uid: uid.clone(),
                    fingerprint: Some(res.fingerprint().to_string()),
                })
                .collect(),
            ..FakeStore::default()
        };
        let plan = SyncPlan::compute(&kept, &synced.list_managed().await.unwrap());

        assert!(plan.is_empty(), "second run must plan zero mutations");
        let stats = plan.apply(&synced).await.unwrap();
        assert_eq!(stats.created + stats.updated + stats.deleted, 0);
        assert_eq!(stats.unchanged, 2);
        assert!(synced.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disappeared_event_gets_exactly_one_delete() {
        let kept = Snapshot::new();
        let store = FakeStore {
            existing: vec![StoredEvent {
                id: "gid-x".to_string(),
                uid: "X".to_string(),
                fingerprint: Some("fp".to_string()),
            }],
            ..FakeStore::default()
        };

        let plan = SyncPlan::compute(&kept, &store.list_managed().await.unwrap());
        let stats = plan.apply(&store).await.unwrap();

        assert_eq!(stats.deleted, 1);
        assert_eq!(*store.log.lock().unwrap(), vec!["delete gid-x".to_string()]);
    }

    #[tokio::test]
    async fn test_mutation_failure_aborts_and_names_the_event() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let ics = wrap(
            &timed_vevent("series", "20250110T090000")
                .replace("END:VEVENT", "RRULE:FREQ=WEEKLY\nEND:VEVENT"),
        );
        let kept = snapshot(&feed_events(&ics), &resolver(), now, Duration::days(30)).unwrap();

        let store = FakeStore {
            fail_on_insert: true,
            ..FakeStore::default()
        };
        let plan = SyncPlan::compute(&kept, &[]);
        let err = plan.apply(&store).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("series"), "error should name the identity: {message}");
        assert!(
            message.contains("RRULE:FREQ=WEEKLY"),
            "error should carry the recurrence lines: {message}"
        );
    }
}
