use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::core::activity::{Activity, ActivityListing, ActivityName, Email};
use crate::core::error::RegistryError;

/// The activity registry. Cloning shares the same underlying state.
///
/// Each sign-up or unregister runs its checks and its mutation under the entry's
/// write guard, so two requests racing for the last slot are serialized.
#[derive(Clone)]
pub struct Db {
    activities: Arc<DashMap<ActivityName, Activity>>,
    order: Arc<RwLock<Vec<ActivityName>>>,
}

impl Db {
    pub fn new() -> Self {
        Self {
            activities: Arc::new(DashMap::new()),
            order: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn get_activity(&self, name: &ActivityName) -> Option<Activity> {
        let activity = self.activities.get(name)?;
        Some(activity.clone())
    }

    pub async fn add_activity(&self, activity: Activity) -> Result<(), RegistryError> {
        validate(&activity)?;

        let mut order = self.order.write().await;
        if !order.contains(&activity.name) {
            order.push(activity.name.clone());
        }
        self.activities.insert(activity.name.clone(), activity);
        Ok(())
    }

    pub async fn list(&self) -> ActivityListing {
        let order = self.order.read().await;
        let activities = order
            .iter()
            .filter_map(|name| self.activities.get(name).map(|a| a.value().clone()))
            .collect();
        ActivityListing::new(activities)
    }

    pub async fn signup(&self, name: &ActivityName, email: Email) -> Result<String, RegistryError> {
        let mut activity = self
            .activities
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound {
                activity: name.clone(),
            })?;

        if activity.is_registered(&email) {
            return Err(RegistryError::AlreadyRegistered {
                activity: name.clone(),
                email,
            });
        }
        if activity.is_full() {
            return Err(RegistryError::Full {
                activity: name.clone(),
                max_participants: activity.max_participants,
            });
        }

        let message = format!("Signed up {email} for {name}");
        activity.participants.push(email);
        Ok(message)
    }

    pub async fn unregister(
        &self,
        name: &ActivityName,
        email: Email,
    ) -> Result<String, RegistryError> {
        let mut activity = self
            .activities
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound {
                activity: name.clone(),
            })?;

        let Some(position) = activity.participants.iter().position(|p| *p == email) else {
            return Err(RegistryError::NotRegistered {
                activity: name.clone(),
                email,
            });
        };

        activity.participants.remove(position);
        Ok(format!("Unregistered {email} from {name}"))
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(activity: &Activity) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidActivity {
        activity: activity.name.clone(),
        reason: reason.to_string(),
    };

    if activity.max_participants == 0 {
        return Err(invalid("max_participants must be at least 1"));
    }
    if activity.participants.len() > activity.max_participants {
        return Err(invalid("more participants than max_participants"));
    }
    let unique: HashSet<&Email> = activity.participants.iter().collect();
    if unique.len() != activity.participants.len() {
        return Err(invalid("duplicate participant"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with(activity: Activity) -> Db {
        let db = Db::new();
        db.add_activity(activity).await.unwrap();
        db
    }

    fn chess() -> Activity {
        Activity::new("Chess Club", "Chess", "Fridays", 3).with_participants(["michael@x.com"])
    }

    #[tokio::test]
    async fn signup_adds_participant() {
        let db = db_with(chess()).await;
        let name = ActivityName::from("Chess Club");

        let message = db.signup(&name, Email::from("a@x.com")).await.unwrap();
        assert_eq!(message, "Signed up a@x.com for Chess Club");

        let activity = db.get_activity(&name).await.unwrap();
        assert_eq!(
            activity.participants,
            vec![Email::from("michael@x.com"), Email::from("a@x.com")]
        );
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected_and_state_unchanged() {
        let db = db_with(chess()).await;
        let name = ActivityName::from("Chess Club");

        db.signup(&name, Email::from("a@x.com")).await.unwrap();
        let err = db.signup(&name, Email::from("a@x.com")).await.unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
        assert_eq!(db.get_activity(&name).await.unwrap().participants.len(), 2);
    }

    #[tokio::test]
    async fn signup_beyond_capacity_is_rejected() {
        let db = db_with(chess()).await;
        let name = ActivityName::from("Chess Club");

        db.signup(&name, Email::from("a@x.com")).await.unwrap();
        db.signup(&name, Email::from("b@x.com")).await.unwrap();
        let err = db.signup(&name, Email::from("c@x.com")).await.unwrap_err();

        assert_eq!(
            err,
            RegistryError::Full {
                activity: name.clone(),
                max_participants: 3,
            }
        );
        assert_eq!(db.get_activity(&name).await.unwrap().participants.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_on_full_activity_reports_already_registered() {
        let db = db_with(Activity::new("Solo", "One seat", "Daily", 1)).await;
        let name = ActivityName::from("Solo");

        db.signup(&name, Email::from("a@x.com")).await.unwrap();
        let err = db.signup(&name, Email::from("a@x.com")).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn unknown_activity_is_not_found() {
        let db = db_with(chess()).await;
        let name = ActivityName::from("chess club");
        assert!(db.get_activity(&name).await.is_none());

        for email in ["a@x.com", "", "michael@x.com"] {
            let err = db.signup(&name, Email::from(email)).await.unwrap_err();
            assert_eq!(err, RegistryError::NotFound { activity: name.clone() });
            let err = db.unregister(&name, Email::from(email)).await.unwrap_err();
            assert_eq!(err, RegistryError::NotFound { activity: name.clone() });
        }
    }

    #[tokio::test]
    async fn unregister_unknown_email_is_rejected() {
        let db = db_with(chess()).await;
        let name = ActivityName::from("Chess Club");

        let err = db
            .unregister(&name, Email::from("ghost@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotRegistered { .. }));
        assert_eq!(db.get_activity(&name).await.unwrap(), chess());
    }

    #[tokio::test]
    async fn signup_then_unregister_restores_participants() {
        let db = Db::new();
        db.add_activity(
            Activity::new("Art Club", "Paint", "Thursdays", 5)
                .with_participants(["x@x.com", "y@x.com"]),
        )
        .await
        .unwrap();
        let name = ActivityName::from("Art Club");
        let before = db.get_activity(&name).await.unwrap();

        db.signup(&name, Email::from("a@x.com")).await.unwrap();
        let message = db.unregister(&name, Email::from("a@x.com")).await.unwrap();

        assert_eq!(message, "Unregistered a@x.com from Art Club");
        assert_eq!(db.get_activity(&name).await.unwrap(), before);
    }

    #[tokio::test]
    async fn unregister_keeps_remaining_order() {
        let db = db_with(
            Activity::new("Art Club", "Paint", "Thursdays", 5)
                .with_participants(["x@x.com", "y@x.com", "z@x.com"]),
        )
        .await;
        let name = ActivityName::from("Art Club");

        db.unregister(&name, Email::from("y@x.com")).await.unwrap();
        assert_eq!(
            db.get_activity(&name).await.unwrap().participants,
            vec![Email::from("x@x.com"), Email::from("z@x.com")]
        );
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let db = Db::new();
        for name in ["Zeta", "Alpha", "Mu"] {
            db.add_activity(Activity::new(name, "d", "s", 1)).await.unwrap();
        }
        db.add_activity(Activity::new("Alpha", "updated", "s", 2))
            .await
            .unwrap();

        let listing = db.list().await;
        let names: Vec<&str> = listing.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mu"]);
        assert_eq!(listing.get("Alpha").unwrap().description, "updated");
    }

    #[tokio::test]
    async fn listing_is_a_snapshot() {
        let db = db_with(chess()).await;
        let listing = db.list().await;

        db.signup(&ActivityName::from("Chess Club"), Email::from("a@x.com"))
            .await
            .unwrap();
        assert_eq!(listing.get("Chess Club").unwrap().participants.len(), 1);
    }

    #[tokio::test]
    async fn add_activity_rejects_broken_invariants() {
        let db = Db::new();

        let zero = Activity::new("Empty", "d", "s", 0);
        let over = Activity::new("Over", "d", "s", 1).with_participants(["a@x.com", "b@x.com"]);
        let dup = Activity::new("Dup", "d", "s", 5).with_participants(["a@x.com", "a@x.com"]);

        for activity in [zero, over, dup] {
            let err = db.add_activity(activity).await.unwrap_err();
            assert!(matches!(err, RegistryError::InvalidActivity { .. }));
        }
        assert!(db.list().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_add_leaves_registry_untouched() {
        let db = db_with(chess()).await;
        let before = db.list().await;

        let overfull = Activity::new("Chess Club", "Chess", "Fridays", 1)
            .with_participants(["a@x.com", "b@x.com"]);
        let ghost = Activity::new("Ghost", "d", "s", 1).with_participants(["a@x.com", "b@x.com"]);
        assert!(db.add_activity(overfull).await.is_err());
        assert!(db.add_activity(ghost).await.is_err());

        assert_eq!(db.list().await, before);
        assert_eq!(
            db.get_activity(&ActivityName::from("Chess Club")).await,
            Some(chess())
        );
        assert!(db.get_activity(&ActivityName::from("Ghost")).await.is_none());
        let err = db
            .signup(&ActivityName::from("Ghost"), Email::from("c@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signups_respect_capacity() {
        let db = db_with(Activity::new("Solo", "One seat", "Daily", 1)).await;
        let name = ActivityName::from("Solo");

        let attempts = (0..32).map(|i| {
            let db = db.clone();
            let name = name.clone();
            tokio::spawn(async move { db.signup(&name, Email::new(format!("s{i}@x.com"))).await })
        });
        let results = futures::future::join_all(attempts).await;

        let successes = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(db.get_activity(&name).await.unwrap().participants.len(), 1);
    }
}
