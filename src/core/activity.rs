use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ActivityName(String);
impl ActivityName {
    pub fn new(name: impl Into<String>) -> Self {
        ActivityName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for ActivityName {
    fn from(value: &str) -> Self {
        ActivityName(value.to_string())
    }
}
impl From<String> for ActivityName {
    fn from(value: String) -> Self {
        ActivityName(value)
    }
}
impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant. Kept verbatim: no trimming, case folding or format checks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);
impl Email {
    pub fn new(email: impl Into<String>) -> Self {
        Email(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for Email {
    fn from(value: &str) -> Self {
        Email(value.to_string())
    }
}
impl From<String> for Email {
    fn from(value: String) -> Self {
        Email(value)
    }
}
impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// The registry key; carried by the enclosing map on the wire.
    #[serde(skip)]
    pub name: ActivityName,
    pub description: String,
    pub schedule: String,
    pub max_participants: usize,
    pub participants: Vec<Email>,
}

impl Activity {
    pub fn new(
        name: impl Into<ActivityName>,
        description: impl Into<String>,
        schedule: impl Into<String>,
        max_participants: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schedule: schedule.into(),
            max_participants,
            participants: Vec::new(),
        }
    }

    pub fn with_participants<I, E>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Email>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_registered(&self, email: &Email) -> bool {
        self.participants.contains(email)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }
}

/// Snapshot of the registry, in seed order. Serialized as a JSON object keyed by
/// activity name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityListing(Vec<Activity>);

impl ActivityListing {
    pub fn new(activities: Vec<Activity>) -> Self {
        ActivityListing(activities)
    }

    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.0.iter().find(|a| a.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&ActivityName> {
        self.0.iter().map(|a| &a.name).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ActivityListing {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for activity in &self.0 {
            map.serialize_entry(&activity.name, activity)?;
        }
        map.end()
    }
}

struct ListingVisitor;

impl<'de> Visitor<'de> for ListingVisitor {
    type Value = ActivityListing;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of activity name to activity")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut activities = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, mut activity)) = access.next_entry::<ActivityName, Activity>()? {
            activity.name = name;
            activities.push(activity);
        }
        Ok(ActivityListing(activities))
    }
}

impl<'de> Deserialize<'de> for ActivityListing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ListingVisitor)
    }
}
