use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identity of a friend within one loaded registry.
///
/// Ids are handed out in insertion order and never reused, so a queued
/// operation keeps pointing at the same friend even after earlier entries
/// were removed and positions shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FriendId(u64);

/// A registered friend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friend {
    pub id: FriendId,
    pub name: String,
}

/// Ordered list of unique friend names.
///
/// Persists as a plain JSON array of names; ids exist only in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendRegistry {
    friends: Vec<Friend>,
    next_id: u64,
}

impl FriendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored names. Later duplicates are dropped so the
    /// uniqueness invariant holds even for hand-edited files.
    pub fn from_names<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            let name = name.into();
            if !registry.contains(&name) {
                registry.push(name);
            }
        }
        registry
    }

    /// Append a name without checking for duplicates. Returns its new id.
    pub(crate) fn push(&mut self, name: String) -> FriendId {
        let id = FriendId(self.next_id);
        self.next_id += 1;
        self.friends.push(Friend { id, name });
        id
    }

    pub fn len(&self) -> usize {
        self.friends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
    }

    /// Exact, case-sensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.friends.iter().any(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Friend> {
        self.friends.iter()
    }

    /// Names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.friends.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn get(&self, id: FriendId) -> Option<&Friend> {
        self.friends.iter().find(|f| f.id == id)
    }

    pub fn position(&self, id: FriendId) -> Option<usize> {
        self.friends.iter().position(|f| f.id == id)
    }

    pub fn id_of(&self, name: &str) -> Option<FriendId> {
        self.friends.iter().find(|f| f.name == name).map(|f| f.id)
    }

    /// Id of the friend at `index`, but only if it still carries `name`.
    pub fn id_at(&self, index: usize, name: &str) -> Option<FriendId> {
        self.friends
            .get(index)
            .filter(|f| f.name == name)
            .map(|f| f.id)
    }

    pub(crate) fn set_name(&mut self, id: FriendId, name: String) -> Option<String> {
        let friend = self.friends.iter_mut().find(|f| f.id == id)?;
        Some(std::mem::replace(&mut friend.name, name))
    }

    pub(crate) fn remove(&mut self, id: FriendId) -> Option<Friend> {
        let idx = self.position(id)?;
        Some(self.friends.remove(idx))
    }
}

impl Serialize for FriendRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.friends.iter().map(|f| &f.name))
    }
}

impl<'de> Deserialize<'de> for FriendRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(FriendRegistry::from_names(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_survive_removal_of_earlier_entries() {
        let mut reg = FriendRegistry::from_names(["Ann", "Bo", "Cy"]);
        let cy = reg.id_of("Cy").unwrap();
        reg.remove(reg.id_of("Ann").unwrap());

        assert_eq!(reg.position(cy), Some(1));
        assert_eq!(reg.get(cy).unwrap().name, "Cy");
    }

    #[test]
    fn id_at_rejects_stale_name() {
        let reg = FriendRegistry::from_names(["Ann", "Bo"]);
        assert!(reg.id_at(1, "Bo").is_some());
        assert!(reg.id_at(1, "Ann").is_none());
        assert!(reg.id_at(5, "Bo").is_none());
    }

    #[test]
    fn from_names_drops_duplicates() {
        let reg = FriendRegistry::from_names(["Ann", "ann", "Ann"]);
        assert_eq!(reg.names(), vec!["Ann", "ann"]);
    }

    #[test]
    fn serializes_as_plain_name_array() {
        let reg = FriendRegistry::from_names(["Ann", "小明"]);
        let json = serde_json::to_string(&reg).unwrap();
        assert_eq!(json, r#"["Ann","小明"]"#);

        let back: FriendRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.names(), vec!["Ann", "小明"]);
    }
}
