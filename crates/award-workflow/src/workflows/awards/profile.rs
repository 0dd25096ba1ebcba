use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::domain::{ActorId, ActorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
    pub faculty_id: i64,
    pub department_id: i64,
    pub campus_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub name: String,
    pub organization_type: String,
    pub location: String,
    pub campus_id: i64,
}

/// Profile returned by the identity system for an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorProfile {
    Student(StudentProfile),
    Organization(OrganizationProfile),
}

impl ActorProfile {
    pub fn kind(&self) -> ActorKind {
        match self {
            ActorProfile::Student(_) => ActorKind::Student,
            ActorProfile::Organization(_) => ActorKind::Organization,
        }
    }

    pub fn campus_id(&self) -> i64 {
        match self {
            ActorProfile::Student(profile) => profile.campus_id,
            ActorProfile::Organization(profile) => profile.campus_id,
        }
    }
}

/// Resolves an actor id to a student or organization profile.
pub trait ActorProfileResolver: Send + Sync {
    fn resolve(&self, actor: &ActorId) -> Result<Option<ActorProfile>, ProfileError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("actor profile lookup unavailable: {0}")]
    Unavailable(String),
}

/// In-process actor directory, optionally seeded from a JSON file of
/// `{"actor_id": ..., "kind": "student" | "organization", ...}` entries.
#[derive(Debug, Default)]
pub struct ActorDirectory {
    profiles: RwLock<HashMap<ActorId, ActorProfile>>,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    actor_id: ActorId,
    #[serde(flatten)]
    profile: ActorProfile,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let entries: Vec<DirectoryEntry> =
            serde_json::from_str(raw).map_err(DirectoryError::Parse)?;
        let mut profiles = HashMap::with_capacity(entries.len());
        for entry in entries {
            if profiles.contains_key(&entry.actor_id) {
                return Err(DirectoryError::DuplicateActor(entry.actor_id));
            }
            profiles.insert(entry.actor_id, entry.profile);
        }
        Ok(Self {
            profiles: RwLock::new(profiles),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(DirectoryError::Io)?;
        Self::from_json(&raw)
    }

    pub fn insert(&self, actor: ActorId, profile: ActorProfile) -> Result<(), ProfileError> {
        let mut guard = self
            .profiles
            .write()
            .map_err(|_| ProfileError::Unavailable("actor directory lock poisoned".into()))?;
        guard.insert(actor, profile);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActorProfileResolver for ActorDirectory {
    fn resolve(&self, actor: &ActorId) -> Result<Option<ActorProfile>, ProfileError> {
        let guard = self
            .profiles
            .read()
            .map_err(|_| ProfileError::Unavailable("actor directory lock poisoned".into()))?;
        Ok(guard.get(actor).cloned())
    }
}

#[derive(Debug)]
pub enum DirectoryError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    DuplicateActor(ActorId),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Io(err) => write!(f, "unable to read actor directory: {err}"),
            DirectoryError::Parse(err) => write!(f, "actor directory is not valid JSON: {err}"),
            DirectoryError::DuplicateActor(actor) => {
                write!(f, "actor '{actor}' appears more than once")
            }
        }
    }
}

impl std::error::Error for DirectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DirectoryError::Io(err) => Some(err),
            DirectoryError::Parse(err) => Some(err),
            DirectoryError::DuplicateActor(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"[
        {
            "actor_id": "stu-001",
            "kind": "student",
            "first_name": "Anan",
            "last_name": "Chaiyo",
            "email": "anan@example.edu",
            "student_number": "653040001-1",
            "faculty_id": 1,
            "department_id": 4,
            "campus_id": 1
        },
        {
            "actor_id": "org-robotics",
            "kind": "organization",
            "name": "Robotics Club",
            "organization_type": "club",
            "location": "Engineering Building 2",
            "campus_id": 1
        }
    ]"#;

    #[test]
    fn loads_both_profile_kinds() {
        let directory = ActorDirectory::from_json(DIRECTORY).expect("directory parses");
        assert_eq!(directory.len(), 2);

        let student = directory
            .resolve(&ActorId::new("stu-001"))
            .expect("lookup")
            .expect("student present");
        assert_eq!(student.kind(), ActorKind::Student);

        let org = directory
            .resolve(&ActorId::new("org-robotics"))
            .expect("lookup")
            .expect("organization present");
        assert_eq!(org.kind(), ActorKind::Organization);
        assert_eq!(org.campus_id(), 1);

        assert!(directory
            .resolve(&ActorId::new("ghost"))
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn rejects_duplicate_actor_ids() {
        let raw = r#"[
            {"actor_id": "org-1", "kind": "organization", "name": "A", "organization_type": "club", "location": "X", "campus_id": 1},
            {"actor_id": "org-1", "kind": "organization", "name": "B", "organization_type": "club", "location": "Y", "campus_id": 1}
        ]"#;
        assert!(matches!(
            ActorDirectory::from_json(raw),
            Err(DirectoryError::DuplicateActor(_))
        ));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ActorDirectory::from_path(dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, DirectoryError::Io(_)));
    }
}
