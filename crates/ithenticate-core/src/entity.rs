//! Content entities as seen by the submission pipeline.
//!
//! A [`ContentEntity`] is the typed projection of a CMS node: its key, its
//! title, the attached paper file, and whatever author data it exposes.
//! [`resolve_submitter`] picks the name sent to iThenticate, and
//! [`FileSource`] turns a [`FileRef`] into bytes.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::NODE_ENTITY_TYPE;

/// Author type marking the corresponding author.
pub const CORRESPONDING_AUTHOR: &str = "corresponding";

/// Reference to a stored file attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub fid: i64,
    pub filename: String,
    /// Location understood by the [`FileSource`] (a path relative to its root).
    pub uri: String,
}

/// A loaded file ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

/// One entry of an entity's author collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub types: Vec<String>,
}

impl Author {
    pub fn is_corresponding(&self) -> bool {
        self.types.iter().any(|t| t == CORRESPONDING_AUTHOR)
    }
}

/// Parses `FIRST:LAST[:type[,type...]]`.
impl FromStr for Author {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let first = parts.next().unwrap_or_default().trim();
        let last = parts
            .next()
            .ok_or_else(|| format!("author '{}' must look like FIRST:LAST[:TYPES]", s))?
            .trim();
        let types = parts
            .next()
            .map(|t| {
                t.split(',')
                    .map(|x| x.trim().to_string())
                    .filter(|x| !x.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Author {
            first_name: non_empty(first),
            last_name: non_empty(last),
            types,
        })
    }
}

/// The owning user's profile name fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Parses `FIRST:LAST`.
impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, last) = s
            .split_once(':')
            .ok_or_else(|| format!("owner '{}' must look like FIRST:LAST", s))?;
        Ok(Profile {
            first_name: non_empty(first.trim()),
            last_name: non_empty(last.trim()),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// A content entity eligible for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentEntity {
    pub entity_type: String,
    pub bundle: String,
    pub entity_id: i64,
    pub revision_id: Option<i64>,
    pub title: String,
    pub file: Option<FileRef>,
    /// `None` when the bundle has no author collection at all.
    pub authors: Option<Vec<Author>>,
    pub owner: Option<Profile>,
}

impl ContentEntity {
    /// A node of the given bundle with no file and no author data.
    pub fn node(bundle: impl Into<String>, entity_id: i64, title: impl Into<String>) -> Self {
        Self {
            entity_type: NODE_ENTITY_TYPE.to_string(),
            bundle: bundle.into(),
            entity_id,
            revision_id: None,
            title: title.into(),
            file: None,
            authors: None,
            owner: None,
        }
    }

    pub fn with_revision(mut self, revision_id: i64) -> Self {
        self.revision_id = Some(revision_id);
        self
    }

    pub fn with_file(mut self, file: FileRef) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = Some(authors);
        self
    }

    pub fn with_owner(mut self, owner: Profile) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Name reported to iThenticate as the document's author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submitter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.first_name.as_deref().unwrap_or("?"),
            self.last_name.as_deref().unwrap_or("?")
        )
    }
}

/// Pick the submitter name for an entity.
///
/// With an author collection, the first corresponding author wins; a
/// collection without one yields no names. Only entities without an author
/// collection fall back to the owner's profile.
pub fn resolve_submitter(entity: &ContentEntity) -> Submitter {
    if let Some(authors) = &entity.authors {
        return authors
            .iter()
            .find(|a| a.is_corresponding())
            .map(|author| Submitter {
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
            })
            .unwrap_or_default();
    }

    entity
        .owner
        .as_ref()
        .map(|p| Submitter {
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
        })
        .unwrap_or_default()
}

/// Everything the vendor needs to register one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    pub title: String,
    pub file_bytes: Vec<u8>,
    pub filename: String,
    pub first_name: String,
    pub last_name: String,
    pub folder: i64,
}

/// Resolves file references to their contents.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Returns `Ok(None)` when the referenced file does not exist.
    async fn load(&self, file: &FileRef) -> Result<Option<LoadedFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(first: &str, last: &str, types: &[&str]) -> Author {
        Author {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn owner() -> Profile {
        Profile {
            first_name: Some("Owen".to_string()),
            last_name: Some("Owner".to_string()),
        }
    }

    #[test]
    fn test_corresponding_author_wins_over_owner() {
        let entity = ContentEntity::node("paper", 1, "On Engines")
            .with_owner(owner())
            .with_authors(vec![
                author("Charles", "Babbage", &["contributing"]),
                author("Ada", "Lovelace", &["contributing", "corresponding"]),
            ]);
        let submitter = resolve_submitter(&entity);
        assert_eq!(submitter.first_name.as_deref(), Some("Ada"));
        assert_eq!(submitter.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn test_first_corresponding_author_is_used() {
        let entity = ContentEntity::node("paper", 1, "t").with_authors(vec![
            author("Ada", "Lovelace", &["corresponding"]),
            author("Grace", "Hopper", &["corresponding"]),
        ]);
        assert_eq!(
            resolve_submitter(&entity).first_name.as_deref(),
            Some("Ada")
        );
    }

    #[test]
    fn test_owner_used_without_author_collection() {
        let entity = ContentEntity::node("paper", 1, "t").with_owner(owner());
        let submitter = resolve_submitter(&entity);
        assert_eq!(submitter.first_name.as_deref(), Some("Owen"));
        assert_eq!(submitter.last_name.as_deref(), Some("Owner"));
    }

    #[test]
    fn test_authors_without_corresponding_yield_no_names() {
        let entity = ContentEntity::node("paper", 1, "t")
            .with_owner(owner())
            .with_authors(vec![author("Charles", "Babbage", &["contributing"])]);
        assert_eq!(resolve_submitter(&entity), Submitter::default());
    }

    #[test]
    fn test_empty_author_collection_skips_owner() {
        let entity = ContentEntity::node("paper", 1, "t")
            .with_owner(owner())
            .with_authors(Vec::new());
        assert_eq!(resolve_submitter(&entity), Submitter::default());
    }

    #[test]
    fn test_no_names_at_all() {
        let entity = ContentEntity::node("paper", 1, "t");
        assert_eq!(resolve_submitter(&entity), Submitter::default());
    }

    #[test]
    fn test_parse_author() {
        let a: Author = "Ada:Lovelace:corresponding".parse().unwrap();
        assert!(a.is_corresponding());
        assert_eq!(a.first_name.as_deref(), Some("Ada"));

        let b: Author = "Charles:Babbage".parse().unwrap();
        assert!(!b.is_corresponding());
        assert!(b.types.is_empty());

        assert!("Nobody".parse::<Author>().is_err());
    }

    #[test]
    fn test_parse_profile() {
        let p: Profile = "Owen:Owner".parse().unwrap();
        assert_eq!(p.last_name.as_deref(), Some("Owner"));
        let empty: Profile = ":".parse().unwrap();
        assert_eq!(empty, Profile::default());
        assert!("Owen".parse::<Profile>().is_err());
    }
}
