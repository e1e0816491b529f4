//! Domain records kept on a board and the JSON shapes the backend speaks.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A record type the store, gateway and backend can manage.
///
/// Implementors describe where they live on the backend (`COLLECTION`), which
/// JSON field carries their rank, and how they render in status messages.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Fields the client sends on create.
    type Draft: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Path segment under `/api/`.
    const COLLECTION: &'static str;
    /// JSON field holding the rank on the wire.
    const RANK_FIELD: &'static str;
    /// Whether the backend requires an authenticated owner for create and delete.
    const OWNED: bool;

    fn id(&self) -> &str;
    fn rank(&self) -> u64;
    fn set_rank(&mut self, rank: u64);

    /// Identifier of the creating user, if the record tracks one.
    fn owner_id(&self) -> Option<&str>;

    /// Text the filter matches against.
    fn search_text(&self) -> String;

    /// Short human label used in notifications.
    fn label(&self) -> String;

    fn created_message(&self) -> String;
    fn ranked_message(&self) -> String;

    /// Checks a draft the way the backend does before accepting it.
    fn validate(draft: &Self::Draft) -> Result<(), String>;

    /// Builds the stored record from an accepted draft.
    fn from_draft(id: String, draft: Self::Draft, owner: Option<UserRef>) -> Self;
}

/// Weak reference to the user that created a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// Missing fields deserialize as empty so validation can report them as a 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlogDraft {
    pub title: String,
    pub author: String,
    pub url: String,
}

impl Resource for Blog {
    type Draft = BlogDraft;

    const COLLECTION: &'static str = "blogs";
    const RANK_FIELD: &'static str = "likes";
    const OWNED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> u64 {
        self.likes
    }

    fn set_rank(&mut self, rank: u64) {
        self.likes = rank;
    }

    fn owner_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.title, self.author)
    }

    fn label(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }

    fn created_message(&self) -> String {
        format!("a new blog {} by {} added", self.title, self.author)
    }

    fn ranked_message(&self) -> String {
        format!("you liked '{}'", self.title)
    }

    fn validate(draft: &BlogDraft) -> Result<(), String> {
        if draft.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if draft.url.trim().is_empty() {
            return Err("url is required".to_string());
        }
        Ok(())
    }

    fn from_draft(id: String, draft: BlogDraft, owner: Option<UserRef>) -> Self {
        Self {
            id,
            title: draft.title,
            author: draft.author,
            url: draft.url,
            likes: 0,
            user: owner,
        }
    }
}

/// A blog as listed under the user who added it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlogSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
}

impl From<&Blog> for BlogSummary {
    fn from(blog: &Blog) -> Self {
        Self {
            id: blog.id.clone(),
            title: blog.title.clone(),
            author: blog.author.clone(),
            url: blog.url.clone(),
        }
    }
}

/// A user together with the blogs they added, as served by `/api/users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub blogs: Vec<BlogSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anecdote {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub votes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnecdoteDraft {
    pub content: String,
}

const MIN_ANECDOTE_LEN: usize = 5;

impl Resource for Anecdote {
    type Draft = AnecdoteDraft;

    const COLLECTION: &'static str = "anecdotes";
    const RANK_FIELD: &'static str = "votes";
    const OWNED: bool = false;

    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> u64 {
        self.votes
    }

    fn set_rank(&mut self, rank: u64) {
        self.votes = rank;
    }

    fn owner_id(&self) -> Option<&str> {
        None
    }

    fn search_text(&self) -> String {
        self.content.clone()
    }

    fn label(&self) -> String {
        format!("'{}'", self.content)
    }

    fn created_message(&self) -> String {
        format!("you created '{}'", self.content)
    }

    fn ranked_message(&self) -> String {
        format!("you voted '{}'", self.content)
    }

    fn validate(draft: &AnecdoteDraft) -> Result<(), String> {
        if draft.content.trim().chars().count() < MIN_ANECDOTE_LEN {
            return Err(format!(
                "anecdote must be at least {MIN_ANECDOTE_LEN} characters long"
            ));
        }
        Ok(())
    }

    fn from_draft(id: String, draft: AnecdoteDraft, _owner: Option<UserRef>) -> Self {
        Self {
            id,
            content: draft.content.trim().to_string(),
            votes: 0,
        }
    }
}
