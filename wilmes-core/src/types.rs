//! Core domain types for wilmes
//!
//! These types are the normalized model the page extractors produce from
//! the portal's markup.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Pupil** | The child whose mailbox a guardian account reads |
//! | **Origin** | Base URL of the portal instance a session is bound to |
//! | **Summary** | Entity built from a listing (cheap, partial) |
//! | **Detail** | Summary plus the fields of its own page (one more fetch) |
//!
//! Detail entities embed their summary by value and can only be built
//! through a single constructor, so a half-filled message never exists.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instant with the offset it was observed or localized in
pub type Timestamp = DateTime<FixedOffset>;

// ============================================
// Identifiers
// ============================================

/// Opaque pupil identifier (the digits of a `/!{id}` link)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PupilId(pub String);

impl PupilId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PupilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PupilId {
    fn from(s: &str) -> Self {
        PupilId(s.to_string())
    }
}

/// Numeric message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric announcement identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnouncementId(pub u64);

impl fmt::Display for AnnouncementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// Pupil
// ============================================

/// A pupil listed on the front page of a guardian account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pupil {
    pub id: PupilId,
    pub name: String,
}

// ============================================
// Person
// ============================================

/// Role tag of a person, spelled the way the portal spells it in profile
/// paths (`/profiles/teachers/123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PersonRole {
    Teachers,
    Personnel,
    Others,
    Students,
    Guardians,
    /// Any tag the portal uses that we have no variant for
    Unrecognized(String),
}

impl PersonRole {
    /// Returns the tag as used in portal URLs
    pub fn as_str(&self) -> &str {
        match self {
            PersonRole::Teachers => "teachers",
            PersonRole::Personnel => "personnel",
            PersonRole::Others => "others",
            PersonRole::Students => "students",
            PersonRole::Guardians => "guardians",
            PersonRole::Unrecognized(tag) => tag,
        }
    }

    /// Map the `SenderType` code of the message list payload.
    ///
    /// Code 2 has never been seen with a profile page, so its tag is kept
    /// as the placeholder `unknown2`.
    pub fn from_sender_type(code: i64) -> Option<Self> {
        match code {
            1 => Some(PersonRole::Teachers),
            2 => Some(PersonRole::Unrecognized("unknown2".to_string())),
            3 => Some(PersonRole::Personnel),
            4 => Some(PersonRole::Others),
            _ => None,
        }
    }
}

impl From<String> for PersonRole {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "teachers" => PersonRole::Teachers,
            "personnel" => PersonRole::Personnel,
            "others" => PersonRole::Others,
            "students" => PersonRole::Students,
            "guardians" => PersonRole::Guardians,
            _ => PersonRole::Unrecognized(tag),
        }
    }
}

impl From<&str> for PersonRole {
    fn from(tag: &str) -> Self {
        PersonRole::from(tag.to_string())
    }
}

impl From<PersonRole> for String {
    fn from(role: PersonRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named actor: sender, recipient or replier.
///
/// Equality covers all fields; the portal's "Hidden" recipient placeholder
/// is recognized by comparing against [`Person::hidden`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub id: Option<u64>,
    pub role: Option<PersonRole>,
}

impl Person {
    /// A person known only by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            role: None,
        }
    }

    /// The placeholder shown when the recipient list is hidden
    pub fn hidden() -> Self {
        Self::named("Hidden")
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================
// Messages
// ============================================

/// One entry of a pupil's message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    /// Base URL of the portal the message was listed on
    pub origin: String,
    pub pupil_id: PupilId,
    pub subject: String,
    /// Time of the latest activity (original message or newest reply)
    pub last_activity: Timestamp,
    pub folder: String,
    pub sender: Person,
    pub reply_count: u32,
    pub is_unread: bool,
}

/// A reply in the thread below a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub timestamp: Timestamp,
    pub sender: Person,
    pub body: String,
}

/// A message with everything its detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub summary: MessageSummary,
    pub sent: Timestamp,
    /// Empty when the portal hides the recipient list
    pub recipients: Vec<Person>,
    pub body: String,
    pub replies: Vec<ReplyMessage>,
}

impl Message {
    /// Complete a summary with the fields of its detail page.
    pub fn from_summary(
        summary: MessageSummary,
        sent: Timestamp,
        recipients: Vec<Person>,
        body: String,
        replies: Vec<ReplyMessage>,
    ) -> Self {
        Self {
            summary,
            sent,
            recipients,
            body,
            replies,
        }
    }

    pub fn id(&self) -> MessageId {
        self.summary.id
    }

    pub fn subject(&self) -> &str {
        &self.summary.subject
    }

    pub fn sender(&self) -> &Person {
        &self.summary.sender
    }
}

// ============================================
// Announcements
// ============================================

/// One entry of a pupil's announcement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementSummary {
    pub id: AnnouncementId,
    pub origin: String,
    pub pupil_id: PupilId,
    pub subject: String,
    /// Only known when the listing shows the item as a dated card
    pub timestamp: Option<Timestamp>,
    pub is_unread: bool,
}

/// An announcement with its detail page fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub summary: AnnouncementSummary,
    /// Publication time from the detail page; supersedes the summary's
    pub timestamp: Timestamp,
    pub sender: Person,
    pub body: String,
}

impl Announcement {
    /// Complete a summary with the fields of its detail page.
    ///
    /// The summary's optional timestamp is overwritten so both views agree.
    pub fn from_summary(
        mut summary: AnnouncementSummary,
        timestamp: Timestamp,
        sender: Person,
        body: String,
    ) -> Self {
        summary.timestamp = Some(timestamp);
        Self {
            summary,
            timestamp,
            sender,
            body,
        }
    }

    pub fn id(&self) -> AnnouncementId {
        self.summary.id
    }

    pub fn subject(&self) -> &str {
        &self.summary.subject
    }
}

// ============================================
// Front page
// ============================================

/// What the front page of a signed-in guardian tells us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontPage {
    /// Pupils in page order, one per id
    pub pupils: Vec<Pupil>,
    /// Unread message counts; pupils without a numeric badge are absent
    pub unread_counts: std::collections::BTreeMap<PupilId, u32>,
    /// Display name of the signed-in user
    pub own_name: String,
}

impl FrontPage {
    pub fn pupil(&self, id: &PupilId) -> Option<&Pupil> {
        self.pupils.iter().find(|pupil| &pupil.id == id)
    }
}
