//! Page extraction
//!
//! Every page kind the portal serves has one extraction routine that turns
//! the fetched document into domain types:
//!
//! | Page | Module | Produces |
//! |------|--------|----------|
//! | Front page | [`front_page`] | [`FrontPage`] |
//! | Message list (JSON) | [`messages`] | [`MessageSummary`] list |
//! | Message detail | [`messages`] | [`Message`] |
//! | Announcement list | [`announcements`] | [`AnnouncementSummary`] list |
//! | Announcement detail | [`announcements`] | [`Announcement`] |
//!
//! ## Design Principles
//!
//! 1. **Fail fast**: a required element that is missing is an
//!    [`Error::Structure`](crate::Error::Structure), never a default
//! 2. **Named patterns**: every regex lives behind a function with an
//!    example input, so markup drift shows up as a focused test failure
//! 3. **Variants, not copies**: markup that differs between portal versions
//!    is a [`PortalExtractor`] method the version's implementation overrides

pub mod announcements;
pub mod front_page;
pub mod messages;
mod variants;

pub use variants::{extractor_for, ClassicPortal, CurrentPortal};

use crate::error::Result;
use crate::types::{
    Announcement, AnnouncementSummary, FrontPage, Message, MessageSummary, PupilId,
};
use chrono_tz::Tz;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::LazyLock;

/// Portal software generations with distinct markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupVariant {
    /// Current portal release
    #[default]
    Current,
    /// Older release whose reply headers keep the sender's role in
    /// parentheses right after the name
    Classic,
}

impl MarkupVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkupVariant::Current => "current",
            MarkupVariant::Classic => "classic",
        }
    }
}

impl std::fmt::Display for MarkupVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MarkupVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "current" => Ok(MarkupVariant::Current),
            "classic" => Ok(MarkupVariant::Classic),
            _ => Err(format!("unknown markup variant: {}", s)),
        }
    }
}

/// Who and where an extraction runs for.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// Base URL of the session; copied into every summary
    pub origin: &'a str,
    pub pupil_id: &'a PupilId,
    /// Display name of the signed-in user, substituted for "You"
    pub own_name: &'a str,
    /// Zone for timestamps printed without an offset
    pub zone: Tz,
}

// ============================================
// Reply headers
// ============================================

/// Sender and date text of a reply header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeader {
    pub from: String,
    pub date: String,
}

/// Any sender text, including several parentheticals.
static FREE_FORM_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<from>.*) replied [^0-9]*(?P<date>[0-9][0-9.:/ ]+)$")
        .expect("invalid regex: free-form reply header")
});

/// A name optionally followed by exactly one parenthetical.
static PARENTHESIZED_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<from>[^()]+(?:\([^()]*\))?) replied [^0-9]*(?P<date>[0-9][0-9.:/ ]+)$")
        .expect("invalid regex: parenthesized reply header")
});

/// How a portal version phrases the header above each reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyHeaderStyle {
    /// `Jane Doe (Math) (Grade 9) replied on 5.3.2021 12:34`
    FreeForm,
    /// `Jane Doe (Teacher) replied 5.3.2021 12:34`; anything after a
    /// second parenthetical does not match
    Parenthesized,
}

impl ReplyHeaderStyle {
    /// Split a header into sender text and date text.
    ///
    /// Whitespace (including no-break spaces) is collapsed first, so
    /// `"You\u{a0} replied  5.3.2021 12:34"` gives `from = "You"`,
    /// `date = "5.3.2021 12:34"`.
    pub fn parse(&self, header: &str) -> Option<ReplyHeader> {
        let collapsed = header.split_whitespace().collect::<Vec<_>>().join(" ");
        let pattern = match self {
            ReplyHeaderStyle::FreeForm => &FREE_FORM_REPLY,
            ReplyHeaderStyle::Parenthesized => &PARENTHESIZED_REPLY,
        };
        let caps = pattern.captures(&collapsed)?;
        Some(ReplyHeader {
            from: caps["from"].trim().to_string(),
            date: caps["date"].trim().to_string(),
        })
    }
}

// ============================================
// Extractor trait
// ============================================

/// Extraction routines for one portal version.
///
/// The provided methods implement the markup of the current portal;
/// implementations override what their version renders differently.
pub trait PortalExtractor: Send + Sync {
    /// Which markup generation this extractor reads
    fn variant(&self) -> MarkupVariant;

    /// Shape of reply headers on message detail pages
    fn reply_header_style(&self) -> ReplyHeaderStyle;

    /// Roster, unread counts and own name from the front page.
    fn extract_front_page(&self, document: &Html) -> Result<FrontPage> {
        front_page::extract(document)
    }

    /// Summaries from the JSON message list.
    fn extract_message_list(
        &self,
        payload: &serde_json::Value,
        ctx: &ExtractContext<'_>,
    ) -> Result<Vec<MessageSummary>> {
        messages::extract_list(payload, ctx)
    }

    /// Complete a summary from its detail page.
    fn extract_message_detail(
        &self,
        document: &Html,
        summary: MessageSummary,
        ctx: &ExtractContext<'_>,
    ) -> Result<Message> {
        messages::extract_detail(document, summary, ctx, self.reply_header_style())
    }

    /// Summaries from the announcement listing page.
    fn extract_announcement_list(
        &self,
        document: &Html,
        ctx: &ExtractContext<'_>,
    ) -> Result<Vec<AnnouncementSummary>> {
        announcements::extract_list(document, ctx)
    }

    /// Complete a summary from its detail page.
    fn extract_announcement_detail(
        &self,
        document: &Html,
        summary: AnnouncementSummary,
        ctx: &ExtractContext<'_>,
    ) -> Result<Announcement> {
        announcements::extract_detail(document, summary, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_form_reply_header() {
        let header = ReplyHeaderStyle::FreeForm
            .parse("Jane Doe (Math) (Grade 9) replied on 5.3.2021 12:34")
            .unwrap();
        assert_eq!(header.from, "Jane Doe (Math) (Grade 9)");
        assert_eq!(header.date, "5.3.2021 12:34");
    }

    #[test]
    fn test_parenthesized_reply_header() {
        let header = ReplyHeaderStyle::Parenthesized
            .parse("Jane Doe (Teacher) replied 5.3.2021 12:34")
            .unwrap();
        assert_eq!(header.from, "Jane Doe (Teacher)");
        assert_eq!(header.date, "5.3.2021 12:34");

        assert!(ReplyHeaderStyle::Parenthesized
            .parse("Jane Doe (Math) (Grade 9) replied 5.3.2021 12:34")
            .is_none());
    }

    #[test]
    fn test_reply_header_with_no_break_space() {
        for style in [ReplyHeaderStyle::FreeForm, ReplyHeaderStyle::Parenthesized] {
            let header = style.parse("\n  You\u{a0} replied  5.3.2021 12:34\n").unwrap();
            assert_eq!(header.from, "You");
            assert_eq!(header.date, "5.3.2021 12:34");
        }
    }

    #[test]
    fn test_reply_header_with_relative_day_keeps_clock_time() {
        let header = ReplyHeaderStyle::FreeForm
            .parse("Jane Doe replied today at 10:15")
            .unwrap();
        assert_eq!(header.from, "Jane Doe");
        assert_eq!(header.date, "10:15");
    }

    #[test]
    fn test_reply_header_without_date() {
        assert!(ReplyHeaderStyle::FreeForm.parse("Jane replied").is_none());
        assert!(ReplyHeaderStyle::FreeForm.parse("Something else").is_none());
    }

    #[test]
    fn test_markup_variant_from_str() {
        assert_eq!("classic".parse::<MarkupVariant>(), Ok(MarkupVariant::Classic));
        assert!("modern".parse::<MarkupVariant>().is_err());
        assert_eq!(MarkupVariant::default(), MarkupVariant::Current);
    }
}
