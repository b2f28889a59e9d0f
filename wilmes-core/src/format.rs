//! Plain-text rendering of messages and announcements
//!
//! Listings use one line per item; full items render as a mail-like header
//! block followed by the wrapped body.

use crate::types::{
    Announcement, AnnouncementSummary, Message, MessageSummary, ReplyMessage, Timestamp,
};
use std::fmt;

/// Column width used when none is given.
pub const DEFAULT_WIDTH: usize = 70;

const LISTING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

fn unread_marker(is_unread: bool) -> &'static str {
    if is_unread {
        "* "
    } else {
        "  "
    }
}

/// `2021-03-05 12:34 Jane Doe                                 * Trip`
impl fmt::Display for MessageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:40} {}{}",
            self.last_activity.format(LISTING_TIME_FORMAT),
            self.sender.name,
            unread_marker(self.is_unread),
            self.subject
        )
    }
}

/// Like a message line, without a sender column; undated items leave the
/// date blank.
impl fmt::Display for AnnouncementSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .timestamp
            .map(|ts| ts.format(LISTING_TIME_FORMAT).to_string())
            .unwrap_or_default();
        write!(
            f,
            "{:16} {}{}",
            date,
            unread_marker(self.is_unread),
            self.subject
        )
    }
}

/// Wrap each line of `body` to `width` columns, separating source lines
/// with a blank line. No-break spaces become plain spaces.
pub fn wrap_body(body: &str, width: usize) -> String {
    body.lines()
        .map(|line| {
            let line = line.replace('\u{a0}', " ");
            textwrap::wrap(line.trim_end(), width).join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render(
    subject: Option<&str>,
    timestamp: &Timestamp,
    sender: &str,
    body: &str,
    width: usize,
) -> String {
    let mut out = String::new();
    if let Some(subject) = subject {
        out.push_str(&format!("Subject: {}\n", subject));
    }
    out.push_str(&format!("Date: {}\n", timestamp.format(HEADER_TIME_FORMAT)));
    out.push_str(&format!("From: {}\n", sender));
    out.push('\n');
    out.push_str(&wrap_body(body, width));
    out
}

impl ReplyMessage {
    /// Header block and wrapped body.
    pub fn to_text(&self, width: usize) -> String {
        render(None, &self.timestamp, &self.sender.name, &self.body, width)
    }
}

impl Message {
    /// Header block, wrapped body, then every reply in thread order.
    pub fn to_text(&self, width: usize) -> String {
        let mut out = render(
            Some(self.subject()),
            &self.sent,
            &self.sender().name,
            &self.body,
            width,
        );
        for reply in &self.replies {
            out.push_str("\n\n");
            out.push_str(&"-".repeat(width.min(DEFAULT_WIDTH)));
            out.push('\n');
            out.push_str(&reply.to_text(width));
        }
        out
    }
}

impl Announcement {
    /// Header block and wrapped body.
    pub fn to_text(&self, width: usize) -> String {
        render(
            Some(self.subject()),
            &self.timestamp,
            &self.sender.name,
            &self.body,
            width,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnouncementId, MessageId, Person, PupilId};
    use chrono::{FixedOffset, TimeZone};

    fn ts(h: u32, m: u32) -> Timestamp {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2021, 3, 5, h, m, 0)
            .unwrap()
    }

    fn summary(is_unread: bool) -> MessageSummary {
        MessageSummary {
            id: MessageId(1),
            origin: "https://school.example.com".to_string(),
            pupil_id: PupilId::from("0111"),
            subject: "Trip".to_string(),
            last_activity: ts(12, 34),
            folder: "Inbox".to_string(),
            sender: Person::named("Jane Doe"),
            reply_count: 0,
            is_unread,
        }
    }

    #[test]
    fn test_summary_line() {
        let line = summary(true).to_string();
        assert_eq!(line, format!("2021-03-05 12:34 {:40} * Trip", "Jane Doe"));
        assert!(summary(false).to_string().ends_with("   Trip"));
    }

    #[test]
    fn test_announcement_line_without_date() {
        let item = AnnouncementSummary {
            id: AnnouncementId(3),
            origin: String::new(),
            pupil_id: PupilId::from("0111"),
            subject: "Menu".to_string(),
            timestamp: None,
            is_unread: true,
        };
        assert_eq!(item.to_string(), format!("{:16} * Menu", ""));
    }

    #[test]
    fn test_wrap_body() {
        let body = "short line\nthe quick brown fox jumps over the lazy dog\u{a0}again";
        assert_eq!(
            wrap_body(body, 20),
            "short line\n\nthe quick brown fox\njumps over the lazy\ndog again"
        );
    }

    #[test]
    fn test_message_text_with_reply() {
        let reply = ReplyMessage {
            timestamp: ts(13, 0),
            sender: Person::named("Parent Person"),
            body: "Thanks".to_string(),
        };
        let message = Message::from_summary(
            summary(true),
            ts(12, 34),
            vec![],
            "Hello".to_string(),
            vec![reply],
        );
        let text = message.to_text(DEFAULT_WIDTH);
        assert!(text.starts_with(
            "Subject: Trip\nDate: 2021-03-05 12:34:00+02:00\nFrom: Jane Doe\n\nHello\n\n"
        ));
        assert!(text.ends_with("Date: 2021-03-05 13:00:00+02:00\nFrom: Parent Person\n\nThanks"));
    }
}
