//! Navigation over a signed-in portal session
//!
//! A [`Connection`] owns its session and knows which pages hold what: it
//! fetches a page, hands it to the configured [`PortalExtractor`] and
//! returns domain types. Summaries remember the origin they were listed
//! on, and detail fetches refuse summaries from any other portal before
//! touching the network.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{extractor_for, ExtractContext, PortalExtractor};
use crate::session::{HttpSession, PortalSession, LOGOUT_PATH};
use crate::types::{
    Announcement, AnnouncementSummary, FrontPage, Message, MessageSummary, Pupil, PupilId,
};
use chrono_tz::Tz;
use scraper::Html;
use std::collections::BTreeMap;

/// Headers that make the portal answer the message list with JSON.
const JSON_LIST_HEADERS: &[(&str, &str)] = &[("X-Requested-With", "XMLHttpRequest")];

/// Unread messages of one pupil, fully fetched.
#[derive(Debug, Clone)]
pub struct PupilMessages {
    pub pupil: Pupil,
    pub messages: Vec<Message>,
}

/// A signed-in portal session plus what its front page said.
pub struct Connection<S: PortalSession> {
    session: S,
    extractor: Box<dyn PortalExtractor>,
    zone: Tz,
    front_page: FrontPage,
}

impl Connection<HttpSession> {
    /// Log in over HTTP using the portal settings in `config`.
    ///
    /// `url` and `username` override the configured values.
    pub async fn login(
        config: &Config,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        config.validate()?;
        let session = HttpSession::login(url, username, password, &config.http).await?;
        Self::open(
            session,
            extractor_for(config.portal.variant),
            config.portal.zone()?,
        )
        .await
    }
}

impl<S: PortalSession> Connection<S> {
    /// Read the front page of an authenticated session.
    pub async fn open(mut session: S, extractor: Box<dyn PortalExtractor>, zone: Tz) -> Result<Self> {
        let page = session.fetch("/").await?;
        let front_page = extractor.extract_front_page(&Html::parse_document(&page))?;

        tracing::info!(
            origin = session.origin(),
            variant = %extractor.variant(),
            pupils = front_page.pupils.len(),
            "Opened connection"
        );

        Ok(Self {
            session,
            extractor,
            zone,
            front_page,
        })
    }

    /// Base URL of the underlying session.
    pub fn origin(&self) -> &str {
        self.session.origin()
    }

    pub fn pupils(&self) -> impl Iterator<Item = &Pupil> {
        self.front_page.pupils.iter()
    }

    pub fn pupil(&self, id: &PupilId) -> Option<&Pupil> {
        self.front_page.pupil(id)
    }

    /// Unread message counts from the front page badges.
    pub fn unread_counts(&self) -> &BTreeMap<PupilId, u32> {
        &self.front_page.unread_counts
    }

    /// Display name of the signed-in user.
    pub fn own_name(&self) -> &str {
        &self.front_page.own_name
    }

    /// Message summaries of a pupil, as listed by the portal.
    pub async fn fetch_message_list(&mut self, pupil_id: &PupilId) -> Result<Vec<MessageSummary>> {
        let url = format!("/!{}/messages/list", pupil_id);
        let payload = self.session.fetch_json(&url, JSON_LIST_HEADERS).await?;

        let summaries = self
            .extractor
            .extract_message_list(&payload, &self.context(pupil_id))?;
        tracing::debug!(pupil = %pupil_id, count = summaries.len(), "Fetched message list");
        Ok(summaries)
    }

    /// Complete a message summary from its detail page.
    pub async fn fetch_message(&mut self, summary: MessageSummary) -> Result<Message> {
        self.check_origin(&summary.origin)?;

        let url = format!("/!{}/messages/{}?recipients", summary.pupil_id, summary.id);
        let page = self.session.fetch(&url).await?;

        let pupil_id = summary.pupil_id.clone();
        self.extractor.extract_message_detail(
            &Html::parse_document(&page),
            summary,
            &self.context(&pupil_id),
        )
    }

    /// Announcement summaries of a pupil, sorted by id.
    pub async fn fetch_announcement_list(
        &mut self,
        pupil_id: &PupilId,
    ) -> Result<Vec<AnnouncementSummary>> {
        let url = format!("/!{}/news", pupil_id);
        let page = self.session.fetch(&url).await?;

        self.extractor
            .extract_announcement_list(&Html::parse_document(&page), &self.context(pupil_id))
    }

    /// Complete an announcement summary from its detail page.
    pub async fn fetch_announcement(&mut self, summary: AnnouncementSummary) -> Result<Announcement> {
        self.check_origin(&summary.origin)?;

        let url = format!("/!{}/news/{}", summary.pupil_id, summary.id);
        let page = self.session.fetch(&url).await?;

        let pupil_id = summary.pupil_id.clone();
        self.extractor.extract_announcement_detail(
            &Html::parse_document(&page),
            summary,
            &self.context(&pupil_id),
        )
    }

    /// Every unread message of every pupil with an unread badge.
    ///
    /// Stops at the first failure; nothing fetched before it is returned.
    pub async fn new_messages(&mut self) -> Result<Vec<PupilMessages>> {
        if let Some(unknown) = self
            .front_page
            .unread_counts
            .keys()
            .find(|id| self.front_page.pupil(id).is_none())
        {
            return Err(Error::structure(
                "front page",
                format!("unread count for unknown pupil {}", unknown),
            ));
        }

        let pupils: Vec<Pupil> = self
            .pupils()
            .filter(|pupil| self.front_page.unread_counts.contains_key(&pupil.id))
            .cloned()
            .collect();
        let mut result = Vec::with_capacity(pupils.len());

        for pupil in pupils {
            let mut messages = Vec::new();
            for summary in self.fetch_message_list(&pupil.id).await? {
                if summary.is_unread {
                    messages.push(self.fetch_message(summary).await?);
                }
            }
            tracing::info!(pupil = %pupil.id, unread = messages.len(), "Fetched new messages");
            result.push(PupilMessages { pupil, messages });
        }
        Ok(result)
    }

    /// Log out, ending the session.
    pub async fn close(mut self) -> Result<()> {
        self.session.post(LOGOUT_PATH, &[]).await?;
        tracing::info!(origin = self.session.origin(), "Logged out");
        Ok(())
    }

    fn context<'a>(&'a self, pupil_id: &'a PupilId) -> ExtractContext<'a> {
        ExtractContext {
            origin: self.session.origin(),
            pupil_id,
            own_name: &self.front_page.own_name,
            zone: self.zone,
        }
    }

    fn check_origin(&self, found: &str) -> Result<()> {
        if found != self.session.origin() {
            return Err(Error::OriginMismatch {
                expected: self.session.origin().to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }
}
