//! Authenticated HTTP session with the portal
//!
//! [`PortalSession`] is the seam between navigation and extraction: the
//! [`Connection`](crate::Connection) only ever asks for pages by relative
//! URL, so tests can drive it with canned documents instead of a server.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::markup::selector;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Language id that switches the portal UI to English.
pub const ENGLISH_LANG_ID: u32 = 3;

/// Path that ends the server-side session.
pub const LOGOUT_PATH: &str = "/logout";

const LOGIN_PAGE: &str = "login page";
const USERNAME_FIELD: &str = "Login";
const PASSWORD_FIELD: &str = "Password";
/// Query key the portal redirects to when credentials are rejected.
const LOGIN_FAILED_KEY: &str = "loginfailed";

static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| selector(".login-form"));
static NAMED_INPUTS: LazyLock<Selector> = LazyLock::new(|| selector("input[name]"));

/// Page access for one signed-in user of one portal.
///
/// Requests are issued one at a time through `&mut self`; relative URLs
/// start with `/` and are resolved against [`origin`](Self::origin).
#[async_trait]
pub trait PortalSession: Send {
    /// Base URL this session is bound to, without a trailing slash
    fn origin(&self) -> &str;

    /// GET a page and return its body.
    async fn fetch(&mut self, relative_url: &str) -> Result<String>;

    /// GET a JSON document, sending the given extra headers.
    async fn fetch_json(
        &mut self,
        relative_url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value>;

    /// POST a form and return the response body.
    async fn post(&mut self, relative_url: &str, form: &[(String, String)]) -> Result<String>;
}

/// [`PortalSession`] over HTTP with a cookie jar.
pub struct HttpSession {
    client: reqwest::Client,
    origin: String,
}

impl HttpSession {
    /// Create an unauthenticated session for `base_url`.
    pub fn new(base_url: &str, config: &HttpConfig) -> Result<Self> {
        let origin = base_url.trim_end_matches('/').to_string();
        Url::parse(&origin)
            .map_err(|e| Error::Config(format!("invalid portal URL {:?}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, origin })
    }

    /// Sign in and return the authenticated session.
    ///
    /// The login page is requested in English, its form is submitted with
    /// every pre-filled field kept, and the landing URL decides the outcome:
    /// a `loginfailed` query means bad credentials, any other query an
    /// unexpected page.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
        config: &HttpConfig,
    ) -> Result<Self> {
        let mut session = Self::new(base_url, config)?;

        let login_url = session.url(&format!("/?langid={}", ENGLISH_LANG_ID))?;
        let response = session.send(session.client.get(login_url)).await?;
        let page_url = response.url().clone();
        let page = response.text().await?;

        let form = LoginForm::parse(&page)?;
        let action = page_url
            .join(&form.action)
            .map_err(|e| Error::structure(LOGIN_PAGE, format!("invalid form action: {}", e)))?;
        let fields = form.with_credentials(username, password);

        tracing::debug!(action = %action, fields = fields.len(), "Submitting login form");
        let response = session
            .send(session.client.post(action).form(&fields))
            .await?;
        check_landing_url(response.url())?;

        tracing::info!(origin = %session.origin, "Logged in");
        Ok(session)
    }

    fn url(&self, relative_url: &str) -> Result<Url> {
        let full = format!("{}{}", self.origin, relative_url);
        Url::parse(&full).map_err(|e| Error::Transport(format!("invalid URL {:?}: {}", full, e)))
    }

    /// Send a request, treating any non-2xx status as a transport error.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{} returned {}",
                response.url(),
                status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PortalSession for HttpSession {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn fetch(&mut self, relative_url: &str) -> Result<String> {
        let url = self.url(relative_url)?;
        tracing::debug!(url = %url, "GET");
        let response = self.send(self.client.get(url)).await?;
        Ok(response.text().await?)
    }

    async fn fetch_json(
        &mut self,
        relative_url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let url = self.url(relative_url)?;
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Transport(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Transport(format!("invalid header value {:?}: {}", value, e)))?;
            header_map.insert(name, value);
        }

        tracing::debug!(url = %url, "GET (JSON)");
        let response = self.send(self.client.get(url).headers(header_map)).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post(&mut self, relative_url: &str, form: &[(String, String)]) -> Result<String> {
        let url = self.url(relative_url)?;
        tracing::debug!(url = %url, "POST");
        let response = self.send(self.client.post(url).form(form)).await?;
        Ok(response.text().await?)
    }
}

/// The login form as served: its target and pre-filled fields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginForm {
    action: String,
    fields: Vec<(String, String)>,
}

impl LoginForm {
    fn parse(page: &str) -> Result<Self> {
        let document = Html::parse_document(page);
        let form = document
            .select(&LOGIN_FORM)
            .next()
            .ok_or_else(|| Error::structure(LOGIN_PAGE, "cannot find login form"))?;

        let fields = form
            .select(&NAMED_INPUTS)
            .filter_map(|input| {
                let input = input.value();
                let name = input.attr("name")?;
                Some((
                    name.to_string(),
                    input.attr("value").unwrap_or_default().to_string(),
                ))
            })
            .collect();

        Ok(Self {
            action: form.value().attr("action").unwrap_or_default().to_string(),
            fields,
        })
    }

    /// Form fields with the credentials filled in (added when missing).
    fn with_credentials(self, username: &str, password: &str) -> Vec<(String, String)> {
        let mut fields = self.fields;
        for (name, value) in [(USERNAME_FIELD, username), (PASSWORD_FIELD, password)] {
            match fields.iter_mut().find(|(field, _)| field == name) {
                Some(field) => field.1 = value.to_string(),
                None => fields.push((name.to_string(), value.to_string())),
            }
        }
        fields
    }
}

/// Decide the login outcome from where the form submission landed.
fn check_landing_url(url: &Url) -> Result<()> {
    let Some(query) = url.query().filter(|q| !q.is_empty()) else {
        return Ok(());
    };
    if url.query_pairs().any(|(key, _)| key == LOGIN_FAILED_KEY) {
        return Err(Error::Authentication("invalid username or password".to_string()));
    }
    Err(Error::Authentication(format!(
        "unexpected landing page after login (query {:?})",
        query
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE_HTML: &str = r#"<html><body>
        <form class="login-form" action="/login" method="post">
          <input type="text" name="Login">
          <input type="password" name="Password">
          <input type="hidden" name="SESSIONID" value="abc123">
          <input type="submit" value="Log in">
        </form></body></html>"#;

    #[test]
    fn test_parse_login_form() {
        let form = LoginForm::parse(LOGIN_PAGE_HTML).unwrap();
        assert_eq!(form.action, "/login");
        assert_eq!(
            form.fields,
            vec![
                ("Login".to_string(), String::new()),
                ("Password".to_string(), String::new()),
                ("SESSIONID".to_string(), "abc123".to_string()),
            ]
        );
    }

    #[test]
    fn test_credentials_fill_existing_fields() {
        let fields = LoginForm::parse(LOGIN_PAGE_HTML)
            .unwrap()
            .with_credentials("guardian", "secret");
        assert_eq!(fields.len(), 3);
        assert!(fields.contains(&("Login".to_string(), "guardian".to_string())));
        assert!(fields.contains(&("Password".to_string(), "secret".to_string())));
        assert!(fields.contains(&("SESSIONID".to_string(), "abc123".to_string())));
    }

    #[test]
    fn test_credentials_added_when_form_lacks_them() {
        let form = LoginForm {
            action: String::new(),
            fields: vec![],
        };
        assert_eq!(form.with_credentials("u", "p").len(), 2);
    }

    #[test]
    fn test_missing_login_form() {
        let err = LoginForm::parse("<html><body>Maintenance</body></html>").unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
    }

    #[test]
    fn test_landing_url_outcomes() {
        let ok = Url::parse("https://school.example.com/").unwrap();
        assert!(check_landing_url(&ok).is_ok());

        let failed = Url::parse("https://school.example.com/?loginfailed").unwrap();
        let err = check_landing_url(&failed).unwrap_err();
        assert!(err.to_string().contains("invalid username or password"));

        let odd = Url::parse("https://school.example.com/?checkcookie").unwrap();
        let err = check_landing_url(&odd).unwrap_err();
        assert!(err.to_string().contains("unexpected"));
    }

    #[test]
    fn test_new_session_normalizes_origin() {
        let session =
            HttpSession::new("https://school.example.com/", &HttpConfig::default()).unwrap();
        assert_eq!(session.origin(), "https://school.example.com");
        assert_eq!(
            session.url("/!0111/news").unwrap().as_str(),
            "https://school.example.com/!0111/news"
        );
    }

    #[test]
    fn test_new_session_rejects_bad_url() {
        assert!(matches!(
            HttpSession::new("school", &HttpConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
