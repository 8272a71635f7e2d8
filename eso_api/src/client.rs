//! HTTP client for the ESO self-service portal (`mano.eso.lt`).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, REFERER};
use url::Url;

use crate::{
    dataset::extract_datasets,
    form::{self, ConsumptionForm, FormFields, SelectOption},
    query::ReportQuery,
    types::RawDataset,
    user_agent::get_user_agent,
    Error,
};

const LOGIN_PATH: &str = "/user/login";
const CONSUMPTION_PATH: &str = "/consumption";
const REPORT_PATH: &str = "/consumption?ajax_form=1";

/// Request timeout for every portal call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated portal session: the cookie jar filled by the login flow.
///
/// Cloning is cheap and shares the jar. Cookie values are never printed.
#[derive(Clone)]
pub struct Session {
    jar: Arc<Jar>,
    origin: Url,
}

impl Session {
    /// An empty session scoped to `origin`.
    pub fn new(origin: Url) -> Self {
        Self {
            jar: Arc::new(Jar::default()),
            origin,
        }
    }

    /// Adds a raw `Set-Cookie` style string to the jar.
    pub fn add_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.origin);
    }

    /// True when the jar holds no cookie for the portal origin.
    pub fn is_empty(&self) -> bool {
        self.jar.cookies(&self.origin).is_none()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("origin", &self.origin.as_str())
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// HTTP client for the ESO portal.
///
/// Every flow builds a fresh `reqwest::Client` with a randomized desktop
/// user agent and the session's cookie jar, so cookies set by one response
/// are sent with the next request of the same session.
pub struct Client {
    /// Base URL of the portal. Defaults to `https://mano.eso.lt`.
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client pointing at the production portal.
    pub fn new() -> Self {
        Self {
            base_url: "https://mano.eso.lt".to_string(),
        }
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(format!("{}{}", &self.base_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::Url(e)
        })
    }

    fn http(&self, session: &Session) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .cookie_provider(session.jar.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(client)
    }

    /// Logs in with the given credentials and returns the session cookies.
    ///
    /// The login page is fetched first so its hidden Drupal fields can be
    /// echoed back. A non-success status on the submission is reported as
    /// [`Error::Auth`]; no session is returned in that case.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, Error> {
        let login_url = self.url(LOGIN_PATH)?;
        let session = Session::new(self.url("/")?);
        let http = self.http(&session)?;

        let page = http.get(login_url.clone()).send().await?;
        let html = read_body(page).await?;
        let mut fields = form::login_fields(&html)?;
        fields.insert("name", username);
        fields.insert("pass", password);
        fields.insert("login_type", "1");

        let resp = http
            .post(login_url.clone())
            .header(REFERER, login_url.as_str())
            .header(CONNECTION, "keep-alive")
            .header("x-requested-with", "XMLHttpRequest")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(fields.to_urlencoded())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::error!("Login rejected with status {}", status);
            return Err(Error::Auth {
                status: status.as_u16(),
            });
        }
        if session.is_empty() {
            tracing::warn!("Login accepted but the portal set no session cookie");
        } else {
            tracing::debug!("Login successful");
        }
        Ok(session)
    }

    fn data_request(
        &self,
        http: &reqwest::Client,
        method: reqwest::Method,
        url: Url,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let referer = self.url(LOGIN_PATH)?;
        Ok(http
            .request(method, url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header("lang", "en")
            .header("sec-ch-ua-platform", "macOS")
            .header("sec-fetch-site", "same-origin")
            .header("sec-fetch-mode", "cors")
            .header("sec-fetch-dest", "empty")
            .header(REFERER, referer.as_str())
            .header(ACCEPT_LANGUAGE, "en-US;q=0.9,en;q=0.8")
            .header(CONNECTION, "keep-alive")
            .header("x-requested-with", "XMLHttpRequest"))
    }

    /// Fetches the raw consumption history page.
    pub async fn consumption_page(&self, session: &Session) -> Result<String, Error> {
        let http = self.http(session)?;
        let resp = self
            .data_request(&http, reqwest::Method::GET, self.url(CONSUMPTION_PATH)?)?
            .send()
            .await?;
        read_body(resp).await
    }

    /// Loads the consumption form, resolving `display_name` to its option
    /// value and collecting the form defaults for resubmission.
    pub async fn consumption_form(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<ConsumptionForm, Error> {
        let html = self.consumption_page(session).await?;
        let form = form::parse_consumption_form(&html, display_name)?;
        tracing::debug!(
            selector = %form.selector,
            fields = form.fields.len(),
            "Consumption form loaded"
        );
        Ok(form)
    }

    /// Lists the meters/objects selectable in the consumption form.
    pub async fn list_objects(&self, session: &Session) -> Result<Vec<SelectOption>, Error> {
        let html = self.consumption_page(session).await?;
        form::list_options(&html)
    }

    /// Submits the report request and returns the labeled datasets.
    pub async fn fetch_dataset(
        &self,
        session: &Session,
        query: &ReportQuery,
        base_fields: &FormFields,
    ) -> Result<Vec<RawDataset>, Error> {
        let http = self.http(session)?;
        let resp = self
            .data_request(&http, reqwest::Method::POST, self.url(REPORT_PATH)?)?
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(query.to_form_body(base_fields))
            .send()
            .await?;
        let body = read_body(resp).await?;

        let datasets = extract_datasets(&body).map_err(|e| {
            if matches!(e, Error::DatasetMissing) {
                tracing::error!("Unable to find consumption data in report response");
            }
            e
        })?;
        tracing::debug!(
            "Report fetched with {} datasets: {}",
            datasets.len(),
            truncate_body(&body, 1000)
        );
        Ok(datasets)
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let snippet = truncate_body(&body, 2000);
        tracing::error!("Request failed with status {}: {}", status, snippet);
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            body: snippet,
        });
    }
    Ok(body)
}

fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...[truncated]", &body[..idx]),
        None => body.to_string(),
    }
}
