//! A minimal navigating client.
//!
//! [`Browser`] keeps a page history over any [`Delegate`] and sends
//! `Referer: <current page>` on every navigation after the first. Stacked
//! on a [`CachedAgent`](crate::CachedAgent), this means a URL fetched
//! directly and the same URL reached by following a link are cached as
//! two separate entries.

mod links;
mod url;

use ::url::Url;
use reqwest::Method;
use replay_core::Error;

use crate::delegate::{Delegate, RequestOptions};
use crate::http::{Request, Response};

pub use self::links::{Link, harvest_links};
pub use self::url::{UrlError, resolve};

/// One entry of the navigation history.
#[derive(Debug)]
pub struct Page {
    /// The request exactly as sent, including any injected headers.
    pub request: Request,
    /// The materialized response.
    pub response: Response,
}

impl Page {
    /// Address of the page: the final response URL when known, else the
    /// request URL.
    pub fn url(&self) -> Url {
        self.response
            .url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| self.request.url.clone())
    }

    pub fn is_html(&self) -> bool {
        self.response
            .content_type()
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("html"))
    }

    /// Links on this page; empty for non-HTML responses.
    pub fn links(&self) -> Vec<Link> {
        if !self.is_html() {
            return Vec::new();
        }
        match self.response.text() {
            Ok(html) => harvest_links(&html, &self.url()),
            Err(_) => Vec::new(),
        }
    }
}

/// History-keeping navigation over a delegate.
pub struct Browser<D> {
    delegate: D,
    history: Vec<Page>,
    headers: Vec<(String, String)>,
    options: RequestOptions,
}

impl<D: Delegate> Browser<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate, history: Vec::new(), headers: Vec::new(), options: RequestOptions::default() }
    }

    /// Send `name: value` on every navigation, before `Referer`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Open `url`, resolved against the current page when relative.
    pub async fn get(&mut self, url: &str) -> Result<&Page, Error> {
        let base = self.page().map(Page::url);
        let target = resolve(base.as_ref(), url)?;
        self.navigate(target).await
    }

    /// Follow the first link on the current page whose text equals `text`.
    pub async fn follow_link(&mut self, text: &str) -> Result<&Page, Error> {
        let link = self
            .links()
            .into_iter()
            .find(|link| link.text == text)
            .ok_or_else(|| Error::Navigation(format!("no link with text {text:?}")))?;
        let target = resolve(None, &link.href)?;
        self.navigate(target).await
    }

    /// Follow the `n`th link (zero-based) on the current page.
    pub async fn follow_link_n(&mut self, n: usize) -> Result<&Page, Error> {
        let link = self
            .links()
            .into_iter()
            .nth(n)
            .ok_or_else(|| Error::Navigation(format!("page has no link #{n}")))?;
        let target = resolve(None, &link.href)?;
        self.navigate(target).await
    }

    /// Return to the previous page without a request.
    pub fn back(&mut self) -> Result<&Page, Error> {
        if self.history.len() < 2 {
            return Err(Error::Navigation("no previous page".into()));
        }
        self.history.pop();
        Ok(&self.history[self.history.len() - 1])
    }

    /// Send the current page's request again and replace the page.
    pub async fn reload(&mut self) -> Result<&Page, Error> {
        let Some(current) = self.history.last() else {
            return Err(Error::Navigation("nothing to reload".into()));
        };
        let request = current.request.clone();
        let response = self.load(&request).await?;

        let index = self.history.len() - 1;
        self.history[index] = Page { request, response };
        Ok(&self.history[index])
    }

    pub fn page(&self) -> Option<&Page> {
        self.history.last()
    }

    /// Every visited page, oldest first.
    pub fn history(&self) -> &[Page] {
        &self.history
    }

    /// Links on the current page.
    pub fn links(&self) -> Vec<Link> {
        self.page().map(Page::links).unwrap_or_default()
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_inner(self) -> D {
        self.delegate
    }

    async fn navigate(&mut self, target: Url) -> Result<&Page, Error> {
        let mut request = Request::new(Method::GET, target);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(current) = self.page() {
            request = request.header("Referer", current.url().as_str());
        }

        let response = self.load(&request).await?;
        self.history.push(Page { request, response });
        Ok(&self.history[self.history.len() - 1])
    }

    async fn load(&mut self, request: &Request) -> Result<Response, Error> {
        let mut response = self.delegate.perform_request(request, &self.options).await?;
        response.materialize().await?;

        tracing::debug!(
            url = %request.url,
            status = response.status,
            replayed = response.is_replayed(),
            depth = self.history.len(),
            "navigated"
        );
        Ok(response)
    }
}
