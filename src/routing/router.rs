//! Router state machine.
//!
//! # Responsibilities
//! - Turn a URL into a rendered page, a redirect, a passthrough frame or a
//!   hard navigation
//! - Keep history and the loading overlay in step with each route
//! - Dispatch link clicks, pop-state and cross-frame messages
//!
//! # Design Decisions
//! - 301/302 chains are a bounded loop, not recursion
//! - Every public entry point reports failures through `on_error` and returns
//!   them; nothing panics
//! - No `RefCell` borrow is held across an `.await`
//!
//! ```text
//! Idle → LoadingRedirects ─┬→ Redirecting ──────────────→ (loop)
//!                          ├→ PassthroughHandshake → PassthroughEmbed
//!                          └→ Fetching ─┬→ Rendering
//!                                       ├→ NotFound
//!                                       └→ HardNavigate
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use url::Url;

use crate::bridge::{BridgeMessage, ProxyHandshake};
use crate::config::ClientConfig;
use crate::content::types::STANDALONE_TEMPLATE;
use crate::content::{ContentFetcher, ContentLoader, PageData};
use crate::dom::{Document, NodeId, SelectorList};
use crate::error::CmsError;
use crate::host::{query, Host};
use crate::observability::metrics;
use crate::render::live::{Dedup, LiveRenderEngine, Selector};
use crate::render::{LoadingOverlay, PageRenderer, RenderOptions};
use crate::resolve::ResolutionOptions;
use crate::routing::history::History;
use crate::routing::hooks::ClientHooks;
use crate::routing::matcher::{Redirect, RedirectCode, RedirectMatch, RedirectMatcher};

/// Id of the full-viewport passthrough frame.
pub const PROXY_FRAME_ID: &str = "jsHarmonyCMSClientProxy";

const PROXY_FRAME_STYLE: &str = "background-color:rgba(255,255,255,1);position:fixed;top:0px;\
left:0px;bottom:0px;width:100%;height:100%;border:0;z-index:2147483643";

/// Per-call routing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions {
    /// Informational; all I/O is asynchronous.
    pub asynchronous: bool,
    /// Hard-navigate when no content exists. `None` derives it from whether
    /// the target differs from the current location.
    pub redirect_on_not_found: Option<bool>,
    pub loading_overlay: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            redirect_on_not_found: None,
            loading_overlay: true,
        }
    }
}

/// How a route call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Opened from the CMS editor; routing is disabled.
    Skipped,
    Rendered,
    /// The not-found page (or nothing) was rendered.
    NotFound,
    HardNavigated(String),
    PassthroughEmbedded(String),
    PassthroughNavigated(String),
}

impl RouteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Skipped => "skipped",
            RouteOutcome::Rendered => "rendered",
            RouteOutcome::NotFound => "not_found",
            RouteOutcome::HardNavigated(_) => "hard_navigated",
            RouteOutcome::PassthroughEmbedded(_) => "passthrough_embedded",
            RouteOutcome::PassthroughNavigated(_) => "passthrough_navigated",
        }
    }
}

/// Result of a click dispatched to the router.
#[derive(Debug)]
pub enum ClickOutcome {
    /// Not a bound link; the default action proceeds.
    Ignored,
    /// A bound link whose routing was cancelled by `on_link_click`.
    Cancelled,
    /// Routing in progress.
    Routing(JoinHandle<Result<RouteOutcome, CmsError>>),
}

impl ClickOutcome {
    /// Whether the default navigation was prevented.
    pub fn default_prevented(&self) -> bool {
        !matches!(self, ClickOutcome::Ignored)
    }
}

struct RouterState<F> {
    config: ClientConfig,
    loader: ContentLoader<F>,
    host: Rc<dyn Host>,
    hooks: Rc<dyn ClientHooks>,
    document: Rc<RefCell<Document>>,
    engine: LiveRenderEngine,
    renderer: PageRenderer,
    overlay: LoadingOverlay,
    history: History,
    handshake: ProxyHandshake,
}

/// Client-side content router. Cheap to clone.
pub struct Router<F> {
    state: Rc<RouterState<F>>,
}

impl<F> Clone for Router<F> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<F> std::fmt::Debug for Router<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("page_files_path", &self.state.config.page_files_path)
            .field("engine", &self.state.engine)
            .finish()
    }
}

impl<F: ContentFetcher + 'static> Router<F> {
    pub fn new(
        fetcher: F,
        config: ClientConfig,
        host: Rc<dyn Host>,
        hooks: Rc<dyn ClientHooks>,
        document: Rc<RefCell<Document>>,
    ) -> Self {
        let footer_container = config.footer_container.as_deref().and_then(|css| {
            SelectorList::parse(css)
                .map_err(|e| tracing::warn!(selector = css, error = %e, "Ignoring footer container"))
                .ok()
        });
        let engine = LiveRenderEngine::new(document.clone());
        let renderer = PageRenderer::new(engine.clone(), host.clone(), hooks.clone(), footer_container);
        let router = Self {
            state: Rc::new(RouterState {
                loader: ContentLoader::new(fetcher, &config),
                overlay: LoadingOverlay::new(engine.clone()),
                config,
                host,
                hooks,
                document,
                engine,
                renderer,
                history: History::new(),
                handshake: ProxyHandshake::new(),
            }),
        };
        if router.state.config.auto_init {
            router.init();
        }
        router
    }

    pub fn config(&self) -> &ClientConfig {
        &self.state.config
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.state.document
    }

    pub fn renderer(&self) -> &PageRenderer {
        &self.state.renderer
    }

    pub fn overlay(&self) -> &LoadingOverlay {
        &self.state.overlay
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    /// Append the render stylesheet, unless opened from the editor.
    pub fn init(&self) {
        if self.is_in_editor() {
            tracing::info!("Opened from the CMS editor, client rendering disabled");
            return;
        }
        self.state.renderer.append_render_css();
    }

    pub fn is_in_editor(&self) -> bool {
        query::is_in_editor(&self.state.host.current_url())
    }

    /// Template id requested by the editor, or empty.
    pub fn editor_template_id(&self) -> String {
        query::editor_template_id(&self.state.host.current_url())
    }

    // ----- data access -----

    /// Content path for `url`.
    pub fn resolve(&self, url: &str, options: &mut ResolutionOptions) -> Result<String, CmsError> {
        let location = self.state.host.current_url();
        self.state.loader.resolver().resolve(url, &location, options)
    }

    pub async fn get_page_data(&self, url: &str) -> Result<PageData, CmsError> {
        let location = self.state.host.current_url();
        self.state.loader.page_data(url, &location).await
    }

    pub async fn get_redirect_data(&self) -> Result<Vec<Redirect>, CmsError> {
        self.state.loader.redirects().await
    }

    /// First redirect in `redirects` matching `url`.
    pub fn match_redirect(&self, redirects: &[Redirect], url: &str) -> Result<Option<RedirectMatch>, CmsError> {
        let location = self.state.host.current_url();
        RedirectMatcher::new(redirects).find(url, &location)
    }

    // ----- rendering -----

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            bind_links: self.state.config.bind_routing_events,
        }
    }

    pub async fn render_page(&self, page: &PageData) {
        self.state.renderer.render_page(page, self.render_options()).await;
    }

    pub async fn render_element(&self, element: NodeId, page: &PageData) {
        self.state
            .renderer
            .render_element(element, page, self.render_options())
            .await;
    }

    /// Fetch and render `url` without redirect processing.
    pub async fn render(&self, url: &str) -> Result<(), CmsError> {
        let page = self.get_page_data(url).await?;
        self.render_page(&page).await;
        Ok(())
    }

    /// Standalone entry point: render `url`, reporting failures to `on_error`.
    pub async fn standalone(&self, url: &str) -> Result<(), CmsError> {
        if self.is_in_editor() {
            return Ok(());
        }
        let result = self.render(url).await;
        if let Err(e) = &result {
            self.state.hooks.on_error(e);
        }
        result
    }

    // ----- routing -----

    /// Router entry point: route without overlay.
    pub async fn run(&self, url: &str) -> Result<RouteOutcome, CmsError> {
        let options = RouteOptions {
            asynchronous: false,
            loading_overlay: false,
            ..Default::default()
        };
        self.route(url, options).await
    }

    pub async fn route(&self, url: &str, options: RouteOptions) -> Result<RouteOutcome, CmsError> {
        let result = self.route_inner(url, options).await;
        match &result {
            Ok(outcome) => {
                metrics::record_route(outcome.label());
                tracing::info!(url, outcome = outcome.label(), "Route finished");
            }
            Err(e) => {
                metrics::record_route(e.kind());
                self.state.hooks.on_error(e);
            }
        }
        result
    }

    async fn route_inner(&self, url: &str, options: RouteOptions) -> Result<RouteOutcome, CmsError> {
        if self.is_in_editor() {
            tracing::debug!(url, "Routing skipped in the CMS editor");
            return Ok(RouteOutcome::Skipped);
        }

        let state = &self.state;
        let mut url = url.to_string();
        let mut options = options;
        let mut hops = 0;

        loop {
            let location = state.host.current_url();
            let same_url = is_same_url(&url, &location);
            let redirect_on_not_found = options.redirect_on_not_found.unwrap_or(!same_url);

            state.document.borrow_mut().remove_element_by_id(PROXY_FRAME_ID);
            let _loading = options.loading_overlay.then(|| state.overlay.start());
            if state.config.bind_routing_events {
                state.history.bind_pop_state();
            }

            let redirects = state.loader.redirects().await?;
            let matched = RedirectMatcher::new(&redirects).find(&url, &location)?;

            let Some(redirect) = matched else {
                return self.fetch_and_render(&url, &location, same_url, redirect_on_not_found).await;
            };

            metrics::record_redirect(&redirect.http_code);
            match RedirectCode::parse(&redirect.http_code)? {
                RedirectCode::Permanent | RedirectCode::Temporary => {
                    hops += 1;
                    if hops > state.config.max_redirects {
                        return Err(CmsError::RedirectLoop(state.config.max_redirects));
                    }
                    tracing::info!(
                        from = %url,
                        to = %redirect.destination,
                        code = %redirect.http_code,
                        "Following redirect"
                    );
                    url = redirect.destination;
                    options = RouteOptions {
                        asynchronous: options.asynchronous,
                        redirect_on_not_found: None,
                        loading_overlay: options.loading_overlay,
                    };
                }
                RedirectCode::Passthrough => {
                    return Ok(self.passthrough(&url, &redirect.destination, same_url).await);
                }
            }
        }
    }

    async fn passthrough(&self, url: &str, destination: &str, same_url: bool) -> RouteOutcome {
        let state = &self.state;

        if state.host.is_nested_frame() {
            let confirmation = state.handshake.begin();
            state.host.post_to_parent(BridgeMessage::ProxyRequest);
            let timeout = Duration::from_millis(state.config.proxy_confirm_timeout_ms);

            if state.handshake.wait(confirmation, timeout).await {
                tracing::info!(destination, "Passthrough confirmed by parent frame");
                if !same_url {
                    state.host.navigate(destination);
                }
                return RouteOutcome::PassthroughNavigated(destination.to_string());
            }
            tracing::debug!(destination, "No passthrough confirmation, embedding");
        }

        let src = destination.to_string();
        state.engine.register(Selector::body(), Dedup::List, move |doc, body| {
            let frame = doc.create_element("iframe");
            doc.set_attribute(frame, "id", PROXY_FRAME_ID);
            doc.set_attribute(frame, "style", PROXY_FRAME_STYLE);
            doc.set_attribute(frame, "src", &src);
            doc.append_child(body, frame);
        });
        if state.config.bind_routing_events && !same_url {
            self.push_history(url, "");
        }
        RouteOutcome::PassthroughEmbedded(destination.to_string())
    }

    async fn fetch_and_render(
        &self,
        url: &str,
        location: &Url,
        same_url: bool,
        redirect_on_not_found: bool,
    ) -> Result<RouteOutcome, CmsError> {
        let state = &self.state;

        match state.loader.page_data(url, location).await {
            Ok(page) => {
                if let Some(template) = page.template_id() {
                    let unsupported = template == STANDALONE_TEMPLATE || !state.config.supports_template(template);
                    if unsupported && !same_url {
                        tracing::info!(url, template, "Template not rendered in place");
                        return Ok(self.hard_navigate(url));
                    }
                }
                if state.config.bind_routing_events && !same_url {
                    let title = page.document_title().unwrap_or_default().to_string();
                    self.push_history(url, &title);
                }
                self.render_page(&page).await;
                Ok(RouteOutcome::Rendered)
            }
            Err(CmsError::InvalidContent { url: requested, content_path, .. }) => {
                tracing::warn!(url = %requested, content_path = %content_path, "Content is not a page document");
                Ok(self.hard_navigate(&requested))
            }
            Err(CmsError::PageNotFound { path }) => {
                tracing::debug!(url, path = %path, "No content for route");
                if redirect_on_not_found {
                    return Ok(self.hard_navigate(url));
                }
                if state.config.bind_routing_events && !same_url {
                    let title = state.document.borrow().title().to_string();
                    self.push_history(url, &title);
                }
                if let Some(page) = state.hooks.on_route_not_found(url) {
                    self.render_page(&page).await;
                }
                Ok(RouteOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn hard_navigate(&self, url: &str) -> RouteOutcome {
        self.state.host.navigate(url);
        RouteOutcome::HardNavigated(url.to_string())
    }

    fn push_history(&self, url: &str, title: &str) {
        self.state.history.push(
            self.state.host.as_ref(),
            self.state.hooks.as_ref(),
            url,
            title,
            self.state.config.bind_routing_events,
        );
    }

    // ----- events -----

    /// Dispatch a cross-frame message. Returns whether it was recognized.
    pub fn handle_message(&self, data: &str) -> bool {
        match BridgeMessage::parse(data) {
            Some(BridgeMessage::ProxyRequest) => {
                let has_proxy = self
                    .state
                    .document
                    .borrow()
                    .get_element_by_id(PROXY_FRAME_ID)
                    .is_some();
                if has_proxy {
                    self.state.host.post_to_embedded(BridgeMessage::ProxyConfirmed);
                }
                true
            }
            Some(BridgeMessage::ProxyConfirmed) => {
                if !self.state.handshake.confirm() {
                    tracing::debug!("Proxy confirmation without pending handshake");
                }
                true
            }
            None => false,
        }
    }

    /// Route a click on a link inside a bound content area.
    pub fn handle_click(&self, target: NodeId) -> ClickOutcome {
        let href = {
            let doc = self.state.document.borrow();
            let is_link = doc.tag(target).is_some_and(|tag| tag == "a" || tag == "area");
            let bound = self.state.renderer.link_scopes().scope_of(&doc, target).is_some();
            match doc.attribute(target, "href") {
                Some(href) if is_link && bound && !href.is_empty() => href.to_string(),
                _ => return ClickOutcome::Ignored,
            }
        };

        let location = self.state.host.current_url();
        let absolute = match location.join(&href) {
            Ok(absolute) => absolute.to_string(),
            Err(e) => {
                tracing::debug!(href = %href, error = %e, "Unroutable link");
                return ClickOutcome::Ignored;
            }
        };

        if !self.state.hooks.on_link_click(&absolute) {
            return ClickOutcome::Cancelled;
        }
        let router = self.clone();
        ClickOutcome::Routing(tokio::task::spawn_local(async move {
            router.route(&absolute, RouteOptions::default()).await
        }))
    }

    /// Route to the current location after history navigation.
    pub fn handle_pop_state(&self) -> Option<JoinHandle<Result<RouteOutcome, CmsError>>> {
        if !self.state.history.is_pop_state_bound() {
            return None;
        }
        let url = self.state.host.current_url().to_string();
        if !self.state.hooks.on_restore_state(&url) {
            return None;
        }
        let router = self.clone();
        Some(tokio::task::spawn_local(async move {
            router.route(&url, RouteOptions::default()).await
        }))
    }
}

/// Whether `url` addresses the current location, ignoring the fragment.
fn is_same_url(url: &str, location: &Url) -> bool {
    if url.is_empty() {
        return true;
    }
    match location.join(url) {
        Ok(mut target) => {
            let mut current = location.clone();
            target.set_fragment(None);
            current.set_fragment(None);
            target == current
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_url() {
        let location = Url::parse("https://site.test/about").unwrap();
        assert!(is_same_url("", &location));
        assert!(is_same_url("https://site.test/about", &location));
        assert!(is_same_url("/about#team", &location));
        assert!(!is_same_url("/contact", &location));
        assert!(!is_same_url("/about?x=1", &location));
    }

    #[test]
    fn test_route_options_default() {
        let options = RouteOptions::default();
        assert!(options.asynchronous && options.loading_overlay);
        assert_eq!(options.redirect_on_not_found, None);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RouteOutcome::Rendered.label(), "rendered");
        assert_eq!(RouteOutcome::HardNavigated("/x".into()).label(), "hard_navigated");
    }
}
