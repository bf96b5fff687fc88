use crate::config::EngineConfig;
use crate::overlay::messages::{Request, Response};
use crate::overlay::model::{Area, AreaId};
use crate::overlay::render::OverlaySurface;
use crate::overlay::session::PageSession;
use crate::page::{is_system_page, PageContext};
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No engine instance is resident in the target page.
    NoReceiver,
    Disconnected(String),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::NoReceiver => write!(f, "no engine is listening in the page"),
            DeliveryError::Disconnected(reason) => write!(f, "page channel disconnected: {reason}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// How the control surface reaches the engine of a page.
pub trait PageTransport {
    fn send(
        &mut self,
        page: &PageContext,
        request: &Request,
    ) -> Result<Option<Response>, DeliveryError>;

    /// Loads the engine into the page.
    fn inject(&mut self, page: &PageContext) -> Result<()>;
}

type RetryWait = Box<dyn FnMut(Duration)>;

pub struct MessageClient<T> {
    transport: T,
    retry_delay: Duration,
    wait: RetryWait,
}

impl<T: PageTransport> MessageClient<T> {
    /// The default wait before a retry blocks the calling thread with
    /// `std::thread::sleep`; use [`MessageClient::with_wait`] to hand the
    /// delay to an event loop instead.
    pub fn new(transport: T, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
            wait: Box::new(std::thread::sleep),
        }
    }

    pub fn with_wait(mut self, wait: impl FnMut(Duration) + 'static) -> Self {
        self.wait = Box::new(wait);
        self
    }

    pub fn from_config(transport: T, config: &EngineConfig) -> Self {
        Self::new(transport, config.reinject_retry_delay())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends `request` to the page at `url`. When no engine answers, it is
    /// injected and the request retried once after the configured delay.
    pub fn deliver(&mut self, url: &str, request: &Request) -> Result<Option<Response>> {
        if is_system_page(url) {
            tracing::info!(url, "cannot run on system pages");
            return Ok(None);
        }
        let page = PageContext::from_url(url)?;

        match self.transport.send(&page, request) {
            Ok(response) => Ok(response),
            Err(DeliveryError::NoReceiver) => {
                tracing::warn!(page_key = %page.key(), "no engine in page; injecting and retrying");
                self.transport
                    .inject(&page)
                    .with_context(|| format!("inject engine into {}", page.key()))?;
                (self.wait)(self.retry_delay);
                self.transport
                    .send(&page, request)
                    .with_context(|| format!("retry delivery to {}", page.key()))
            }
            Err(err) => Err(err).with_context(|| format!("deliver request to {}", page.key())),
        }
    }

    /// Stores the global settings, then tells the page about them.
    pub fn update_settings<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        url: &str,
        settings: Settings,
    ) -> Result<Option<Response>> {
        if let Err(err) = settings.save(store) {
            tracing::warn!(?err, "failed to persist settings");
        }
        self.deliver(url, &Request::UpdateSettings { settings })
    }
}

type SessionFactory<S, O> = Box<dyn FnMut(&PageContext) -> PageSession<S, O>>;

/// Hosts page sessions in-process, keyed by page key. A page has no
/// session until the engine is injected into it.
pub struct InProcessTransport<S, O> {
    sessions: HashMap<String, PageSession<S, O>>,
    factory: SessionFactory<S, O>,
    injections: usize,
}

impl<S: KeyValueStore, O: OverlaySurface> InProcessTransport<S, O> {
    pub fn new(factory: impl FnMut(&PageContext) -> PageSession<S, O> + 'static) -> Self {
        Self {
            sessions: HashMap::new(),
            factory: Box::new(factory),
            injections: 0,
        }
    }

    pub fn session(&self, page_key: &str) -> Option<&PageSession<S, O>> {
        self.sessions.get(page_key)
    }

    pub fn session_mut(&mut self, page_key: &str) -> Option<&mut PageSession<S, O>> {
        self.sessions.get_mut(page_key)
    }

    pub fn injections(&self) -> usize {
        self.injections
    }
}

impl<S: KeyValueStore, O: OverlaySurface> PageTransport for InProcessTransport<S, O> {
    fn send(
        &mut self,
        page: &PageContext,
        request: &Request,
    ) -> Result<Option<Response>, DeliveryError> {
        let session = self
            .sessions
            .get_mut(&page.key())
            .ok_or(DeliveryError::NoReceiver)?;
        Ok(session.handle(request.clone()))
    }

    fn inject(&mut self, page: &PageContext) -> Result<()> {
        let key = page.key();
        if !self.sessions.contains_key(&key) {
            let session = (self.factory)(page);
            self.sessions.insert(key, session);
            self.injections += 1;
        }
        Ok(())
    }
}

/// One entry of the control surface's area list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSummary {
    pub id: AreaId,
    pub label: String,
    pub type_label: &'static str,
}

impl AreaSummary {
    pub fn from_areas(areas: &[Area]) -> Vec<Self> {
        areas
            .iter()
            .enumerate()
            .map(|(index, area)| Self {
                id: area.id,
                label: format!(
                    "Area {} ({} x {})",
                    index + 1,
                    area.width.round(),
                    area.height.round()
                ),
                type_label: area.kind().label(),
            })
            .collect()
    }
}
