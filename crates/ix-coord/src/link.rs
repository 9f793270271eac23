//! Channels between the coordinator and page contexts.
//!
//! Pages talk to the coordinator one-way over a shared unbounded channel.
//! The coordinator talks to each page over that page's own control channel;
//! status requests carry a oneshot reply.

use ix_core::{PageId, PageMessage, PageStatus, SessionId, Transport, TransportError};
use tokio::sync::{mpsc, oneshot};
use url::Url;

/// Coordinator → page commands.
#[derive(Debug)]
pub enum Control {
    Start(SessionId),
    Stop,
    Status(oneshot::Sender<PageStatus>),
}

/// A page message tagged with its sender.
#[derive(Debug)]
pub struct Envelope {
    pub page: PageId,
    pub message: PageMessage,
}

/// Page → coordinator transport over the shared inbound channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    page: PageId,
    sender: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    pub(crate) const fn new(page: PageId, sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { page, sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: PageMessage) -> Result<(), TransportError> {
        self.sender
            .send(Envelope {
                page: self.page.clone(),
                message,
            })
            .map_err(|_| TransportError::Disconnected)
    }
}

/// Everything a newly connected page needs to talk to the coordinator.
#[derive(Debug)]
pub struct PageLink {
    pub id: PageId,
    pub url: String,
    pub control: mpsc::UnboundedReceiver<Control>,
    pub transport: ChannelTransport,
}

/// Coordinator side of a page's control channel.
#[derive(Debug, Clone)]
pub(crate) struct PageHandle {
    pub url: String,
    pub control: mpsc::UnboundedSender<Control>,
}

impl PageHandle {
    /// Returns false when the page is gone.
    pub fn send(&self, command: Control) -> bool {
        self.control.send(command).is_ok()
    }
}

/// Receiving end of the inbound page channel.
#[derive(Debug)]
pub struct Inbox {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
    pub(crate) const fn new(receiver: mpsc::UnboundedReceiver<Envelope>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

/// Whether a page URL belongs to the host's own internal pages.
///
/// Unparseable URLs are not privileged.
pub fn is_privileged(url: &str, schemes: &[String]) -> bool {
    Url::parse(url).is_ok_and(|url| {
        schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
    })
}
