//! The events a `ServiceBrowser` and `ServiceAdvertiser` publish on their
//! respective event streams.
use crate::error::DnsSdError;
use crate::service::Service;

#[derive(Debug)]
pub enum BrowserEvent {
    /// A new service instance was seen for the first time.
    Found(Service),
    /// SRV, TXT, or address data for a known instance changed.
    Updated(Service),
    /// A goodbye (TTL=0 PTR) removed a known instance.
    Removed(Service),
    /// The transport reported an I/O failure.
    Error(DnsSdError),
}

#[derive(Debug)]
pub enum AdvertiserEvent {
    Registered(Service),
    Updated(Service),
    Unregistered(Service),
    /// Reserved: name-collision renaming is a non-goal, so the core never
    /// emits this today.
    Conflict(Service, Service),
    Error(DnsSdError),
}
