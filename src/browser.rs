//! `ServiceBrowser`: a single-task actor that issues periodic PTR queries
//! for the service types it's asked to browse, demultiplexes incoming
//! responses into a table of discovered `Service`s, and publishes
//! `BrowserEvent`s as that table changes.
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::BrowserConfig;
use crate::error::{DnsSdError, DnsSdResult};
use crate::event::BrowserEvent;
use crate::message::{mdns_query, mdns_query_types};
use crate::name::DnsName;
use crate::record::{RData, RRType};
use crate::service::Service;
use crate::transport::Transport;

enum Command {
    Browse(String, oneshot::Sender<DnsSdResult<()>>),
    StopBrowsing(String, oneshot::Sender<DnsSdResult<()>>),
    Resolve(String, oneshot::Sender<DnsSdResult<Option<Service>>>),
    Stop(oneshot::Sender<DnsSdResult<()>>),
}

/// Discovers instances of one or more DNS-SD service types over mDNS.
///
/// Every public method is a thin RPC over a command channel into the
/// actor's own task, so the service table is only ever mutated from that
/// one task — no `Mutex<State>` shared across callers.
pub struct ServiceBrowser {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: Mutex<mpsc::UnboundedReceiver<BrowserEvent>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn split_full_type(full_type: &DnsName) -> (String, String) {
    let labels = full_type.labels();
    if labels.is_empty() {
        return (String::new(), "local".to_string());
    }
    let domain = labels[labels.len() - 1].clone();
    let service_type = labels[..labels.len() - 1].join(".");
    (service_type, domain)
}

fn instance_name_from_ptr(target: &DnsName, full_type: &DnsName) -> Option<String> {
    let target_s = target.to_string();
    let suffix = full_type.to_string();
    target_s
        .strip_suffix(&suffix)
        .map(|prefix| prefix.trim_end_matches('.').to_string())
        .filter(|s| !s.is_empty())
}

impl ServiceBrowser {
    /// Spawns the actor task and starts `transport`. Browsing doesn't begin
    /// until [`ServiceBrowser::browse`] is called.
    pub fn new<T: Transport + 'static>(transport: Arc<T>, config: BrowserConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(Self::run(transport, config, cmd_rx, event_tx));

        ServiceBrowser {
            cmd_tx,
            event_rx: Mutex::new(event_rx),
            task: Mutex::new(Some(task)),
        }
    }

    /// Adds `service_type` (e.g. `"_http._tcp.local."`) to the browsing set
    /// and sends an immediate PTR query for it.
    pub async fn browse(&self, service_type: &str) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Browse(service_type.to_string(), tx))
            .map_err(|_| DnsSdError::Internal("browser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("browser task dropped reply".to_string()))?
    }

    pub async fn stop_browsing(&self, service_type: &str) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::StopBrowsing(service_type.to_string(), tx))
            .map_err(|_| DnsSdError::Internal("browser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("browser task dropped reply".to_string()))?
    }

    /// Sends a QU resolve query for `full_name` and returns the service's
    /// current known state (the response itself arrives asynchronously
    /// through the normal receive loop, not as this call's return value).
    pub async fn resolve(&self, full_name: &str) -> DnsSdResult<Option<Service>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Resolve(full_name.to_string(), tx))
            .map_err(|_| DnsSdError::Internal("browser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("browser task dropped reply".to_string()))?
    }

    pub async fn stop(&self) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Stop(tx)).is_err() {
            return Ok(());
        }
        let result = rx
            .await
            .map_err(|_| DnsSdError::Internal("browser task dropped reply".to_string()))?;
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
        result
    }

    /// The next event, or `None` once the actor has stopped and drained.
    pub async fn next_event(&self) -> Option<BrowserEvent> {
        self.event_rx.lock().await.recv().await
    }

    async fn run<T: Transport + 'static>(
        transport: Arc<T>,
        config: BrowserConfig,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        event_tx: mpsc::UnboundedSender<BrowserEvent>,
    ) {
        if let Err(e) = transport.start().await {
            let _ = event_tx.send(BrowserEvent::Error(e));
            return;
        }

        let mut services: HashMap<String, Service> = HashMap::new();
        let mut browsing: HashSet<String> = HashSet::new();
        let mut query_interval = tokio::time::interval(config.query_interval);
        query_interval.tick().await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Browse(service_type, reply)) => {
                            let result = match DnsName::from_str(&service_type) {
                                Ok(name) => {
                                    browsing.insert(service_type);
                                    let _ = transport.send(&mdns_query(&name)).await;
                                    Ok(())
                                }
                                Err(e) => Err(e),
                            };
                            let _ = reply.send(result);
                        }
                        Some(Command::StopBrowsing(service_type, reply)) => {
                            browsing.remove(&service_type);
                            let to_remove: Vec<String> = services
                                .iter()
                                .filter(|(_, s)| s.full_type().eq_ignore_ascii_case(&service_type))
                                .map(|(k, _)| k.clone())
                                .collect();
                            for key in to_remove {
                                if let Some(service) = services.remove(&key) {
                                    let _ = event_tx.send(BrowserEvent::Removed(service));
                                }
                            }
                            let _ = reply.send(Ok(()));
                        }
                        Some(Command::Resolve(full_name, reply)) => {
                            if let Ok(name) = DnsName::from_str(&full_name) {
                                let query = mdns_query_types(&name, &[RRType::SRV, RRType::TXT], true);
                                let _ = transport.send(&query).await;
                            }
                            let _ = reply.send(Ok(services.get(&full_name).cloned()));
                        }
                        Some(Command::Stop(reply)) => {
                            let _ = transport.stop().await;
                            let _ = reply.send(Ok(()));
                            break;
                        }
                        None => break,
                    }
                }
                incoming = transport.recv() => {
                    match incoming {
                        Some((message, _from)) => {
                            if message.is_mdns() && message.flags.response {
                                let newly_found = Self::handle_response(&message, &browsing, &mut services, &event_tx);
                                if config.auto_resolve {
                                    for name in newly_found {
                                        let query = mdns_query_types(&name, &[RRType::SRV, RRType::TXT], true);
                                        let _ = transport.send(&query).await;
                                    }
                                }
                            }
                        }
                        None => break,
                    }
                }
                _ = query_interval.tick() => {
                    for service_type in &browsing {
                        if let Ok(name) = DnsName::from_str(service_type) {
                            let _ = transport.send(&mdns_query(&name)).await;
                        }
                    }
                }
            }
        }
    }

    /// Applies one incoming response to the service table and returns the
    /// full names of any instances seen for the first time, so the caller
    /// can auto-resolve them.
    fn handle_response(
        message: &crate::message::Message,
        browsing: &HashSet<String>,
        services: &mut HashMap<String, Service>,
        event_tx: &mpsc::UnboundedSender<BrowserEvent>,
    ) -> Vec<DnsName> {
        let mut newly_found = Vec::new();
        for rr in message.answer.iter().chain(message.additional.iter()) {
            match &rr.rdata {
                RData::PTR(target) => {
                    let owner = rr.name.to_string();
                    if !browsing.iter().any(|t| t.eq_ignore_ascii_case(&owner)) {
                        continue;
                    }
                    let full_name = target.to_string();
                    if rr.ttl == 0 {
                        if let Some(service) = services.remove(&full_name) {
                            let _ = event_tx.send(BrowserEvent::Removed(service));
                        }
                        continue;
                    }
                    if !services.contains_key(&full_name) {
                        if let Some(name) = instance_name_from_ptr(target, &rr.name) {
                            let (service_type, domain) = split_full_type(&rr.name);
                            let mut service = Service::new(name, service_type);
                            service.domain = domain;
                            service.ttl = rr.ttl;
                            let _ = event_tx.send(BrowserEvent::Found(service.clone()));
                            services.insert(full_name, service);
                            newly_found.push(target.clone());
                        }
                    }
                }
                RData::SRV {
                    priority,
                    weight,
                    port,
                    target,
                } => {
                    let owner = rr.name.to_string();
                    if let Some(service) = services.get_mut(&owner) {
                        service.host = Some(target.to_string());
                        service.port = Some(*port);
                        service.priority = *priority;
                        service.weight = *weight;
                        service.touch();
                        let _ = event_tx.send(BrowserEvent::Updated(service.clone()));
                    }
                }
                RData::TXT(txt) => {
                    let owner = rr.name.to_string();
                    if let Some(service) = services.get_mut(&owner) {
                        service.txt = txt.clone();
                        service.touch();
                        let _ = event_tx.send(BrowserEvent::Updated(service.clone()));
                    }
                }
                RData::A(addr) => {
                    let owner = rr.name.to_string();
                    for service in services.values_mut() {
                        if service.host.as_deref() == Some(owner.as_str())
                            && !service.ipv4.contains(addr)
                        {
                            service.ipv4.push(*addr);
                            service.touch();
                            let _ = event_tx.send(BrowserEvent::Updated(service.clone()));
                        }
                    }
                }
                RData::AAAA(addr) => {
                    let owner = rr.name.to_string();
                    for service in services.values_mut() {
                        if service.host.as_deref() == Some(owner.as_str())
                            && !service.ipv6.contains(addr)
                        {
                            service.ipv6.push(*addr);
                            service.touch();
                            let _ = event_tx.send(BrowserEvent::Updated(service.clone()));
                        }
                    }
                }
                _ => {}
            }
        }
        newly_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::mdns_response;
    use crate::record::ResourceRecord;
    use crate::transport::MockTransport;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn discovers_resolves_and_removes_a_service() {
        let transport = Arc::new(MockTransport::new());
        let browser = ServiceBrowser::new(transport.clone(), BrowserConfig::default());
        browser.browse("_http._tcp.local.").await.unwrap();

        let from: std::net::SocketAddr = "127.0.0.1:5353".parse().unwrap();

        let ptr = ResourceRecord::new(
            "_http._tcp.local.".parse().unwrap(),
            RData::PTR("My Server._http._tcp.local.".parse().unwrap()),
            120,
        );
        transport.inject(mdns_response(vec![ptr], vec![]), from);
        match browser.next_event().await {
            Some(BrowserEvent::Found(service)) => assert_eq!(service.name, "My Server"),
            other => panic!("expected Found, got {:?}", other),
        }

        let srv = ResourceRecord::new(
            "My Server._http._tcp.local.".parse().unwrap(),
            RData::SRV {
                priority: 0,
                weight: 0,
                port: 8080,
                target: "myhost.local.".parse().unwrap(),
            },
            120,
        );
        transport.inject(mdns_response(vec![srv], vec![]), from);
        match browser.next_event().await {
            Some(BrowserEvent::Updated(service)) => assert_eq!(service.port, Some(8080)),
            other => panic!("expected Updated, got {:?}", other),
        }

        let a = ResourceRecord::new(
            "myhost.local.".parse().unwrap(),
            RData::A(Ipv4Addr::new(192, 168, 1, 100)),
            120,
        );
        transport.inject(mdns_response(vec![a], vec![]), from);
        match browser.next_event().await {
            Some(BrowserEvent::Updated(service)) => assert!(service.has_addresses()),
            other => panic!("expected Updated, got {:?}", other),
        }

        let goodbye = ResourceRecord::new(
            "_http._tcp.local.".parse().unwrap(),
            RData::PTR("My Server._http._tcp.local.".parse().unwrap()),
            0,
        );
        transport.inject(mdns_response(vec![goodbye], vec![]), from);
        match browser.next_event().await {
            Some(BrowserEvent::Removed(service)) => assert_eq!(service.name, "My Server"),
            other => panic!("expected Removed, got {:?}", other),
        }

        browser.stop().await.unwrap();
    }
}
