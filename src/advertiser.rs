//! `ServiceAdvertiser`: a single-task actor that announces registered
//! services on mDNS, answers incoming queries about them, and withdraws
//! them with a goodbye on unregister or stop.
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::AdvertiserConfig;
use crate::error::{DnsSdError, DnsSdResult};
use crate::event::AdvertiserEvent;
use crate::message::mdns_response;
use crate::name::DnsName;
use crate::record::{RData, ResourceRecord, RRType};
use crate::service::Service;
use crate::transport::Transport;

enum Command {
    Register(Service, oneshot::Sender<DnsSdResult<()>>),
    Unregister(String, oneshot::Sender<DnsSdResult<()>>),
    Update(Service, oneshot::Sender<DnsSdResult<()>>),
    Stop(oneshot::Sender<DnsSdResult<()>>),
}

/// Slugifies a hostname into a valid DNS label and appends `.local.`.
fn host_name_to_local(name: &str) -> String {
    let slug: String = name
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}.local.", slug)
}

/// Detects the machine's hostname once, the same way `local_addresses`
/// enumerates the machine's interfaces: a single shared identity every
/// registered service shares unless it sets its own `host`.
fn resolve_local_host(config: &AdvertiserConfig) -> DnsName {
    let raw = config
        .host_name
        .clone()
        .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()))
        .unwrap_or_else(|| "localhost".to_string());
    host_name_to_local(&raw)
        .parse()
        .unwrap_or_else(|_| "localhost.local.".parse().expect("static name parses"))
}

/// Builds the PTR answer plus SRV/TXT/address additionals for one service,
/// the unit of both the initial announcement and every periodic refresh.
fn build_bundle(
    service: &Service,
    local_host: &DnsName,
) -> DnsSdResult<(Vec<ResourceRecord>, Vec<ResourceRecord>)> {
    let full_type: DnsName = service.full_type().parse()?;
    let full_name: DnsName = service.full_name().parse()?;
    let host: DnsName = match &service.host {
        Some(h) => h.parse()?,
        None => local_host.clone(),
    };

    let ptr = ResourceRecord::new(full_type, RData::PTR(full_name.clone()), service.ttl);

    let srv = ResourceRecord::new(
        full_name.clone(),
        RData::SRV {
            priority: service.priority,
            weight: service.weight,
            port: service.port.unwrap_or(0),
            target: host.clone(),
        },
        service.ttl,
    )
    .cache_flush(true);

    let txt = ResourceRecord::new(full_name, RData::TXT(service.txt.clone()), service.ttl)
        .cache_flush(true);

    let mut additional = vec![srv, txt];
    for ip in &service.ipv4 {
        additional.push(
            ResourceRecord::new(host.clone(), RData::A(*ip), service.ttl).cache_flush(true),
        );
    }
    for ip in &service.ipv6 {
        additional.push(
            ResourceRecord::new(host.clone(), RData::AAAA(*ip), service.ttl).cache_flush(true),
        );
    }

    Ok((vec![ptr], additional))
}

fn goodbye_records(service: &Service, local_host: &DnsName) -> DnsSdResult<Vec<ResourceRecord>> {
    let (answer, additional) = build_bundle(service, local_host)?;
    Ok(answer.into_iter().chain(additional).collect())
}

/// Announces and serves one or more locally registered DNS-SD services.
pub struct ServiceAdvertiser {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: Mutex<mpsc::UnboundedReceiver<AdvertiserEvent>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceAdvertiser {
    pub fn new<T: Transport + 'static>(transport: Arc<T>, config: AdvertiserConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(Self::run(transport, config, cmd_rx, event_tx));

        ServiceAdvertiser {
            cmd_tx,
            event_rx: Mutex::new(event_rx),
            task: Mutex::new(Some(task)),
        }
    }

    pub async fn register(&self, service: Service) -> DnsSdResult<()> {
        if service.port.is_none() {
            return Err(DnsSdError::Internal(
                "registered service must have a port".to_string(),
            ));
        }
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Register(service, tx))
            .map_err(|_| DnsSdError::Internal("advertiser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("advertiser task dropped reply".to_string()))?
    }

    pub async fn unregister(&self, full_name: &str) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Unregister(full_name.to_string(), tx))
            .map_err(|_| DnsSdError::Internal("advertiser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("advertiser task dropped reply".to_string()))?
    }

    pub async fn update(&self, service: Service) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Update(service, tx))
            .map_err(|_| DnsSdError::Internal("advertiser task is gone".to_string()))?;
        rx.await
            .map_err(|_| DnsSdError::Internal("advertiser task dropped reply".to_string()))?
    }

    pub async fn stop(&self) -> DnsSdResult<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Stop(tx)).is_err() {
            return Ok(());
        }
        let result = rx
            .await
            .map_err(|_| DnsSdError::Internal("advertiser task dropped reply".to_string()))?;
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
        result
    }

    pub async fn next_event(&self) -> Option<AdvertiserEvent> {
        self.event_rx.lock().await.recv().await
    }

    fn spawn_initial_announcement<T: Transport + 'static>(
        transport: Arc<T>,
        service: Service,
        count: u32,
        local_host: DnsName,
    ) {
        tokio::spawn(async move {
            let mut delay = Duration::from_secs(1);
            for i in 0..count {
                if i > 0 {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                match build_bundle(&service, &local_host) {
                    Ok((answer, additional)) => {
                        if let Err(e) = transport.send(&mdns_response(answer, additional)).await {
                            log::warn!("initial announcement send failed: {}", e);
                        }
                    }
                    Err(e) => {
                        log::warn!("failed to build announcement for {}: {}", service.full_name(), e);
                        break;
                    }
                }
            }
        });
    }

    async fn run<T: Transport + 'static>(
        transport: Arc<T>,
        config: AdvertiserConfig,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        event_tx: mpsc::UnboundedSender<AdvertiserEvent>,
    ) {
        if let Err(e) = transport.start().await {
            let _ = event_tx.send(AdvertiserEvent::Error(e));
            return;
        }

        let (local_v4, local_v6) = Self::local_addresses(&config);
        let local_host = resolve_local_host(&config);
        let mut services: HashMap<String, Service> = HashMap::new();
        let mut refresh_interval = tokio::time::interval(config.announcement_interval);
        refresh_interval.tick().await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Register(mut service, reply)) => {
                            if service.ipv4.is_empty() && service.ipv6.is_empty() {
                                service.ipv4 = local_v4.clone();
                                service.ipv6 = local_v6.clone();
                            }
                            if service.ttl == 0 {
                                service.ttl = config.ttl;
                            }
                            let full_name = service.full_name();
                            services.insert(full_name, service.clone());
                            Self::spawn_initial_announcement(
                                transport.clone(),
                                service.clone(),
                                config.announcement_count,
                                local_host.clone(),
                            );
                            let _ = event_tx.send(AdvertiserEvent::Registered(service));
                            let _ = reply.send(Ok(()));
                        }
                        Some(Command::Unregister(full_name, reply)) => {
                            match services.remove(&full_name) {
                                Some(service) => {
                                    if let Ok(records) = goodbye_records(&service, &local_host) {
                                        let _ = transport.send(&crate::message::mdns_goodbye(&records)).await;
                                    }
                                    let _ = event_tx.send(AdvertiserEvent::Unregistered(service));
                                    let _ = reply.send(Ok(()));
                                }
                                None => {
                                    let _ = reply.send(Err(DnsSdError::ServiceNotFound(full_name)));
                                }
                            }
                        }
                        Some(Command::Update(service, reply)) => {
                            let full_name = service.full_name();
                            if !services.contains_key(&full_name) {
                                let _ = reply.send(Err(DnsSdError::ServiceNotFound(full_name)));
                                continue;
                            }
                            services.insert(full_name, service.clone());
                            Self::spawn_initial_announcement(
                                transport.clone(),
                                service.clone(),
                                config.announcement_count,
                                local_host.clone(),
                            );
                            let _ = event_tx.send(AdvertiserEvent::Updated(service));
                            let _ = reply.send(Ok(()));
                        }
                        Some(Command::Stop(reply)) => {
                            for service in services.values() {
                                if let Ok(records) = goodbye_records(service, &local_host) {
                                    if let Err(e) = transport.send(&crate::message::mdns_goodbye(&records)).await {
                                        log::warn!("goodbye send failed for {}: {}", service.full_name(), e);
                                    }
                                }
                            }
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
                            if message.is_mdns() && !message.flags.response {
                                if let Some(response) = Self::build_query_response(&message, &services, &local_host) {
                                    let _ = transport.send(&response).await;
                                }
                            }
                        }
                        None => break,
                    }
                }
                _ = refresh_interval.tick() => {
                    for service in services.values() {
                        if let Ok((answer, additional)) = build_bundle(service, &local_host) {
                            let _ = transport.send(&mdns_response(answer, additional)).await;
                        }
                    }
                }
            }
        }
    }

    fn local_addresses(config: &AdvertiserConfig) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>) {
        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        if let Ok(interfaces) = if_addrs::get_if_addrs() {
            for iface in interfaces {
                if iface.is_loopback() {
                    continue;
                }
                if let Some(name) = &config.transport.interface_name {
                    if &iface.name != name {
                        continue;
                    }
                }
                match iface.ip() {
                    std::net::IpAddr::V4(addr) if config.transport.use_ipv4 => v4.push(addr),
                    std::net::IpAddr::V6(addr) if config.transport.use_ipv6 => v6.push(addr),
                    _ => {}
                }
            }
        }
        (v4, v6)
    }

    fn build_query_response(
        message: &crate::message::Message,
        services: &HashMap<String, Service>,
        local_host: &DnsName,
    ) -> Option<crate::message::Message> {
        let mut answer = Vec::new();
        let mut additional = Vec::new();

        for question in &message.question {
            let question_name = question.name.to_string();

            for service in services.values() {
                let full_type = service.full_type();
                let full_name = service.full_name();
                let host = service
                    .host
                    .clone()
                    .unwrap_or_else(|| local_host.to_string());

                let matches_type = question_name.eq_ignore_ascii_case(&full_type)
                    && matches!(question.qtype, RRType::PTR | RRType::ANY);
                let matches_instance = question_name.eq_ignore_ascii_case(&full_name)
                    && matches!(question.qtype, RRType::SRV | RRType::TXT | RRType::ANY);
                let matches_host = question_name.eq_ignore_ascii_case(&host)
                    && matches!(question.qtype, RRType::A | RRType::AAAA | RRType::ANY);

                if !matches_type && !matches_instance && !matches_host {
                    continue;
                }

                if let Ok((service_answer, service_additional)) = build_bundle(service, local_host) {
                    if matches_type {
                        answer.extend(service_answer);
                        additional.extend(service_additional);
                    } else {
                        additional.extend(service_additional);
                    }
                }
            }
        }

        if answer.is_empty() && additional.is_empty() {
            None
        } else {
            Some(mdns_response(answer, additional))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::mdns_query;
    use crate::record::RData;
    use crate::transport::MockTransport;
    use std::time::Duration;

    #[tokio::test]
    async fn initial_announcement_sends_at_least_once() {
        let transport = Arc::new(MockTransport::new());
        let mut config = AdvertiserConfig::default();
        // a single, immediate send: no backoff delay to wait out in the test
        config.announcement_count = 1;
        let advertiser = ServiceAdvertiser::new(transport.clone(), config);

        let service = Service::new("Test", "_http._tcp").with_port(8080);
        advertiser.register(service).await.unwrap();

        match advertiser.next_event().await {
            Some(AdvertiserEvent::Registered(s)) => assert_eq!(s.name, "Test"),
            other => panic!("expected Registered, got {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(50)).await;

        let sent = transport.sent_messages();
        assert!(!sent.is_empty());
        assert!(sent.iter().all(|m| !m.answer.is_empty()));

        advertiser.stop().await.unwrap();
    }

    #[tokio::test]
    async fn responds_to_ptr_query_with_full_bundle() {
        let transport = Arc::new(MockTransport::new());
        let advertiser = ServiceAdvertiser::new(transport.clone(), AdvertiserConfig::default());

        let service = Service::new("Test", "_http._tcp").with_port(8080);
        advertiser.register(service).await.unwrap();
        let _ = advertiser.next_event().await;

        let from: std::net::SocketAddr = "127.0.0.1:5353".parse().unwrap();
        let name: DnsName = "_http._tcp.local.".parse().unwrap();
        transport.inject(mdns_query(&name), from);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = transport.sent_messages();
        let has_ptr = sent.iter().any(|m| {
            m.answer
                .iter()
                .any(|rr| matches!(rr.rdata, RData::PTR(_)))
        });
        assert!(has_ptr);

        advertiser.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unregister_sends_goodbye() {
        let transport = Arc::new(MockTransport::new());
        let advertiser = ServiceAdvertiser::new(transport.clone(), AdvertiserConfig::default());

        let service = Service::new("Test", "_http._tcp").with_port(8080);
        advertiser.register(service.clone()).await.unwrap();
        let _ = advertiser.next_event().await;

        advertiser.unregister(&service.full_name()).await.unwrap();
        match advertiser.next_event().await {
            Some(AdvertiserEvent::Unregistered(s)) => assert_eq!(s.name, "Test"),
            other => panic!("expected Unregistered, got {:?}", other),
        }

        let sent = transport.sent_messages();
        assert!(sent
            .iter()
            .any(|m| m.answer.iter().any(|rr| rr.ttl == 0)));
    }
}
