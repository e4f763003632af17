//! A small mDNS/DNS-SD client: browse for instances of a service type, or
//! register and serve one of your own.
use std::net::Ipv4Addr;
use std::sync::Arc;

use log::debug;

use mdns_sd::config::{AdvertiserConfig, BrowserConfig, TransportConfig};
use mdns_sd::error::DnsSdResult;
use mdns_sd::service::Service;
use mdns_sd::transport::UdpTransport;
use mdns_sd::{ServiceAdvertiser, ServiceBrowser};

mod args;
use args::{CliOptions, Command};

mod display;
use display::DisplayWrapper;

#[tokio::main]
async fn main() -> DnsSdResult<()> {
    env_logger::init();

    let options = CliOptions::options()?;
    debug!("options: {:?}", &options);

    let transport_config = TransportConfig {
        use_ipv4: true,
        use_ipv6: options.ipv6,
        interface_name: None,
    };

    match options.command {
        Command::Browse { service_type } => run_browse(service_type, transport_config).await,
        Command::Advertise {
            name,
            service_type,
            port,
            txt,
        } => run_advertise(name, service_type, port, txt, transport_config).await,
    }
}

async fn run_browse(service_type: String, transport_config: TransportConfig) -> DnsSdResult<()> {
    let transport = Arc::new(UdpTransport::new(transport_config));
    let browser = ServiceBrowser::new(transport, BrowserConfig::default());

    let full_type = if service_type.ends_with('.') {
        service_type
    } else {
        format!("{}.local.", service_type)
    };
    println!("browsing {}", full_type);
    browser.browse(&full_type).await?;

    loop {
        tokio::select! {
            event = browser.next_event() => {
                match event {
                    Some(event) => println!("{}", DisplayWrapper(&event)),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("stopping...");
                browser.stop().await?;
                break;
            }
        }
    }

    Ok(())
}

async fn run_advertise(
    name: String,
    service_type: String,
    port: u16,
    txt: Vec<String>,
    transport_config: TransportConfig,
) -> DnsSdResult<()> {
    let transport = Arc::new(UdpTransport::new(transport_config));
    let advertiser = ServiceAdvertiser::new(transport, AdvertiserConfig::default());

    let mut service = Service::new(name, service_type).with_port(port);
    for entry in txt {
        match entry.split_once('=') {
            Some((k, v)) => service.txt.append(k, v),
            None => service.txt.append(&entry, ""),
        }
    }
    service.ipv4.push(Ipv4Addr::LOCALHOST);

    println!("registering {}", service.full_name());
    advertiser.register(service).await?;

    loop {
        tokio::select! {
            event = advertiser.next_event() => {
                match event {
                    Some(event) => println!("{}", DisplayWrapper(&event)),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("stopping...");
                advertiser.stop().await?;
                break;
            }
        }
    }

    Ok(())
}
