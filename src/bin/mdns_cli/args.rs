//! Manage command line arguments here.
use clap::{App, Arg};

use mdns_sd::error::{DnsSdError, DnsSdResult};

#[derive(Debug)]
pub enum Command {
    Browse {
        service_type: String,
    },
    Advertise {
        name: String,
        service_type: String,
        port: u16,
        txt: Vec<String>,
    },
}

/// This structure holds the command line arguments.
#[derive(Debug)]
pub struct CliOptions {
    pub command: Command,
    pub ipv6: bool,
    pub debug: bool,
}

impl CliOptions {
    pub fn options() -> DnsSdResult<Self> {
        let matches = App::new("mdns-cli")
            .version("0.1")
            .about(
                r#"Browse or advertise DNS-SD services over mDNS

            Project home page: https://github.com/mdns-sd/mdns-sd
            "#,
            )
            .arg(
                Arg::new("ipv6")
                    .long("ipv6")
                    .required(false)
                    .long_help("Also bind an IPv6 multicast socket")
                    .takes_value(false),
            )
            .arg(
                Arg::new("debug")
                    .short('g')
                    .long("debug")
                    .required(false)
                    .long_help("Debug mode")
                    .takes_value(false),
            )
            .subcommand(
                App::new("browse")
                    .about("Discover instances of a service type")
                    .arg(
                        Arg::new("service-type")
                            .required(true)
                            .long_help("e.g. _http._tcp.local."),
                    ),
            )
            .subcommand(
                App::new("advertise")
                    .about("Register and serve a local service instance")
                    .arg(Arg::new("name").required(true).long_help("Instance name"))
                    .arg(
                        Arg::new("service-type")
                            .required(true)
                            .long_help("e.g. _http._tcp"),
                    )
                    .arg(Arg::new("port").required(true).long_help("Service port"))
                    .arg(
                        Arg::new("txt")
                            .short('t')
                            .long("txt")
                            .long_help("key=value TXT entry, may be repeated")
                            .takes_value(true)
                            .multiple_occurrences(true),
                    ),
            )
            .get_matches();

        let ipv6 = matches.is_present("ipv6");
        let debug = matches.is_present("debug");

        let command = match matches.subcommand() {
            Some(("browse", sub)) => Command::Browse {
                service_type: sub.value_of("service-type").unwrap().to_string(),
            },
            Some(("advertise", sub)) => {
                let port = sub
                    .value_of("port")
                    .unwrap()
                    .parse::<u16>()
                    .map_err(|e| DnsSdError::Internal(format!("invalid port: {}", e)))?;
                let txt = sub
                    .values_of("txt")
                    .map(|vals| vals.map(str::to_string).collect())
                    .unwrap_or_default();
                Command::Advertise {
                    name: sub.value_of("name").unwrap().to_string(),
                    service_type: sub.value_of("service-type").unwrap().to_string(),
                    port,
                    txt,
                }
            }
            _ => {
                return Err(DnsSdError::Internal(
                    "expected a 'browse' or 'advertise' subcommand".to_string(),
                ))
            }
        };

        Ok(CliOptions {
            command,
            ipv6,
            debug,
        })
    }
}
