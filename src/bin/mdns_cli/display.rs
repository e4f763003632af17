//! Display method: as we can't impl the Display trait outside the crate
//! where Service is defined, use a wrapper, same as the library's own style.
use std::fmt;

use mdns_sd::event::{AdvertiserEvent, BrowserEvent};
use mdns_sd::service::Service;

pub struct DisplayWrapper<'a, T>(pub &'a T);

impl fmt::Display for DisplayWrapper<'_, Service> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.full_name())?;
        if let Some(host) = &self.0.host {
            write!(f, " host:{}", host)?;
        }
        if let Some(port) = self.0.port {
            write!(f, " port:{}", port)?;
        }
        for ip in &self.0.ipv4 {
            write!(f, " {}", ip)?;
        }
        for ip in &self.0.ipv6 {
            write!(f, " {}", ip)?;
        }
        for entry in self.0.txt.to_strings() {
            write!(f, " [{}]", entry)?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayWrapper<'_, BrowserEvent> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            BrowserEvent::Found(s) => write!(f, "+ found     {}", DisplayWrapper(s)),
            BrowserEvent::Updated(s) => write!(f, "~ updated   {}", DisplayWrapper(s)),
            BrowserEvent::Removed(s) => write!(f, "- removed   {}", DisplayWrapper(s)),
            BrowserEvent::Error(e) => write!(f, "! error     {}", e),
        }
    }
}

impl fmt::Display for DisplayWrapper<'_, AdvertiserEvent> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            AdvertiserEvent::Registered(s) => write!(f, "+ registered   {}", DisplayWrapper(s)),
            AdvertiserEvent::Updated(s) => write!(f, "~ updated      {}", DisplayWrapper(s)),
            AdvertiserEvent::Unregistered(s) => write!(f, "- unregistered {}", DisplayWrapper(s)),
            AdvertiserEvent::Conflict(mine, theirs) => write!(
                f,
                "! conflict     {} vs {}",
                DisplayWrapper(mine),
                DisplayWrapper(theirs)
            ),
            AdvertiserEvent::Error(e) => write!(f, "! error        {}", e),
        }
    }
}
