//! Outbound address restrictions for plain HTTP tasks.
//!
//! Restricted clients check every address they connect to: domain names go
//! through [`GuardedResolver`] at connect time and every redirect hop is
//! checked by the redirect policy, so neither a rebinding DNS name nor a
//! `Location` header pointing at a private host gets through.

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::{Attempt, Policy};
use reqwest::Client;
use thiserror::Error;
use url::{Host, Url};

/// Decides whether an address may not be reached.
pub type AddressFilter = fn(IpAddr) -> bool;

const MAX_REDIRECTS: usize = 10;

/// A connection or redirect hop was refused because of its address.
#[derive(Debug, Clone, Error)]
#[error("address {ip} of '{host}' is restricted")]
pub struct RestrictedAddress {
  pub host: String,
  pub ip: IpAddr,
}

/// Loopback, private, link-local, shared and unspecified addresses.
pub fn is_restricted(ip: IpAddr) -> bool {
  match ip {
    IpAddr::V4(v4) => {
      let [a, b, ..] = v4.octets();
      v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || (a == 100 && (b & 0xc0) == 64)
    }
    IpAddr::V6(v6) => {
      let first = v6.segments()[0];
      v6.is_loopback()
        || v6.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || v6.to_ipv4_mapped().is_some_and(|v4| is_restricted(IpAddr::V4(v4)))
    }
  }
}

/// Check a URL whose host is an IP literal. Domain hosts pass here and are
/// checked by the resolver when the connection is made.
pub fn check_literal(url: &Url, restricted: AddressFilter) -> Result<(), RestrictedAddress> {
  let ip = match url.host() {
    Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
    Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
    _ => return Ok(()),
  };
  if restricted(ip) {
    return Err(RestrictedAddress {
      host: url.host_str().unwrap_or_default().to_string(),
      ip,
    });
  }
  Ok(())
}

/// Resolver that fails when any address of a name is restricted.
struct GuardedResolver {
  restricted: AddressFilter,
}

impl Resolve for GuardedResolver {
  fn resolve(&self, name: Name) -> Resolving {
    let restricted = self.restricted;
    Box::pin(async move {
      let host = name.as_str().to_string();
      let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
      if let Some(addr) = addrs.iter().find(|addr| restricted(addr.ip())) {
        let refused = RestrictedAddress {
          host,
          ip: addr.ip(),
        };
        return Err(Box::new(refused) as Box<dyn StdError + Send + Sync>);
      }
      let addrs: Addrs = Box::new(addrs.into_iter());
      Ok::<_, Box<dyn StdError + Send + Sync>>(addrs)
    })
  }
}

fn guard_redirect(attempt: Attempt, restricted: AddressFilter) -> reqwest::redirect::Action {
  if attempt.previous().len() >= MAX_REDIRECTS {
    return attempt.error("too many redirects");
  }
  match check_literal(attempt.url(), restricted) {
    Ok(()) => attempt.follow(),
    Err(refused) => attempt.error(refused),
  }
}

/// A client whose every connection and redirect hop is checked against
/// `restricted`.
pub fn guarded_client(restricted: AddressFilter) -> reqwest::Result<Client> {
  Client::builder()
    .dns_resolver(Arc::new(GuardedResolver { restricted }))
    .redirect(Policy::custom(move |attempt| guard_redirect(attempt, restricted)))
    .build()
}

/// The refused address behind a transport error, if that is what failed.
pub fn restriction_of(error: &reqwest::Error) -> Option<&RestrictedAddress> {
  let mut source = error.source();
  while let Some(cause) = source {
    if let Some(refused) = cause.downcast_ref::<RestrictedAddress>() {
      return Some(refused);
    }
    source = cause.source();
  }
  None
}
