use hyper::HeaderMap;
use std::net::IpAddr;

/// Finds the address of the client behind reverse proxies.
///
/// The first configured header present in the request wins. With `recursive` the left-most
/// (original client) value of that header is used, otherwise the right-most one, which was
/// appended by the nearest proxy.
#[derive(Debug, Clone)]
pub struct ClientIpHeaders {
    names: Vec<String>,
    recursive: bool,
}

impl ClientIpHeaders {
    pub fn new(names: Vec<String>, recursive: bool) -> Self {
        Self { names, recursive }
    }

    pub fn client_ip(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let value = self
            .names
            .iter()
            .find_map(|name| {
                let values = headers.get_all(name);
                let mut values = values.iter();
                if self.recursive {
                    values.next()
                } else {
                    values.next_back()
                }
            })?
            .to_str()
            .ok()?;
        let mut split = value.split(',');
        let candidate = if self.recursive {
            split.next()
        } else {
            split.next_back()
        }?;
        candidate.trim().parse().ok()
    }

    pub fn client_ip_or(&self, headers: &HeaderMap, socket_ip: IpAddr) -> IpAddr {
        self.client_ip(headers).unwrap_or(socket_ip)
    }
}
