pub use error::LookupError;
pub use location::{Coordinate, GeoLocation, IpLocation};

mod error;
mod location;

use crate::uri_tools::compose_uri;
use location::detail_from_body;

use hyper::client::HttpConnector;
use hyper::header::ACCEPT;
use hyper::{Body, Client, Request, Uri};
use hyper_tls::HttpsConnector;
use serde_json::Value;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Third-party services asked during a single query.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Api {
    IpLocation,
    Detail,
}

impl Api {
    /// Name shown to API users in error messages
    pub fn localized_name(self) -> &'static str {
        match self {
            Self::IpLocation => "地理位置API",
            Self::Detail => "详细地址API",
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IpLocation => "IP location API",
            Self::Detail => "address detail API",
        })
    }
}

/// Client for the IP geolocation and reverse-geocoding services.
///
/// Every call is bounded by `timeout`, which covers both waiting for the response head and
/// reading the body.
pub struct UpstreamClient {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    ip_location_uri: Uri,
    detail_uri: Uri,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(ip_location_uri: Uri, detail_uri: Uri, timeout: Duration) -> Self {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);
        Self {
            client,
            ip_location_uri,
            detail_uri,
            timeout,
        }
    }

    /// Coordinates and administrative division of an address.
    pub async fn locate(&self, ip: Ipv4Addr) -> Result<IpLocation, LookupError> {
        let api = Api::IpLocation;
        let uri = compose_uri(&self.ip_location_uri, "", &format!("rgeo=true&ip={ip}"))?;
        let body = self.get_json(api, uri).await?;
        IpLocation::from_body(&body).ok_or(LookupError::MissingCoordinates(api))
    }

    /// Human-readable address of a point, empty if the service knows nothing about it.
    pub async fn detail(&self, lat: &Coordinate, lng: &Coordinate) -> Result<String, LookupError> {
        let uri = compose_uri(&self.detail_uri, &format!("/{lat},{lng}"), "tag=0")?;
        let body = self.get_json(Api::Detail, uri).await?;
        Ok(detail_from_body(&body))
    }

    /// Any well-formed JSON is accepted, its shape is checked by the caller.
    async fn get_json(&self, api: Api, uri: Uri) -> Result<Value, LookupError> {
        log::debug!(r#"{api}: GET "{uri}""#);
        let request = Request::builder()
            .uri(uri)
            .header(ACCEPT, "application/json")
            .body(Body::empty())?;
        let body = tokio::time::timeout(self.timeout, async {
            let response = self.client.request(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LookupError::NonSuccess { api, status });
            }
            Ok(hyper::body::to_bytes(response.into_body()).await?)
        })
        .await
        .map_err(|_| LookupError::Timeout(api))??;
        serde_json::from_slice(&body).map_err(|error| LookupError::InvalidJson { api, error })
    }
}
