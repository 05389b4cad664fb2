use crate::address::{parse_ipv4, AddressError, ReservedRange};
use crate::config::Config;
use crate::header_tools::ClientIpHeaders;
use crate::lookup::{GeoLocation, LookupError, UpstreamClient};
use crate::uri_tools::is_absolute;

use hyper::body::HttpBody;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::{Body, Method, Response, StatusCode, Uri};
use serde::Serialize;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Path {0:?} is not served")]
    NotFound(String),
    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),
    #[error("Request body is larger than {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error(r#"Request body has no string "ip" field"#)]
    MissingIp,
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("{address} belongs to reserved range {range}")]
    ReservedAddress {
        address: Ipv4Addr,
        range: ReservedRange,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Cannot read request body: {0}")]
    BodyRead(#[from] hyper::Error),
    #[error("Cannot serialize response: {0}")]
    Serialize(serde_json::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJson(_)
            | Self::MissingIp
            | Self::InvalidAddress(_)
            | Self::ReservedAddress { .. }
            | Self::Lookup(LookupError::MissingCoordinates(_)) => StatusCode::BAD_REQUEST,
            Self::Lookup(LookupError::NonSuccess { .. } | LookupError::Timeout(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Lookup(_) | Self::BodyRead(_) | Self::Serialize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to API users. Internal errors never expose their details.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "未找到".into(),
            Self::MethodNotAllowed(_) => "方法不允许".into(),
            Self::PayloadTooLarge(_) => "请求体过大".into(),
            Self::InvalidJson(_) => "请求体不是有效的JSON".into(),
            Self::MissingIp | Self::InvalidAddress(_) => "无效的IP地址格式".into(),
            Self::ReservedAddress { .. } => "不支持查询内网IP或保留地址".into(),
            Self::Lookup(LookupError::MissingCoordinates(_)) => "无法获取经纬度信息".into(),
            Self::Lookup(LookupError::NonSuccess { api, status }) => {
                format!("{}请求失败: {}", api.localized_name(), status.as_u16())
            }
            Self::Lookup(LookupError::Timeout(api)) => {
                format!("{}请求超时", api.localized_name())
            }
            Self::Lookup(_) | Self::BodyRead(_) | Self::Serialize(_) => "服务器内部错误".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InvalidConfigError {
    #[error(r#"path must start with "/", got {0:?}"#)]
    Path(String),
    #[error(r#"upstream URI "{0}" must be absolute"#)]
    RelativeUpstream(Uri),
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub ip: String,
    pub location: GeoLocation,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub struct QueryService {
    path: String,
    max_body_size: usize,
    ip_headers: ClientIpHeaders,
    response_headers: HeaderMap,
    upstream: UpstreamClient,
}

impl QueryService {
    pub fn from_config(config: Config) -> Result<Self, InvalidConfigError> {
        let Config {
            path,
            max_body_size,
            ip_headers,
            ip_headers_recursive,
            response_headers,
            upstream_timeout,
            upstream: upstream_config,
            ..
        } = config;

        if !path.starts_with('/') {
            return Err(InvalidConfigError::Path(path));
        }
        for uri in [&upstream_config.ip_location, &upstream_config.detail] {
            if !is_absolute(uri) {
                return Err(InvalidConfigError::RelativeUpstream(uri.clone()));
            }
        }

        let upstream = UpstreamClient::new(
            upstream_config.ip_location,
            upstream_config.detail,
            upstream_timeout.into(),
        );

        Ok(Self {
            path,
            max_body_size: max_body_size.get(),
            ip_headers: ClientIpHeaders::new(ip_headers, ip_headers_recursive),
            response_headers,
            upstream,
        })
    }
}

impl QueryService {
    pub fn client_ip(&self, headers: &HeaderMap, socket_ip_addr: IpAddr) -> IpAddr {
        self.ip_headers.client_ip_or(headers, socket_ip_addr)
    }

    /// Answers a request, errors included.
    ///
    /// Once the body has been decoded, the `ip` it asked for is attached to the response as a
    /// [`QueriedIp`] extension for the access log.
    pub async fn handle(&self, parts: &Parts, body: Body) -> Response<Body> {
        let mut queried_ip = None;
        let mut response = match self.response(parts, body, &mut queried_ip).await {
            Ok(response) => response,
            Err(error) => self.make_error_response(error),
        };
        if let Some(ip) = queried_ip {
            response.extensions_mut().insert(QueriedIp(ip));
        }
        response
    }

    pub async fn response(
        &self,
        parts: &Parts,
        body: Body,
        queried_ip: &mut Option<String>,
    ) -> Result<Response<Body>, ServiceError> {
        if parts.uri.path() != self.path {
            return Err(ServiceError::NotFound(parts.uri.path().to_owned()));
        }
        if parts.method != Method::POST {
            return Err(ServiceError::MethodNotAllowed(parts.method.clone()));
        }

        let body = self.read_body(body).await?;
        let request: Value = serde_json::from_slice(&body).map_err(ServiceError::InvalidJson)?;
        let ip = request
            .get("ip")
            .and_then(Value::as_str)
            .ok_or(ServiceError::MissingIp)?;
        *queried_ip = Some(ip.to_owned());

        let address = parse_ipv4(ip)?;
        if let Some(range) = ReservedRange::find(address) {
            return Err(ServiceError::ReservedAddress { address, range });
        }

        log::debug!("looking up {address}");
        let ip_location = self.upstream.locate(address).await?;
        let detail = self
            .upstream
            .detail(&ip_location.lat, &ip_location.lng)
            .await?;

        let query_response = QueryResponse {
            ip: ip.to_owned(),
            location: ip_location.with_detail(detail),
        };
        let body = serde_json::to_vec(&query_response).map_err(ServiceError::Serialize)?;
        Ok(self.json_response(StatusCode::OK, body))
    }

    async fn read_body(&self, mut body: Body) -> Result<Vec<u8>, ServiceError> {
        if body.size_hint().lower() > self.max_body_size as u64 {
            return Err(ServiceError::PayloadTooLarge(self.max_body_size));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > self.max_body_size {
                return Err(ServiceError::PayloadTooLarge(self.max_body_size));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    pub fn make_error_response(&self, error: ServiceError) -> Response<Body> {
        let status = error.status();
        if status.is_server_error() {
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                log::error!("{error}");
            } else {
                log::warn!("{error}");
            }
        }
        let error_response = ErrorResponse {
            error: error.user_message(),
        };
        // A struct with a single string field always serializes
        let body = serde_json::to_vec(&error_response).unwrap_or_default();
        self.json_response(status, body)
    }

    fn json_response(&self, status: StatusCode, body: Vec<u8>) -> Response<Body> {
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        for (name, value) in &self.response_headers {
            headers.insert(name, value.clone());
        }
        response
    }
}

/// `ip` field of a request, as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueriedIp(pub String);

fn access_log_line(client_ip_addr: IpAddr, parts: &Parts, response: &Response<Body>) -> String {
    format!(
        "{} {} {} {} {}",
        client_ip_addr,
        parts.method,
        parts.uri,
        response.status(),
        response
            .extensions()
            .get::<QueriedIp>()
            .map_or("-", |queried_ip| queried_ip.0.as_str()),
    )
}

pub fn log_response(client_ip_addr: IpAddr, parts: &Parts, response: &Response<Body>) {
    log::info!("{}", access_log_line(client_ip_addr, parts, response));
}
