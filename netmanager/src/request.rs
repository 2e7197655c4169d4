//! Request and response values.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{NetworkError, NetworkResult};

/// An HTTP request to be run by the manager.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a request, validating the URL.
    pub fn new(method: Method, url: &str) -> NetworkResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| NetworkError::InvalidRequest(format!("invalid URL {:?}: {}", url, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NetworkError::InvalidRequest(format!(
                    "unsupported scheme {:?} in {}",
                    other, url
                )))
            }
        }

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        })
    }

    pub fn get(url: &str) -> NetworkResult<Self> {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> NetworkResult<Self> {
        Self::new(Method::POST, url)
    }

    pub fn head(url: &str) -> NetworkResult<Self> {
        Self::new(Method::HEAD, url)
    }

    /// Add a header. Invalid names or values are rejected.
    pub fn with_header(mut self, name: &str, value: &str) -> NetworkResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| NetworkError::InvalidRequest(format!("header {}: {}", name, e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Override the manager-wide timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            url,
            status,
            headers,
            body,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> NetworkResult<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| NetworkError::Decode {
            url: self.url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> NetworkResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| NetworkError::Decode {
            url: self.url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn response(body: &'static [u8]) -> Response {
        Response::new(
            Url::parse("http://example.com/item").unwrap(),
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(body),
        )
    }

    #[test]
    fn test_request_get() {
        let request = Request::get("https://example.com/a?b=c").unwrap();
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.url().path(), "/a");
        assert!(request.body().is_none());
        assert!(request.timeout().is_none());
    }

    #[test]
    fn test_request_invalid_url() {
        let err = Request::get("not a url").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));
        assert_eq!(err.code().value(), 1);
    }

    #[test]
    fn test_request_rejects_other_schemes() {
        let err = Request::get("ftp://example.com/file").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_request_builders() {
        let request = Request::post("http://example.com/upload")
            .unwrap()
            .with_header("x-trace", "abc")
            .unwrap()
            .with_body(vec![1u8, 2, 3])
            .with_timeout(Duration::from_secs(5));

        assert_eq!(request.headers()["x-trace"], "abc");
        assert_eq!(request.body().map(|b| b.len()), Some(3));
        assert_eq!(request.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_request_bad_header() {
        let err = Request::get("http://example.com")
            .unwrap()
            .with_header("bad header", "v")
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));
    }

    #[test]
    fn test_response_json() {
        #[derive(Deserialize)]
        struct Item {
            id: u32,
        }

        let item: Item = response(br#"{"id": 7}"#).json().unwrap();
        assert_eq!(item.id, 7);
    }

    #[test]
    fn test_response_json_decode_error() {
        let err = response(b"{oops").json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.code().value(), 6);
    }

    #[test]
    fn test_response_text() {
        assert_eq!(response(b"hello").text().unwrap(), "hello");
        assert!(response(&[0xff, 0xfe]).text().is_err());
    }
}
