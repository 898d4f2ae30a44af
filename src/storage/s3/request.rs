//! HTTP request wrapper for S3 calls

use reqwest::StatusCode;
use std::fmt::Display;

/// Error category of a finished request
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrNo {
    SUCCESS = 0,
    OTHER = 10000,
    /// Non-2xx HTTP status
    STATUS = 10001,
    DECODE = 10002,
    CONNECT = 10003,
}

impl Display for ErrNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#?}", self)
    }
}

/// Outcome of an S3 request
#[derive(Debug, Clone)]
pub struct Response {
    pub error_no: ErrNo,
    pub error_message: String,
    /// HTTP status, absent when no response was received
    pub status: Option<StatusCode>,
    pub result: Vec<u8>,
}

impl From<reqwest::Error> for Response {
    fn from(value: reqwest::Error) -> Self {
        let mut e = ErrNo::OTHER;
        if value.is_status() {
            e = ErrNo::STATUS;
        } else if value.is_connect() {
            e = ErrNo::CONNECT;
        } else if value.is_decode() {
            e = ErrNo::DECODE;
        }
        Response {
            error_no: e,
            error_message: value.to_string(),
            status: value.status(),
            result: Vec::new(),
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.error_no,
            self.error_message,
            String::from_utf8_lossy(&self.result)
        )
    }
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.error_no == ErrNo::SUCCESS
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(StatusCode::NOT_FOUND)
    }
}

/// Request methods used against presigned URLs
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Method {
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

/// HTTP request helper
pub struct Request;

impl Request {
    /// Send a HEAD request
    pub async fn head(client: &reqwest::Client, url: &str) -> Result<Response, Response> {
        Request::do_req(client, Method::Head, url).await
    }

    /// Send a DELETE request
    pub async fn delete(client: &reqwest::Client, url: &str) -> Result<Response, Response> {
        Request::do_req(client, Method::Delete, url).await
    }

    async fn do_req(
        client: &reqwest::Client,
        method: Method,
        url: &str,
    ) -> Result<Response, Response> {
        let req = match method {
            Method::Delete => client.delete(url),
            Method::Head => client.head(url),
        };

        let resp = req.send().await?;
        let status_code = resp.status();
        let mut error_no = ErrNo::SUCCESS;
        let mut message = String::new();

        if status_code.is_client_error() || status_code.is_server_error() {
            error_no = ErrNo::STATUS;
            message = status_code.to_string();
        }

        Ok(Response {
            error_no,
            error_message: message,
            status: Some(status_code),
            result: resp.bytes().await?.to_vec(),
        })
    }
}
