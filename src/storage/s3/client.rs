//! S3 client
//! Builds presigned URLs and runs object requests against them

use chrono::Utc;
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::storage::s3::request::{Method, Request, Response};
use crate::storage::s3::signer::{encode_path, Credentials, Signer};

/// Lifetime of the URLs the service signs for its own DELETE/HEAD calls
const REQUEST_URL_EXPIRES: Duration = Duration::from_secs(300);

/// Longest presigned URL lifetime S3 accepts
const MAX_URL_EXPIRES: u64 = 7 * 24 * 3600;

/// S3 client
#[derive(Debug, Clone)]
pub struct Client {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    bucket: String,
    region: String,
    /// Custom endpoint; when set, objects are addressed path-style
    endpoint: Option<Url>,
    http: reqwest::Client,
}

impl Client {
    /// Create a client for one bucket
    ///
    /// # Arguments
    /// - access_key_id / secret_access_key: IAM credentials
    /// - bucket: bucket name
    /// - region: e.g. us-east-1
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            http: reqwest::Client::new(),
        }
    }

    /// Use temporary credentials
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Talk to an S3-compatible endpoint instead of AWS
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid S3 endpoint {}: {}", endpoint, e)))?;
        if url.host_str().is_none() {
            return Err(AppError::Internal(format!(
                "S3 endpoint has no host: {}",
                endpoint
            )));
        }
        self.endpoint = Some(url);
        Ok(self)
    }

    /// Host the bucket is reached on
    pub fn get_host(&self) -> String {
        match &self.endpoint {
            Some(url) => {
                let host = url.host_str().unwrap_or_default();
                match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                }
            }
            None => format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    fn scheme(&self) -> &str {
        self.endpoint.as_ref().map(|url| url.scheme()).unwrap_or("https")
    }

    /// Unencoded request path for an object key
    pub fn get_path_from_object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self.endpoint {
            Some(_) => format!("/{}/{}", self.bucket, key),
            None => format!("/{}", key),
        }
    }

    /// Full URL for a request path
    pub fn get_full_url_from_path(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme(), self.get_host(), encode_path(path))
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            session_token: self.session_token.as_deref(),
        }
    }

    /// Presign a request for an object.
    ///
    /// `headers` are signed along with `host`; the caller of the URL has to
    /// send them with exactly these values.
    pub fn get_presigned_url(
        &self,
        method: &str,
        object_key: &str,
        headers: BTreeMap<String, String>,
        query: BTreeMap<String, String>,
        expires: Duration,
    ) -> String {
        let url_path = self.get_path_from_object_key(object_key);
        let mut headers = headers;
        headers.insert("host".to_string(), self.get_host());

        let expires = expires.as_secs().clamp(1, MAX_URL_EXPIRES);
        let signed_query = Signer::new(method, &url_path, headers, query).presign(
            self.credentials(),
            &self.region,
            expires,
            Utc::now(),
        );

        format!("{}?{}", self.get_full_url_from_path(&url_path), signed_query)
    }

    /// Presigned GetObject URL that makes browsers save the file
    pub fn get_presigned_download_url(&self, object_key: &str, expires: Duration) -> String {
        let mut query = BTreeMap::new();
        query.insert(
            "response-content-disposition".to_string(),
            "attachment".to_string(),
        );
        self.get_presigned_url("GET", object_key, BTreeMap::new(), query, expires)
    }

    /// Presigned PutObject URL bound to a content type and size
    pub fn get_presigned_upload_url(
        &self,
        object_key: &str,
        content_type: &str,
        content_length: u64,
        expires: Duration,
    ) -> String {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        headers.insert("content-length".to_string(), content_length.to_string());
        self.get_presigned_url("PUT", object_key, headers, BTreeMap::new(), expires)
    }

    /// DeleteObject. S3 answers 204 whether or not the key existed.
    pub async fn delete_object(&self, object_key: &str) -> Response {
        let url = self.signed_request_url(Method::Delete, object_key);
        self.make_response(Request::delete(&self.http, &url).await)
    }

    /// HeadObject
    pub async fn head_object(&self, object_key: &str) -> Response {
        let url = self.signed_request_url(Method::Head, object_key);
        self.make_response(Request::head(&self.http, &url).await)
    }

    fn signed_request_url(&self, method: Method, object_key: &str) -> String {
        self.get_presigned_url(
            method.as_str(),
            object_key,
            BTreeMap::new(),
            BTreeMap::new(),
            REQUEST_URL_EXPIRES,
        )
    }

    fn make_response(&self, resp: std::result::Result<Response, Response>) -> Response {
        resp.unwrap_or_else(|x| x)
    }
}
