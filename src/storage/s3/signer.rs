//! S3 request signing.
//! AWS Signature Version 4, query-string (presigned URL) form.
//! Reference: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use urlencoding::encode;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Access key pair, plus the session token for temporary credentials
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
}

/// Presigned URL signer
pub struct Signer<'a> {
    method: &'a str,
    url_path: &'a str,
    /// Lowercase header name -> value. Must contain `host`.
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
}

impl<'a> Signer<'a> {
    pub fn new(
        method: &'a str,
        url_path: &'a str,
        headers: BTreeMap<String, String>,
        query: BTreeMap<String, String>,
    ) -> Self {
        Self {
            method,
            url_path,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            query,
        }
    }

    fn signed_headers(&self) -> String {
        self.headers.keys().cloned().collect::<Vec<String>>().join(";")
    }

    fn canonical_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect()
    }

    fn canonical_request(&self, query: &BTreeMap<String, String>) -> String {
        [
            self.method.to_uppercase(),
            encode_path(self.url_path),
            encode_query(query),
            self.canonical_headers(),
            self.signed_headers(),
            UNSIGNED_PAYLOAD.to_string(),
        ]
        .join("\n")
    }

    /// Sign the request and return the complete query string, signature included.
    ///
    /// `expires` is in seconds; S3 accepts 1 to 604800.
    pub fn presign(
        &self,
        credentials: Credentials<'_>,
        region: &str,
        expires: u64,
        now: DateTime<Utc>,
    ) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/s3/aws4_request", date_stamp, region);

        let mut query = self.query.clone();
        query.insert("X-Amz-Algorithm".to_string(), ALGORITHM.to_string());
        query.insert(
            "X-Amz-Credential".to_string(),
            format!("{}/{}", credentials.access_key_id, scope),
        );
        query.insert("X-Amz-Date".to_string(), amz_date.clone());
        query.insert("X-Amz-Expires".to_string(), expires.to_string());
        if let Some(token) = credentials.session_token {
            query.insert("X-Amz-Security-Token".to_string(), token.to_string());
        }
        query.insert("X-Amz-SignedHeaders".to_string(), self.signed_headers());

        let canonical_request = self.canonical_request(&query);
        let string_to_sign = [
            ALGORITHM.to_string(),
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes())),
        ]
        .join("\n");

        let signing_key = signing_key(credentials.secret_access_key, &date_stamp, region);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        query.insert("X-Amz-Signature".to_string(), signature);
        encode_query(&query)
    }
}

/// URI-encode every path segment, keeping the `/` separators
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<String>>()
        .join("/")
}

// Keys are sorted as stored. Every key used here is unreserved, so the raw
// order matches the encoded order.
fn encode_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<String>>()
        .join("&")
}

fn signing_key(secret_access_key: &str, date_stamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_access_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, b"s3");
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
