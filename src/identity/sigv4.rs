//! AWS Signature Version 4.
//!
//! # Responsibilities
//! - Build canonical requests and strings to sign
//! - Derive the per-day signing key
//! - Sign form POSTs (Authorization header) and presign GETs (query string)
//!
//! # Design Decisions
//! - Signing time is always passed in, so signatures are reproducible
//! - Header names are lowercased and sorted through a `BTreeMap`

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{HlbError, HlbResult};
use crate::identity::types::AwsCredentials;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of the empty string.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

/// Where and when a request is signed.
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningScope<'_> {
    pub fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    pub fn date(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    pub fn credential_scope(&self) -> String {
        format!("{}/{}/{}/aws4_request", self.date(), self.region, self.service)
    }
}

/// Output of a signing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// `;`-joined lowercase header names covered by the signature.
    pub signed_headers: String,
    /// Lowercase hex signature.
    pub signature: String,
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> HlbResult<Vec<u8>> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key)
        .map_err(|e| HlbError::Credentials(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key for a date, region and service.
pub fn signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> HlbResult<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_access_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding as SigV4 requires (only `A-Za-z0-9-_.~` left as is).
fn uri_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Canonical query string: encoded pairs sorted by key then value.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical request per the SigV4 specification.
///
/// Returns the request text and the signed-headers list.
pub fn canonical_request(
    method: &str,
    path: &str,
    params: &[(String, String)],
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> (String, String) {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        canonical_query(params),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    (request, signed_headers)
}

pub fn string_to_sign(scope: &SigningScope<'_>, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        scope.amz_date(),
        scope.credential_scope(),
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Sign a request described by its canonical parts.
///
/// `headers` keys must already be lowercase.
pub fn sign(
    credentials: &AwsCredentials,
    scope: &SigningScope<'_>,
    method: &str,
    path: &str,
    params: &[(String, String)],
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> HlbResult<Signature> {
    let (request, signed_headers) = canonical_request(method, path, params, headers, payload_hash);
    let to_sign = string_to_sign(scope, &request);
    let key = signing_key(
        &credentials.secret_access_key,
        &scope.date(),
        scope.region,
        scope.service,
    )?;

    Ok(Signature {
        signed_headers,
        signature: hex::encode(hmac_sha256(&key, to_sign.as_bytes())?),
    })
}

/// Value for the `Host` header as an HTTP client will send it.
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Headers to attach to a signed `application/x-www-form-urlencoded` POST.
pub fn sign_form_post(
    credentials: &AwsCredentials,
    scope: &SigningScope<'_>,
    url: &Url,
    body: &str,
) -> HlbResult<Vec<(&'static str, String)>> {
    let content_type = "application/x-www-form-urlencoded; charset=utf-8".to_string();
    let amz_date = scope.amz_date();

    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), content_type.clone());
    headers.insert("host".to_string(), host_header(url));
    headers.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = &credentials.session_token {
        headers.insert("x-amz-security-token".to_string(), token.clone());
    }

    let signature = sign(
        credentials,
        scope,
        "POST",
        canonical_path(url),
        &[],
        &headers,
        &sha256_hex(body.as_bytes()),
    )?;

    let mut out = vec![
        ("content-type", content_type),
        ("x-amz-date", amz_date),
        (
            "authorization",
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM,
                credentials.access_key_id,
                scope.credential_scope(),
                signature.signed_headers,
                signature.signature
            ),
        ),
    ];
    if let Some(token) = &credentials.session_token {
        out.push(("x-amz-security-token", token.clone()));
    }
    Ok(out)
}

/// Presign a GET request, returning the URL with the signature in its query.
///
/// `extra_headers` are signed (so the server must see the same values) but
/// are not part of the URL.
pub fn presign_get(
    credentials: &AwsCredentials,
    scope: &SigningScope<'_>,
    url: &Url,
    params: &[(&str, &str)],
    extra_headers: &[(&str, &str)],
    expires_secs: u64,
) -> HlbResult<Url> {
    let mut headers = BTreeMap::new();
    headers.insert("host".to_string(), host_header(url));
    for (name, value) in extra_headers {
        headers.insert(name.to_ascii_lowercase(), value.to_string());
    }
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let mut query: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    query.push(("X-Amz-Algorithm".into(), ALGORITHM.into()));
    query.push((
        "X-Amz-Credential".into(),
        format!("{}/{}", credentials.access_key_id, scope.credential_scope()),
    ));
    query.push(("X-Amz-Date".into(), scope.amz_date()));
    query.push(("X-Amz-Expires".into(), expires_secs.to_string()));
    query.push(("X-Amz-SignedHeaders".into(), signed_headers));
    if let Some(token) = &credentials.session_token {
        query.push(("X-Amz-Security-Token".into(), token.clone()));
    }

    let signature = sign(
        credentials,
        scope,
        "GET",
        canonical_path(url),
        &query,
        &headers,
        EMPTY_PAYLOAD_SHA256,
    )?;
    query.push(("X-Amz-Signature".into(), signature.signature));

    let mut presigned = url.clone();
    presigned.set_query(Some(&canonical_query(&query)));
    Ok(presigned)
}

fn canonical_path(url: &Url) -> &str {
    match url.path() {
        "" => "/",
        path => path,
    }
}
