//! # Firestore Record Store
//!
//! [`RecordStore`] over the Firestore REST API.
//!
//! ## Document Layout
//! ```text
//!   projects/{project}/databases/(default)/documents/scans/{auto-id}
//!   {
//!     "fields": {
//!       "data": { "stringValue":    "https://example.com" },
//!       "date": { "timestampValue": "2026-10-18T09:12:44.120301Z" },
//!       "uid":  { "stringValue":    "U1" }
//!     }
//!   }
//!
//!   save          POST …/documents/scans                 → name → id
//!   list_by_owner POST …/documents:runQuery
//!                   from scans  where uid == owner  order by date desc
//! ```
//!
//! Every request carries the signed-in user's ID token as a bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use scanvault_core::error::PersistenceResult;
use scanvault_core::{ScanRecord, SCANS_COLLECTION};
use scanvault_db::RecordStore;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::{join, FirebaseConfig, FirebaseEndpoints};
use crate::error::{CloudError, CloudResult};
use crate::firebase_auth::{read_json, TokenSource};

const FIELD_DATA: &str = "data";
const FIELD_DATE: &str = "date";
const FIELD_UID: &str = "uid";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<Document>,
}

// =============================================================================
// Encoding
// =============================================================================

/// Request body for creating a scan document.
pub fn encode_record(owner_id: &str, payload: &str, saved_at: DateTime<Utc>) -> Value {
    json!({
        "fields": {
            "data": { "stringValue": payload },
            "date": { "timestampValue": saved_at.to_rfc3339_opts(SecondsFormat::Micros, true) },
            "uid": { "stringValue": owner_id },
        }
    })
}

/// `runQuery` body selecting one owner's scans, newest first.
pub fn owner_query(collection: &str, owner_id: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "uid" },
                    "op": "EQUAL",
                    "value": { "stringValue": owner_id }
                }
            },
            "orderBy": [{
                "field": { "fieldPath": "date" },
                "direction": "DESCENDING"
            }]
        }
    })
}

/// Document id: the last segment of the resource name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn string_field<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key)?.get("stringValue")?.as_str()
}

/// Reads `date` as a timestamp, or as an RFC 3339 string written by older
/// clients.
fn date_field(fields: &serde_json::Map<String, Value>) -> Option<DateTime<Utc>> {
    let value = fields.get(FIELD_DATE)?;
    let raw = value
        .get("timestampValue")
        .or_else(|| value.get("stringValue"))?
        .as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn decode_document(doc: &Document) -> Option<ScanRecord> {
    Some(ScanRecord {
        id: document_id(&doc.name).to_string(),
        payload: string_field(&doc.fields, FIELD_DATA)?.to_string(),
        saved_at: date_field(&doc.fields)?,
        owner_id: string_field(&doc.fields, FIELD_UID)?.to_string(),
    })
}

/// Decodes a `runQuery` response for `owner_id`.
///
/// Rows without a document (progress markers) are skipped, as are documents
/// that are malformed or belong to someone else. The result is newest first;
/// equal timestamps are ordered by server creation time, newest first.
pub fn decode_query_response(rows: Vec<Value>, owner_id: &str) -> Vec<ScanRecord> {
    let mut decoded: Vec<(ScanRecord, Option<DateTime<Utc>>)> = rows
        .into_iter()
        .filter_map(|row| serde_json::from_value::<QueryRow>(row).ok()?.document)
        .filter_map(|doc| match decode_document(&doc) {
            Some(record) => Some((record, doc.create_time)),
            None => {
                warn!(name = %doc.name, "Skipping malformed scan document");
                None
            }
        })
        .filter(|(record, _)| record.owner_id == owner_id)
        .collect();

    decoded.sort_by(|(a, a_created), (b, b_created)| {
        b.saved_at
            .cmp(&a.saved_at)
            .then_with(|| b_created.cmp(a_created))
    });
    decoded.into_iter().map(|(record, _)| record).collect()
}

// =============================================================================
// Store
// =============================================================================

pub struct FirestoreRecordStore {
    http: reqwest::Client,
    documents_url: Url,
    collection: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreRecordStore {
    pub fn new(
        config: &FirebaseConfig,
        endpoints: &FirebaseEndpoints,
        tokens: Arc<dyn TokenSource>,
    ) -> CloudResult<Self> {
        let documents_url = join(
            &endpoints.firestore,
            &format!(
                "v1/projects/{}/databases/(default)/documents",
                config.project_id
            ),
        )?;

        Ok(FirestoreRecordStore {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            documents_url,
            collection: SCANS_COLLECTION.to_string(),
            tokens,
        })
    }

    /// Uses a collection other than `scans`.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    async fn create(&self, owner_id: &str, payload: &str) -> CloudResult<String> {
        let token = self.tokens.bearer_token().await?;
        let url = join(&self.documents_url, &self.collection)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&encode_record(owner_id, payload, Utc::now()))
            .send()
            .await?;
        let doc: Document = read_json(response).await?;

        let id = document_id(&doc.name);
        if id.is_empty() {
            return Err(CloudError::Decode("document name is empty".to_string()));
        }
        Ok(id.to_string())
    }

    async fn query(&self, owner_id: &str) -> CloudResult<Vec<ScanRecord>> {
        let token = self.tokens.bearer_token().await?;
        let url = Url::parse(&format!(
            "{}:runQuery",
            self.documents_url.as_str().trim_end_matches('/')
        ))
        .map_err(|e| CloudError::InvalidUrl(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&owner_query(&self.collection, owner_id))
            .send()
            .await?;
        let rows: Vec<Value> = read_json(response).await?;

        Ok(decode_query_response(rows, owner_id))
    }
}

#[async_trait]
impl RecordStore for FirestoreRecordStore {
    async fn save(&self, owner_id: &str, payload: &str) -> PersistenceResult<String> {
        let id = self.create(owner_id, payload).await.map_err(|e| {
            warn!(error = %e, "Firestore write failed");
            e.into_write_error()
        })?;
        debug!(id = %id, "Document written");
        Ok(id)
    }

    async fn list_by_owner(&self, owner_id: &str) -> PersistenceResult<Vec<ScanRecord>> {
        let records = self.query(owner_id).await.map_err(|e| {
            warn!(error = %e, "Firestore query failed");
            e.into_read_error()
        })?;
        debug!(count = records.len(), "Documents listed");
        Ok(records)
    }

    fn backend(&self) -> &'static str {
        "firestore"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scanvault_core::PersistenceError;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

    struct FixedToken(Option<&'static str>);

    #[async_trait]
    impl TokenSource for FixedToken {
        async fn bearer_token(&self) -> CloudResult<String> {
            self.0.map(str::to_string).ok_or(CloudError::NotSignedIn)
        }
    }

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: "k".to_string(),
            auth_domain: "demo.firebaseapp.com".to_string(),
            project_id: "demo".to_string(),
            storage_bucket: "demo.appspot.com".to_string(),
            messaging_sender_id: "1".to_string(),
            app_id: "a".to_string(),
            measurement_id: None,
        }
    }

    fn store(server: &MockServer, token: Option<&'static str>) -> FirestoreRecordStore {
        let endpoints = FirebaseEndpoints::single(&server.uri()).unwrap();
        FirestoreRecordStore::new(&config(), &endpoints, Arc::new(FixedToken(token))).unwrap()
    }

    fn doc(id: &str, data: &str, date: &str, uid: &str, created: &str) -> Value {
        json!({
            "document": {
                "name": format!("projects/demo/databases/(default)/documents/scans/{id}"),
                "fields": {
                    "data": { "stringValue": data },
                    "date": { "timestampValue": date },
                    "uid": { "stringValue": uid }
                },
                "createTime": created,
                "updateTime": created
            },
            "readTime": "2026-10-18T10:00:00Z"
        })
    }

    #[test]
    fn test_encode_record_fields() {
        let at = DateTime::parse_from_rfc3339("2026-10-18T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let body = encode_record("U1", "hello", at);
        assert_eq!(body["fields"]["data"]["stringValue"], "hello");
        assert_eq!(body["fields"]["uid"]["stringValue"], "U1");
        assert_eq!(
            body["fields"]["date"]["timestampValue"],
            "2026-10-18T09:00:00.000000Z"
        );
    }

    #[test]
    fn test_decode_skips_foreign_and_empty_rows() {
        let rows = vec![
            json!({ "readTime": "2026-10-18T10:00:00Z" }),
            doc("a", "mine", "2026-10-18T09:00:00Z", "U1", "2026-10-18T09:00:00Z"),
            doc("b", "theirs", "2026-10-18T09:30:00Z", "U2", "2026-10-18T09:30:00Z"),
            json!({ "document": { "name": "x/scans/c", "fields": { "data": { "stringValue": "no uid" } } } }),
        ];
        let records = decode_query_response(rows, "U1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[test]
    fn test_decode_orders_newest_first_with_creation_tiebreak() {
        let rows = vec![
            doc("old", "1", "2026-10-18T08:00:00Z", "U1", "2026-10-18T08:00:00Z"),
            doc("tie-a", "2", "2026-10-18T09:00:00Z", "U1", "2026-10-18T09:00:00.100Z"),
            doc("tie-b", "3", "2026-10-18T09:00:00Z", "U1", "2026-10-18T09:00:00.200Z"),
        ];
        let ids: Vec<_> = decode_query_response(rows, "U1")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["tie-b", "tie-a", "old"]);
    }

    #[test]
    fn test_decode_accepts_string_dates() {
        let row = json!({
            "document": {
                "name": "p/scans/s1",
                "fields": {
                    "data": { "stringValue": "x" },
                    "date": { "stringValue": "2026-10-18T09:00:00+02:00" },
                    "uid": { "stringValue": "U1" }
                }
            }
        });
        let records = decode_query_response(vec![row], "U1");
        assert_eq!(records[0].saved_at.to_rfc3339(), "2026-10-18T07:00:00+00:00");
    }

    #[tokio::test]
    async fn test_save_posts_document_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}/scans")))
            .and(header("authorization", "Bearer id-U1"))
            .and(body_partial_json(json!({
                "fields": {
                    "data": { "stringValue": "https://example.com" },
                    "uid": { "stringValue": "U1" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo/databases/(default)/documents/scans/abc123",
                "fields": {},
                "createTime": "2026-10-18T09:00:00Z",
                "updateTime": "2026-10-18T09:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = store(&server, Some("id-U1"))
            .save("U1", "https://example.com")
            .await
            .unwrap();
        assert_eq!(id, "abc123");
    }

    #[tokio::test]
    async fn test_list_runs_owner_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .and(body_partial_json(json!({
                "structuredQuery": {
                    "where": { "fieldFilter": { "value": { "stringValue": "U1" } } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                doc("n", "new", "2026-10-18T09:00:00Z", "U1", "2026-10-18T09:00:00Z"),
                doc("o", "old", "2026-10-17T09:00:00Z", "U1", "2026-10-17T09:00:00Z"),
            ])))
            .mount(&server)
            .await;

        let records = store(&server, Some("t")).list_by_owner("U1").await.unwrap();
        let payloads: Vec<_> = records.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, ["new", "old"]);
    }

    #[tokio::test]
    async fn test_permission_denied_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = store(&server, Some("t")).save("U1", "x").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_bad_request_is_write_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "Invalid value", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = store(&server, Some("t")).save("U1", "x").await.unwrap_err();
        assert!(matches!(err, PersistenceError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn test_signed_out_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = store(&server, None).save("U1", "x").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Unauthorized(_)));
    }
}
