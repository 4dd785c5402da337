//! REST-backed store.
//!
//! Talks to `{base_url}/students` with JSON bodies in the wire shape. Response
//! bodies of failed requests are passed to the user verbatim.

use crate::{
    errors::{Error, Result},
    mapping::{WirePayload, WireRow, changes_from_wire, insert_payload, update_payload},
    models::{StudentChanges, StudentInput, StudentPatch, StudentRecord},
    store::StudentStore,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, instrument, trace};

const COLLECTION: &str = "students";

/// Student store over HTTP.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: Url,
}

/// Maps a non-success response to the error the user sees.
fn status_error(status: StatusCode, body: String, id: Option<&str>) -> Error {
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    match status {
        StatusCode::NOT_FOUND => Error::NotFound {
            id: id.unwrap_or_default().to_string(),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Validation {
                field: None,
                message,
            }
        }
        _ => Error::Transport { message },
    }
}

fn decode_row(body: &str) -> Result<StudentRecord> {
    serde_json::from_str::<WireRow>(body)?.try_into()
}

impl RestStore {
    /// Creates a store rooted at `base_url`, e.g. `https://api.example.com/v1`.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("Invalid API URL '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("API URL '{base_url}' cannot have paths appended"),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        info!("REST store ready at {}", base_url);
        Ok(Self { client, base_url })
    }

    fn url(&self, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(COLLECTION);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    /// Sends `request` and returns the body of a successful response.
    async fn execute(&self, request: RequestBuilder, id: Option<&str>) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!("HTTP {} with {} byte body", status, body.len());
        if status.is_success() {
            Ok(body)
        } else {
            debug!("Request failed with {}: {}", status, body);
            Err(status_error(status, body, id))
        }
    }
}

#[async_trait]
impl StudentStore for RestStore {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<StudentRecord>> {
        let body = self
            .execute(self.client.get(self.url(None)), None)
            .await?;
        let rows: Vec<WireRow> = serde_json::from_str(&body)?;
        debug!("Fetched {} student rows", rows.len());
        rows.into_iter().map(StudentRecord::try_from).collect()
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create(&self, input: &StudentInput) -> Result<StudentRecord> {
        let payload = insert_payload(input);
        let body = self
            .execute(self.client.post(self.url(None)).json(&payload), None)
            .await?;
        let record = decode_row(&body)?;
        info!("Created student {}", record.id);
        Ok(record)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: &StudentPatch) -> Result<Option<StudentChanges>> {
        let payload = update_payload(patch);
        trace!("Update payload for {}: {:?}", id, payload);
        let body = self
            .execute(self.client.put(self.url(Some(id))).json(&payload), Some(id))
            .await?;
        if body.trim().is_empty() {
            debug!("Update of {} confirmed without a body", id);
            return Ok(None);
        }
        // Servers may echo only the columns they changed.
        let echoed: WirePayload = serde_json::from_str(&body)?;
        changes_from_wire(&echoed).map(Some)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        self.execute(self.client.delete(self.url(Some(id))), Some(id))
            .await?;
        info!("Deleted student {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::Belt;
    use crate::test_utils::{ana_lima, serve_api};
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode as Status,
        routing::{get, put},
    };
    use chrono::Utc;
    use serde_json::{Map, Value, json};
    use std::sync::{Arc, Mutex};

    type Rows = Arc<Mutex<Vec<Map<String, Value>>>>;
    type Reply<T> = std::result::Result<T, (Status, String)>;

    async fn list_rows(State(rows): State<Rows>) -> Json<Vec<Map<String, Value>>> {
        Json(rows.lock().unwrap().clone())
    }

    async fn create_row(
        State(rows): State<Rows>,
        Json(mut body): Json<Map<String, Value>>,
    ) -> Reply<(Status, Json<Map<String, Value>>)> {
        let blank = body
            .get("name")
            .and_then(Value::as_str)
            .is_none_or(|name| name.trim().is_empty());
        if blank {
            return Err((Status::UNPROCESSABLE_ENTITY, "name is required".to_string()));
        }
        let mut rows = rows.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        body.insert("id".to_string(), json!(format!("row-{}", rows.len() + 1)));
        body.insert("created_at".to_string(), json!(now));
        body.insert("updated_at".to_string(), json!(now));
        rows.insert(0, body.clone());
        Ok((Status::CREATED, Json(body)))
    }

    async fn update_row(
        State(rows): State<Rows>,
        Path(id): Path<String>,
        Json(patch): Json<Map<String, Value>>,
    ) -> Reply<Json<Map<String, Value>>> {
        let mut rows = rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.get("id") == Some(&json!(id)))
            .ok_or((Status::NOT_FOUND, String::new()))?;
        row.extend(patch);
        Ok(Json(row.clone()))
    }

    async fn delete_row(State(rows): State<Rows>, Path(id): Path<String>) -> Reply<Status> {
        let mut rows = rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(&json!(id)));
        if rows.len() == before {
            return Err((Status::NOT_FOUND, String::new()));
        }
        Ok(Status::NO_CONTENT)
    }

    fn api(rows: Rows) -> Router {
        Router::new()
            .route("/api/students", get(list_rows).post(create_row))
            .route("/api/students/{id}", put(update_row).delete(delete_row))
            .with_state(rows)
    }

    async fn store_with(rows: Rows) -> RestStore {
        RestStore::new(&serve_api(api(rows)).await, None).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let not_found = status_error(Status::NOT_FOUND, String::new(), Some("s1"));
        assert!(matches!(not_found, Error::NotFound { id } if id == "s1"));

        let conflict = status_error(Status::CONFLICT, "duplicate".to_string(), None);
        assert!(matches!(conflict, Error::Validation { message, .. } if message == "duplicate"));

        let unavailable = status_error(Status::SERVICE_UNAVAILABLE, "  ".to_string(), None);
        assert_eq!(unavailable.to_string(), "503 Service Unavailable");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            RestStore::new("not a url", None),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            RestStore::new("mailto:dojo@example.com", None),
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_crud_round_trip() -> Result<()> {
        let rows = Rows::default();
        let store = store_with(Arc::clone(&rows)).await;

        let created = store.create(&ana_lima()).await?;
        assert_eq!(created.id, "row-1");
        assert_eq!(created.to_input(), ana_lima());
        assert!(created.created_at.is_some());
        assert_eq!(
            rows.lock().unwrap()[0].get("monthly_fee"),
            Some(&json!(150.0))
        );

        let changes = store
            .update(&created.id, &StudentPatch::default().belt(Belt::Verde))
            .await?
            .unwrap();
        let mut updated = created.clone();
        changes.apply_to(&mut updated);
        assert_eq!(updated.belt, Belt::Verde);
        assert_eq!(updated.age, 10);

        let listed = store.list().await?;
        assert_eq!(listed, vec![updated]);

        store.delete(&created.id).await?;
        assert!(store.list().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_sends_only_present_fields() -> Result<()> {
        let rows = Rows::default();
        let store = store_with(Arc::clone(&rows)).await;
        let created = store.create(&ana_lima()).await?;

        store
            .update(&created.id, &StudentPatch::default().age(11))
            .await?;

        let row = rows.lock().unwrap()[0].clone();
        assert_eq!(row.get("age"), Some(&json!(11)));
        assert_eq!(row.get("belt"), Some(&json!("Amarela")));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = store_with(Rows::default()).await;

        let update = store
            .update("ghost", &StudentPatch::default().age(11))
            .await;
        let delete = store.delete("ghost").await;

        assert!(matches!(update, Err(Error::NotFound { id }) if id == "ghost"));
        assert!(delete.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejected_create_carries_body() {
        let store = store_with(Rows::default()).await;

        let result = store.create(&StudentInput::new(" ", 10, Belt::Cinza)).await;

        match result {
            Err(Error::Validation { message, .. }) => assert_eq!(message, "name is required"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transport_with_body() {
        let router = Router::new().route(
            "/api/students",
            get(|| async { (Status::INTERNAL_SERVER_ERROR, "database offline") }),
        );
        let store = RestStore::new(&serve_api(router).await, None).unwrap();

        let result = store.list().await;

        assert!(matches!(result, Err(Error::Transport { message }) if message == "database offline"));
    }

    #[tokio::test]
    async fn test_update_without_body_is_none() -> Result<()> {
        let router = Router::new().route("/api/students/{id}", put(|| async { Status::NO_CONTENT }));
        let store = RestStore::new(&serve_api(router).await, None).unwrap();

        let result = store
            .update("s1", &StudentPatch::default().belt(Belt::Azul))
            .await?;

        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_echoing_some_columns() -> Result<()> {
        let router = Router::new().route(
            "/api/students/{id}",
            put(|| async { Json(json!({"id": "s1", "belt": "Verde"})) }),
        );
        let store = RestStore::new(&serve_api(router).await, None).unwrap();

        let changes = store
            .update("s1", &StudentPatch::default().belt(Belt::Verde))
            .await?
            .unwrap();

        assert_eq!(changes.patch, StudentPatch::default().belt(Belt::Verde));
        assert_eq!(changes.updated_at, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_lenient_row_decoding() -> Result<()> {
        let rows = Rows::default();
        rows.lock().unwrap().push(
            json!({
                "id": "legacy-1",
                "name": "Bruno",
                "age": 12,
                "belt": "Branca",
                "phone": "",
                "monthly_fee": "99.90",
                "enrollment_date": "2023-03-01"
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let store = store_with(rows).await;

        let listed = store.list().await?;

        assert_eq!(listed[0].belt, Belt::Branca);
        assert_eq!(listed[0].phone, None);
        assert_eq!(listed[0].monthly_fee, Some(99.9));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let router = Router::new().route("/api/students", get(|| async { "not json" }));
        let store = RestStore::new(&serve_api(router).await, None).unwrap();

        assert!(matches!(store.list().await, Err(Error::Decode { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let store = RestStore::new(&format!("http://{addr}"), None).unwrap();

        assert!(matches!(store.list().await, Err(Error::Transport { .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_transport() {
        let router = Router::new().route(
            "/api/students",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "[]"
            }),
        );
        let base = serve_api(router).await;
        let store = RestStore::new(&base, Some(Duration::from_millis(100))).unwrap();

        assert!(matches!(store.list().await, Err(Error::Transport { .. })));
    }
}
