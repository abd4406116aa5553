//! HTTP editing service.
//!
//! One process-wide `SchemaSession` behind a mutex, so edits from concurrent
//! requests are applied one at a time. Routing goes through `dispatch`, which
//! takes the request pieces and the session and never touches a socket.
//!
//! Routes:
//! - `GET /healthz`
//! - `POST /upload`, `POST /reload` (raw document JSON)
//! - `GET /node?ID=<id|root>`, `POST /node` (`{"id", "updatedFields"}`)
//! - `POST /add_event` (event record plus `parent_id`)
//! - `POST /remove_element`, `POST /add_entity`, `POST /add_participant`
//! - `POST /add_outlink`, `POST /add_relation`
//! - `GET /get_all_entities`, `DELETE /delete_entity`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::form_urlencoded;

use schemagraph_graph::{Anchor, GraphError, SchemaSession, Subgraph, SubgraphView};
use schemagraph_model::{Document, Entity, Event, ModelError, Participant, Record, Relation};

/// Message the viewer shows when it queries an empty session.
const EMPTY_STATE_MESSAGE: &str = "Parsing error! Upload the file again.";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Document to load before accepting requests.
    pub preload: Option<PathBuf>,
    /// Written once the listener is bound (`{"addr", "pid"}`).
    pub ready_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 5000)),
            preload: None,
            ready_file: None,
        }
    }
}

struct ServerState {
    session: Mutex<SchemaSession>,
}

pub fn run_server(config: ServerConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    rt.block_on(async move { serve_async(config).await })
}

async fn serve_async(config: ServerConfig) -> Result<()> {
    let mut session = SchemaSession::new();
    if let Some(path) = config.preload.as_ref() {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("serve: failed to read {}: {e}", path.display()))?;
        session
            .load_json(&text)
            .map_err(|e| anyhow!("serve: failed to load {}: {e}", path.display()))?;
    }
    let state = Arc::new(ServerState {
        session: Mutex::new(session),
    });

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {}: {e}", config.listen))?;
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;

    info!(addr = %bound, "listening");
    if let Some(path) = config.ready_file.as_ref() {
        let payload = serde_json::json!({
            "version": "schemagraph_server_ready_v1",
            "addr": bound.to_string(),
            "pid": std::process::id(),
        });
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(path, serde_json::to_string_pretty(&payload).unwrap_or_default()).ok();
    }

    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("connection error: {e}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    if method == Method::GET && path == "/healthz" {
        return Ok(text_response(StatusCode::OK, "ok\n"));
    }

    let body = req.into_body().collect().await?.to_bytes();
    let outcome = match state.session.lock() {
        Ok(mut session) => dispatch(&mut session, &method, &path, query.as_deref(), &body),
        Err(_) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "session lock poisoned",
        )),
    };

    Ok(match outcome {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => {
            if e.status.is_server_error() {
                warn!(%method, path, "{}", e.message);
            }
            json_error(e.status, &e.message)
        }
    })
}

// ============================================================================
// Routing
// ============================================================================

/// A failed request: status plus the message sent as `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::EmptyGraphState => Self::bad_request(EMPTY_STATE_MESSAGE),
            GraphError::Model(e) => Self::bad_request(e.to_string()),
            e @ GraphError::UnknownReference { .. } => Self::new(StatusCode::NOT_FOUND, e.to_string()),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Route one request against `session`.
pub fn dispatch(
    session: &mut SchemaSession,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
) -> Result<Value, ApiError> {
    match (method, path) {
        (&Method::POST, "/upload") | (&Method::POST, "/reload") => load_document(session, body),
        (&Method::GET, "/node") => node_subgraph(session, query),
        (&Method::POST, "/node") => update_node(session, body),
        (&Method::POST, "/add_event") => add_event(session, body),
        (&Method::POST, "/remove_element") => {
            let req: RemoveElementRequest = parse_body(body)?;
            session.remove_element(&req.id)?;
            Ok(serde_json::json!({ "success": true }))
        }
        (&Method::POST, "/add_entity") => {
            let req: AddEntityRequest = parse_body(body)?;
            to_json(session.add_entity(&req.event_id, req.entity_data)?)
        }
        (&Method::POST, "/add_participant") => {
            let req: AddParticipantRequest = parse_body(body)?;
            to_json(session.add_participant(&req.event_id, req.participant_data)?)
        }
        (&Method::POST, "/add_outlink") => {
            let req: AddOutlinkRequest = parse_body(body)?;
            let view = session.add_outlink(&req.from_node_id, &req.to_node_id)?;
            parsed_schema(session, &view)
        }
        (&Method::POST, "/add_relation") => add_relation(session, body),
        (&Method::GET, "/get_all_entities") => to_json(&session.entity_catalogue()?),
        (&Method::DELETE, "/delete_entity") => {
            let req: DeleteEntityRequest = parse_body(body)?;
            to_json(session.delete_entity(&req.entity_id)?)
        }
        _ => Err(ApiError::new(StatusCode::NOT_FOUND, "not found")),
    }
}

fn load_document(session: &mut SchemaSession, body: &[u8]) -> Result<Value, ApiError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ApiError::bad_request(format!("document is not UTF-8: {e}")))?;
    let view = session.load_json(text)?;
    parsed_schema(session, &view)
}

fn node_subgraph(session: &SchemaSession, query: Option<&str>) -> Result<Value, ApiError> {
    let params = parse_query_params(query);
    let id = params
        .get("ID")
        .ok_or_else(|| ApiError::bad_request("missing query parameter `ID`"))?;
    let view = session.subgraph(&Anchor::parse(id))?;
    to_json(&view.subgraph)
}

fn update_node(session: &mut SchemaSession, body: &[u8]) -> Result<Value, ApiError> {
    let req: UpdateNodeRequest = parse_body(body)?;
    to_json(session.update_fields(&req.id, &req.updated_fields)?)
}

fn add_event(session: &mut SchemaSession, body: &[u8]) -> Result<Value, ApiError> {
    let mut record: Record = parse_body(body)?;
    let parent = record
        .remove("parent_id")
        .ok_or_else(|| ApiError::bad_request("missing field `parent_id`"))?;
    let parent: ParentRef = serde_json::from_value(parent)
        .map_err(|e| ApiError::bad_request(format!("invalid `parent_id`: {e}")))?;
    let event = Event::from_record(record)?;
    to_json(session.add_event(event, parent.id())?)
}

fn add_relation(session: &mut SchemaSession, body: &[u8]) -> Result<Value, ApiError> {
    let req: AddRelationRequest = parse_body(body)?;
    let mut record = req.relation;
    // The viewer draws the edge first; the endpoints fill in a bare relation.
    record
        .entry("relationSubject")
        .or_insert_with(|| Value::String(req.from_node_id.clone()));
    if let Some(to) = req.to_node_id {
        record
            .entry("relationObject")
            .or_insert_with(|| Value::String(to));
    }
    let relation: Relation = serde_json::from_value(Value::Object(record))
        .map_err(|e| ApiError::bad_request(format!("invalid relation: {e}")))?;
    let view = session.add_relation(&req.from_node_id, relation)?;
    parsed_schema(session, &view)
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateNodeRequest {
    id: String,
    #[serde(rename = "updatedFields", default)]
    updated_fields: Record,
}

/// `parent_id` is either a bare id or the selected viewer element.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParentRef {
    Id(String),
    Element {
        #[serde(rename = "@id")]
        id: String,
    },
}

impl ParentRef {
    fn id(&self) -> &str {
        match self {
            ParentRef::Id(id) | ParentRef::Element { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoveElementRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AddEntityRequest {
    event_id: String,
    entity_data: Entity,
}

#[derive(Debug, Deserialize)]
struct AddParticipantRequest {
    event_id: String,
    participant_data: Participant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddOutlinkRequest {
    from_node_id: String,
    to_node_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRelationRequest {
    from_node_id: String,
    #[serde(default)]
    to_node_id: Option<String>,
    relation: Record,
}

#[derive(Debug, Deserialize)]
struct DeleteEntityRequest {
    entity_id: String,
}

/// Root view plus the document, as returned by load and link edits.
#[derive(Debug, Serialize)]
pub struct ParsedSchemaResponse<'a> {
    #[serde(rename = "parsedSchema")]
    pub parsed_schema: &'a Subgraph,
    pub name: Option<&'a str>,
    #[serde(rename = "schemaJson")]
    pub schema_json: &'a Document,
}

fn parsed_schema(session: &SchemaSession, view: &SubgraphView) -> Result<Value, ApiError> {
    to_json(&ParsedSchemaResponse {
        parsed_schema: &view.subgraph,
        name: view.name.as_deref(),
        schema_json: session.document()?,
    })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("failed to parse request JSON: {e}")))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to serialize response: {e}"),
        )
    })
}

fn parse_query_params(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(q) = query else {
        return out;
    };
    for (k, v) in form_urlencoded::parse(q.as_bytes()) {
        out.insert(k.into_owned(), v.into_owned());
    }
    out
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"error\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"error\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let v = serde_json::json!({ "error": msg });
    json_response(status, &v)
}
