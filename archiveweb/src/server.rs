//! Archive hub server module.
//!
//! Provides the JSON API used by upload and retrieval clients, WebSocket
//! progress streaming for mock IPFS uploads, and a TCP listener for task
//! clients. Manages `UploadSession`s which carry a simulated upload from
//! first byte to a stored, relayer-locked record.
//!
use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{RwLock, mpsc},
};
use tokio_util::sync::CancellationToken;

use archiveproto::{
    codec, ipfs,
    record::FileRecord,
    secret,
    wire::{Request, Response},
};

use crate::{
    archive::Archive,
    config::CONFIG,
    relayer::{MockRelayer, Relayer},
};

/// Progress checkpoints of the simulated IPFS upload, a percent and the
/// delay that follows it.
const UPLOAD_STEPS: [(u8, u64); 4] = [(18, 300), (52, 300), (78, 250), (100, 0)];

/// How long a finished upload may sit unstored before its session is
/// dropped from the map.
const UNCLAIMED_TTL: Duration = Duration::from_secs(10 * 60);

/// Represents one in-flight mock upload
pub(crate) struct UploadSession {
    // Name and announced size from the client
    pub(crate) file_name: String,
    pub(crate) file_size: u64,
    // Latest percent, replayed to late WebSocket attachments
    pub(crate) progress: RwLock<u8>,
    // Sender for events to the attached WebSocket client
    pub(crate) event_tx: RwLock<Option<mpsc::UnboundedSender<UploadEvent>>>,
    // Upload result once the simulation completes
    pub(crate) prepared: RwLock<Option<PreparedUpload>>,
    // Cancelling stops the simulation wherever it is
    pub(crate) cancel_token: CancellationToken,
}

/// Everything the client needs after the mock upload: the placeholder
/// hash, the fresh secret and the ciphertext that will go on record.
#[derive(Serialize, Clone, Debug)]
pub(crate) struct PreparedUpload {
    pub(crate) ipfs_hash: String,
    pub(crate) secret_address: String,
    pub(crate) encrypted_hash: String,
}

/// Events streamed over the upload WebSocket
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "event", rename_all = "snake_case")]
pub(crate) enum UploadEvent {
    Progress {
        percent: u8,
    },
    Ready {
        #[serde(flatten)]
        prepared: PreparedUpload,
    },
    Cancelled,
}

/// Application state shared by every surface of the hub
pub(crate) struct AppState {
    /// Records and the archive identity
    pub(crate) archive: Archive,
    /// Relayer locking the per-file secrets
    pub(crate) relayer: Arc<dyn Relayer>,
    /// Map of upload IDs to their sessions
    pub(crate) uploads: RwLock<HashMap<String, Arc<UploadSession>>>,
}

/// Start the hub with its TCP task listener and the web API
pub async fn run() {
    let state = Arc::new(AppState {
        archive: Archive::new(),
        relayer: Arc::new(MockRelayer::new()),
        uploads: RwLock::new(HashMap::new()),
    });

    println!("📦 Archive address: {}", state.archive.address());

    let tcp_state = Arc::clone(&state);
    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{}", CONFIG.hub_port);
        let listener = TcpListener::bind(addr).await.unwrap();
        println!(
            "🚀 Hub TCP listening for task clients on port {}",
            CONFIG.hub_port
        );
        loop {
            let (socket, addr) = listener.accept().await.unwrap();
            tokio::spawn(handle_task_client(
                socket,
                addr.to_string(),
                Arc::clone(&tcp_state),
            ));
        }
    });

    let app = Router::new()
        .route("/api/archive", get(archive_info))
        .route("/api/uploads", post(begin_upload))
        .route("/api/uploads/{id}", delete(cancel_upload))
        .route("/ws/uploads/{id}", get(upload_ws))
        .route("/api/files", post(store_upload))
        .route("/api/files/{owner}", get(list_files))
        .route("/api/files/{owner}/{index}/decrypt", post(decrypt_file))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", CONFIG.web_port)
        .parse::<std::net::SocketAddr>()
        .unwrap();

    match (&CONFIG.cert, &CONFIG.key) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem(cert.as_bytes().to_vec(), key.as_bytes().to_vec())
                .await
                .unwrap();
            println!("🌐 Web API at https://localhost:{}/api", CONFIG.web_port);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await
                .unwrap();
        }
        _ => {
            println!("🌐 Web API at http://localhost:{}/api", CONFIG.web_port);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await
                .unwrap();
        }
    }
}

#[derive(Serialize)]
struct ArchiveInfoResponse {
    archive_address: String,
    file_count: u64,
}

/// Identify the archive and how many records it holds
async fn archive_info(State(state): State<Arc<AppState>>) -> Json<ArchiveInfoResponse> {
    Json(ArchiveInfoResponse {
        archive_address: state.archive.address().to_string(),
        file_count: state.archive.total_count().await,
    })
}

#[derive(Deserialize)]
struct BeginUploadRequest {
    /// Filename to record when the upload is stored
    file_name: String,
    /// Announced size in bytes, display only
    file_size: u64,
}

#[derive(Serialize)]
struct BeginUploadResponse {
    upload_id: String,
}

/// Start a mock upload and hand back its session ID
async fn begin_upload(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BeginUploadRequest>,
) -> Result<Json<BeginUploadResponse>, (StatusCode, String)> {
    if payload.file_name.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "file_name must not be empty".to_string(),
        ));
    }

    let id = hex::encode(rand::random::<[u8; 8]>());
    let session = Arc::new(UploadSession {
        file_name: payload.file_name,
        file_size: payload.file_size,
        progress: RwLock::new(0),
        event_tx: RwLock::new(None),
        prepared: RwLock::new(None),
        cancel_token: CancellationToken::new(),
    });

    state
        .uploads
        .write()
        .await
        .insert(id.clone(), Arc::clone(&session));

    println!(
        "⏳ Mock upload {} started: {} ({} bytes)",
        id, session.file_name, session.file_size
    );
    let task_id = id.clone();
    tokio::spawn(async move {
        run_mock_upload(task_id.clone(), Arc::clone(&session), Arc::clone(&state)).await;
        reap_unclaimed_upload(task_id, session, state).await;
    });

    Ok(Json(BeginUploadResponse { upload_id: id }))
}

/// Drop an upload session and cancel its simulation
async fn cancel_upload(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> StatusCode {
    let mut uploads = state.uploads.write().await;

    if let Some(session) = uploads.remove(&id) {
        println!("🛑 Cancelling upload session: {}", id);
        session.cancel_token.cancel();
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// WebSocket endpoint streaming upload progress for one session
async fn upload_ws(
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_upload_ws(socket, id, state))
}

/// Walk the simulated upload through its checkpoints, then derive the
/// placeholder hash, a fresh secret and the ciphertext for storage.
async fn run_mock_upload(id: String, session: Arc<UploadSession>, state: Arc<AppState>) {
    for (percent, delay_ms) in UPLOAD_STEPS {
        *session.progress.write().await = percent;
        send_event(&session, UploadEvent::Progress { percent }).await;
        if delay_ms == 0 {
            continue;
        }
        tokio::select! {
            _ = session.cancel_token.cancelled() => {
                println!("🛑 Mock upload cancelled: {}", id);
                send_event(&session, UploadEvent::Cancelled).await;
                state.uploads.write().await.remove(&id);
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }

    let ipfs_hash = ipfs::generate_mock_ipfs_hash();
    let secret_address = secret::random_secret_address();
    let encrypted_hash = format!(
        "0x{}",
        codec::encode(&ipfs_hash, &secret_address).expect("fresh secret token is never empty")
    );
    let prepared = PreparedUpload {
        ipfs_hash,
        secret_address,
        encrypted_hash,
    };

    *session.prepared.write().await = Some(prepared.clone());
    send_event(&session, UploadEvent::Ready { prepared }).await;
    println!("✅ Mock upload {} finished: {}", id, session.file_name);
}

/// Hold a finished upload for a grace period, then drop its session if
/// nobody stored or cancelled it in the meantime.
async fn reap_unclaimed_upload(id: String, session: Arc<UploadSession>, state: Arc<AppState>) {
    tokio::select! {
        _ = session.cancel_token.cancelled() => {
            if state.uploads.write().await.remove(&id).is_some() {
                println!("🛑 Mock upload cancelled: {}", id);
                send_event(&session, UploadEvent::Cancelled).await;
            }
        }
        _ = tokio::time::sleep(UNCLAIMED_TTL) => {
            if state.uploads.write().await.remove(&id).is_some() {
                println!("💀 Unclaimed upload expired: {}", id);
                send_event(&session, UploadEvent::Cancelled).await;
            }
        }
    }
}

/// Push an event to the attached WebSocket client, dropping the sender
/// if that client went away.
async fn send_event(session: &UploadSession, event: UploadEvent) {
    let guard = session.event_tx.read().await;
    if let Some(event_tx) = &*guard {
        if event_tx.send(event).is_err() {
            drop(guard);
            *session.event_tx.write().await = None;
        }
    }
}

/// Bridge upload events to the WebSocket and listen for a client cancel
async fn handle_upload_ws(socket: WebSocket, id: String, state: Arc<AppState>) {
    let session = {
        let uploads = state.uploads.read().await;
        uploads.get(&id).cloned()
    };

    let session = match session {
        Some(s) => s,
        None => return,
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UploadEvent>();

    {
        let mut event_tx_guard = session.event_tx.write().await;
        *event_tx_guard = Some(event_tx);
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Replay where the upload already got to before this client attached.
    let percent = *session.progress.read().await;
    if send_json(&mut ws_sender, &UploadEvent::Progress { percent })
        .await
        .is_err()
    {
        return;
    }
    if let Some(prepared) = session.prepared.read().await.clone() {
        if send_json(&mut ws_sender, &UploadEvent::Ready { prepared })
            .await
            .is_err()
        {
            return;
        }
    }

    let cancel_session = Arc::clone(&session);
    let mut task_client_to_hub = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Text(text) = msg {
                if text.as_str().trim() == "cancel" {
                    cancel_session.cancel_token.cancel();
                }
            }
        }
    });

    let mut task_hub_to_client = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if send_json(&mut ws_sender, &event).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut task_client_to_hub) => task_hub_to_client.abort(),
        _ = (&mut task_hub_to_client) => task_client_to_hub.abort(),
    }

    if let Some(s) = state.uploads.read().await.get(&id) {
        let mut event_tx_guard = s.event_tx.write().await;
        *event_tx_guard = None;
    }
}

async fn send_json(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    event: &UploadEvent,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap();
    ws_sender.send(Message::Text(payload.into())).await
}

#[derive(Deserialize)]
struct StoreUploadRequest {
    upload_id: String,
    owner: String,
}

#[derive(Serialize)]
struct StoredResponse {
    index: u64,
    created_at: u64,
    handle: String,
}

/// Lock the prepared secret with the relayer and store the record
async fn store_upload(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StoreUploadRequest>,
) -> Result<Json<StoredResponse>, (StatusCode, String)> {
    let session = {
        let uploads = state.uploads.read().await;
        uploads.get(&payload.upload_id).cloned()
    };
    let session = match session {
        Some(s) => s,
        None => return Err((StatusCode::NOT_FOUND, "unknown upload".to_string())),
    };
    let prepared = match session.prepared.read().await.clone() {
        Some(p) => p,
        None => {
            return Err((
                StatusCode::CONFLICT,
                "upload still in progress".to_string(),
            ));
        }
    };

    let (handle, proof) = state
        .relayer
        .encrypt_address(&payload.owner, &prepared.secret_address);
    let (index, created_at) = store_record(
        &state,
        &payload.owner,
        &session.file_name,
        &prepared.encrypted_hash,
        &handle,
        &proof,
    )
    .await
    .map_err(|message| (StatusCode::UNPROCESSABLE_ENTITY, message))?;

    state.uploads.write().await.remove(&payload.upload_id);
    println!(
        "✅ Stored {} at index {} for {}",
        session.file_name, index, payload.owner
    );

    Ok(Json(StoredResponse {
        index,
        created_at,
        handle,
    }))
}

#[derive(Serialize)]
struct IndexedRecord {
    index: u64,
    #[serde(flatten)]
    record: FileRecord,
}

/// List an owner's records, newest first, each with its store index
async fn list_files(
    Path(owner): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<IndexedRecord>> {
    let mut indexed: Vec<IndexedRecord> = state
        .archive
        .list(&owner)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, record)| IndexedRecord {
            index: index as u64,
            record,
        })
        .collect();
    indexed.sort_by(|a, b| (b.record.created_at, b.index).cmp(&(a.record.created_at, a.index)));
    Json(indexed)
}

#[derive(Serialize)]
struct DecryptResponse {
    secret_address: String,
    ipfs_hash: String,
}

/// Unlock one record: relayer first, then the keystream codec
async fn decrypt_file(
    Path((owner, index)): Path<(String, u64)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DecryptResponse>, (StatusCode, String)> {
    let record = match state.archive.get(&owner, index).await {
        Some(r) => r,
        None => return Err((StatusCode::NOT_FOUND, "no such file".to_string())),
    };
    let secret_address = match state.relayer.decrypt_handle(&record.encrypted_secret_address) {
        Some(s) => s,
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                "relayer does not know this handle".to_string(),
            ));
        }
    };
    let ipfs_hash = codec::decode(&record.encrypted_ipfs_hash, &secret_address)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    Ok(Json(DecryptResponse {
        secret_address,
        ipfs_hash,
    }))
}

/// Verify the relayer proof and append a record stamped with the current
/// time. Shared by the HTTP store endpoint and the TCP task surface.
async fn store_record(
    state: &AppState,
    owner: &str,
    file_name: &str,
    encrypted_ipfs_hash: &str,
    handle: &str,
    proof: &str,
) -> Result<(u64, u64), String> {
    if !state.relayer.verify_proof(handle, proof, owner) {
        return Err("input proof does not verify".to_string());
    }
    let created_at = epoch_now();
    let record = FileRecord {
        file_name: file_name.to_string(),
        encrypted_ipfs_hash: encrypted_ipfs_hash.to_string(),
        encrypted_secret_address: handle.to_string(),
        owner: owner.to_string(),
        created_at,
    };
    let index = state.archive.store(record).await?;
    Ok((index, created_at))
}

/// Records cross the TCP wire as loose JSON values; task clients decode
/// them back into `FileRecord`s at their end.
fn record_to_wire(record: &FileRecord) -> serde_json::Value {
    serde_json::to_value(record).unwrap()
}

/// Handle one task client connection, one JSON request per line
async fn handle_task_client(socket: TcpStream, peer: String, state: Arc<AppState>) {
    println!("🔌 Task client connected: {}", peer);
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request, &state).await,
            Err(e) => Response::Error {
                message: format!("bad request: {e}"),
            },
        };
        let mut payload = serde_json::to_vec(&response).unwrap();
        payload.push(b'\n');
        if write_half.write_all(&payload).await.is_err() {
            break;
        }
    }
    println!("❌ Task client disconnected: {}", peer);
}

/// Dispatch one wire request against the shared state
async fn handle_request(request: Request, state: &Arc<AppState>) -> Response {
    match request {
        Request::ArchiveInfo => Response::ArchiveInfo {
            archive_address: state.archive.address().to_string(),
            file_count: state.archive.total_count().await,
        },
        Request::EncryptSecret {
            owner,
            secret_address,
        } => {
            if !secret::is_hex_address(&owner) {
                return Response::Error {
                    message: format!("owner {owner} is not an address"),
                };
            }
            if !secret::is_hex_address(&secret_address) {
                return Response::Error {
                    message: format!("secret {secret_address} is not an address token"),
                };
            }
            let (handle, proof) = state.relayer.encrypt_address(&owner, &secret_address);
            Response::SecretEncrypted { handle, proof }
        }
        Request::StoreFile {
            owner,
            file_name,
            encrypted_ipfs_hash,
            handle,
            proof,
        } => match store_record(state, &owner, &file_name, &encrypted_ipfs_hash, &handle, &proof)
            .await
        {
            Ok((index, created_at)) => {
                println!("✅ Stored {} at index {} for {}", file_name, index, owner);
                Response::Stored { index, created_at }
            }
            Err(message) => Response::Error { message },
        },
        Request::ListFiles { owner } => Response::Files {
            records: state.archive.list(&owner).await.iter().map(record_to_wire).collect(),
        },
        Request::GetFile { owner, index } => match state.archive.get(&owner, index).await {
            Some(record) => Response::File {
                record: record_to_wire(&record),
            },
            None => Response::Error {
                message: format!("no file at index {index} for {owner}"),
            },
        },
        Request::DecryptSecret { handle } => match state.relayer.decrypt_handle(&handle) {
            Some(secret_address) => Response::SecretDecrypted { secret_address },
            None => Response::Error {
                message: "relayer does not know this handle".to_string(),
            },
        },
    }
}

/// Unix seconds right now; zero only if the clock sits before the epoch
fn epoch_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
