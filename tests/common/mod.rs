//! Shared fixtures for integration tests: a mock Consul and in-memory
//! doubles of the engine's capabilities.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Path as UrlPath, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;

use flow_proxy::engine::{EngineConfig, EngineDeps, OperationLocks};
use flow_proxy::exec::{CommandError, ProcessRunner};
use flow_proxy::proxy::{Proxy, ProxyError};
use flow_proxy::storage::FileSystem;

/// Services announced by the mock catalog.
pub const CATALOG: [&str; 3] = ["service1", "service2", "myService"];

/// Requests seen by the mock Consul.
#[derive(Default)]
pub struct ConsulRecord {
    pub puts: Mutex<Vec<(String, String)>>,
    pub deletes: Mutex<Vec<String>>,
    pub values: Mutex<HashMap<String, String>>,
    pub fail_catalog: AtomicBool,
}

impl ConsulRecord {
    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

async fn catalog(State(record): State<Arc<ConsulRecord>>) -> Result<Json<BTreeMap<String, Vec<String>>>, StatusCode> {
    if record.fail_catalog.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(
        CATALOG.iter().map(|s| (s.to_string(), Vec::new())).collect(),
    ))
}

async fn kv_get(
    State(record): State<Arc<ConsulRecord>>,
    UrlPath(key): UrlPath<String>,
) -> Result<String, StatusCode> {
    record
        .values
        .lock()
        .unwrap()
        .get(&key)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn kv_put(
    State(record): State<Arc<ConsulRecord>>,
    UrlPath(key): UrlPath<String>,
    body: String,
) -> &'static str {
    record.puts.lock().unwrap().push((key.clone(), body.clone()));
    record.values.lock().unwrap().insert(key, body);
    "true"
}

async fn kv_delete(
    State(record): State<Arc<ConsulRecord>>,
    UrlPath(key): UrlPath<String>,
    RawQuery(query): RawQuery,
) -> &'static str {
    if query.as_deref() == Some("recurse") {
        let prefix = key.clone();
        record
            .values
            .lock()
            .unwrap()
            .retain(|k, _| !k.starts_with(&prefix));
    }
    record.deletes.lock().unwrap().push(key);
    "true"
}

/// Start a mock Consul on an ephemeral port.
///
/// Only `myService` has routing data stored.
pub async fn start_mock_consul() -> (String, Arc<ConsulRecord>) {
    let record = Arc::new(ConsulRecord::default());
    record.set("docker-flow/myService/color", "orange");
    record.set("docker-flow/myService/path", "/path/to/my/service/api,/path/to/my/other/service/api");
    record.set("docker-flow/myService/domain", "my-domain.com");
    record.set("docker-flow/myService/pathtype", "path_beg");
    record.set("docker-flow/myService/skipcheck", "false");

    let app = Router::new()
        .route("/v1/catalog/services", get(catalog))
        .route("/v1/kv/{*key}", get(kv_get).put(kv_put).delete(kv_delete))
        .with_state(record.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), record)
}

/// Address nothing listens on.
pub async fn unreachable_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// In-memory `FileSystem` recording every write.
#[derive(Default)]
pub struct MemoryFs {
    pub files: Mutex<BTreeMap<PathBuf, (String, u32)>>,
    pub removed: Mutex<Vec<PathBuf>>,
    pub fail_write: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl MemoryFs {
    pub fn file(&self, path: impl AsRef<Path>) -> Option<(String, u32)> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), (contents.to_string(), 0o644));
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.file(path)
            .map(|(contents, _)| contents)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn write(&self, path: &Path, contents: &str, mode: u32) -> io::Result<()> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write denied"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), (contents.to_string(), mode));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "remove denied"));
        }
        self.removed.lock().unwrap().push(path.to_path_buf());
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

/// `ProcessRunner` recording invocations instead of spawning.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
    pub fail: AtomicBool,
}

impl RecordingRunner {
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<(), CommandError> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(CommandError::Failed {
                program: program.to_string(),
                code: "1".to_string(),
                stderr: "This is an consul-template error".to_string(),
            });
        }
        Ok(())
    }
}

/// `ProcessRunner` acting like consul-template: copies `-template src:dst`
/// verbatim. Every other program succeeds without doing anything.
#[derive(Default)]
pub struct TemplateCopyRunner {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ProcessRunner for TemplateCopyRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<(), CommandError> {
        self.calls.lock().unwrap().push(program.to_string());
        let spec = args
            .iter()
            .position(|a| a == "-template")
            .and_then(|i| args.get(i + 1));
        if let Some((src, dst)) = spec.and_then(|s| s.split_once(':')) {
            tokio::fs::copy(src, dst)
                .await
                .map_err(|source| CommandError::Spawn {
                    program: program.to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// `Proxy` recording rebuilds and reloads.
#[derive(Default)]
pub struct RecordingProxy {
    pub rebuilds: Mutex<Vec<(PathBuf, PathBuf)>>,
    pub reloads: Mutex<usize>,
    pub fail_rebuild: AtomicBool,
    pub fail_reload: AtomicBool,
}

impl RecordingProxy {
    pub fn rebuilds(&self) -> Vec<(PathBuf, PathBuf)> {
        self.rebuilds.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> usize {
        *self.reloads.lock().unwrap()
    }
}

fn proxy_failure(what: &str) -> ProxyError {
    ProxyError::Io {
        path: what.to_string(),
        source: io::Error::new(io::ErrorKind::Other, "This is an error"),
    }
}

#[async_trait]
impl Proxy for RecordingProxy {
    async fn create_config_from_templates(
        &self,
        templates_path: &Path,
        configs_path: &Path,
    ) -> Result<(), ProxyError> {
        if self.fail_rebuild.load(Ordering::SeqCst) {
            return Err(proxy_failure("haproxy.cfg"));
        }
        self.rebuilds
            .lock()
            .unwrap()
            .push((templates_path.to_path_buf(), configs_path.to_path_buf()));
        Ok(())
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(proxy_failure("haproxy.pid"));
        }
        *self.reloads.lock().unwrap() += 1;
        Ok(())
    }
}

/// Doubles wired into `EngineDeps`, kept typed for assertions.
pub struct Harness {
    pub fs: Arc<MemoryFs>,
    pub runner: Arc<RecordingRunner>,
    pub proxy: Arc<RecordingProxy>,
    pub deps: EngineDeps,
}

impl Harness {
    /// Doubles talking to a real `ConsulKv`.
    pub fn new() -> Self {
        let fs = Arc::new(MemoryFs::default());
        let runner = Arc::new(RecordingRunner::default());
        let proxy = Arc::new(RecordingProxy::default());
        let kv = flow_proxy::kv::ConsulKv::new(std::time::Duration::from_secs(2)).unwrap();
        let deps = EngineDeps {
            fs: fs.clone(),
            runner: runner.clone(),
            proxy: proxy.clone(),
            kv: Arc::new(kv),
            locks: Arc::new(OperationLocks::new()),
            consul_template: "consul-template".to_string(),
        };
        Self {
            fs,
            runner,
            proxy,
            deps,
        }
    }
}

pub fn engine_config(consul_address: &str) -> EngineConfig {
    EngineConfig::new(consul_address, "/path/to/templates", "/path/to/configs")
}
