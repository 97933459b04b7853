//! Import orchestration.
//!
//! [`Orchestrator::run`] registers the session, resolves credentials,
//! connects, opens the source and compiles the transform, then drives the
//! batch loop in its own task. A failure before the first read marks the
//! session `Failed` and is reported like any other:
//!
//! read batch -> transform -> write -> commit stats -> checkpoint -> report ->
//! check signal.
//!
//! The loop only suspends at batch boundaries, so a pause or stop request is
//! observed after the current batch has been checkpointed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use loader_core::{
    record_key, validate_session_id, Catalog, Config, ErrorInfo, ErrorKind, ImportConfig, ImportRequest, ImportStats,
    ImportStatus, PreloadRequest, ProgressSnapshot, ResumeRequest, ValidationError,
};
use loader_credential::{CredentialError, EncryptionKey};
use loader_ingest::{RecordError, RecordSource};
use loader_store::{StoreConnector, StoreError};
use loader_transform::{Transform, TransformContext, TransformLimits, TransformOutcome};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{ImportError, SessionError};
use crate::progress::{NoopReporter, ProgressReporter};
use crate::registry::SessionRegistry;
use crate::session::{ImportSession, LoopGuard, SessionConfig, Signal, StoredCredential};
use crate::writer::{BatchWriter, PendingWrite};

/// Final (or current) state of a session as returned to callers.
pub type ImportOutcome = ProgressSnapshot;

/// Process-wide settings shared by every session.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub import: ImportConfig,
    pub limits: TransformLimits,
    pub upload_root: Option<PathBuf>,
    pub encryption_key: Option<EncryptionKey>,
    /// Store used by catalog preloads.
    pub default_store_url: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Result<Self, CredentialError> {
        let encryption_key = config
            .redis
            .encryption_key
            .as_deref()
            .map(EncryptionKey::from_hex)
            .transpose()?;
        Ok(Self {
            import: config.import.clone(),
            limits: TransformLimits::from(&config.transform),
            upload_root: config.storage.upload_root.clone(),
            encryption_key,
            default_store_url: config.redis.url.clone(),
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            import: ImportConfig::default(),
            limits: TransformLimits::default(),
            upload_root: None,
            encryption_key: None,
            default_store_url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Result of preloading one catalog data source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadOutcome {
    pub data_source_id: String,
    pub session_id: Option<String>,
    pub status: ImportStatus,
    pub stats: ImportStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Everything the batch loop owns for one run.
struct RunResources {
    source: RecordSource,
    transform: Transform,
    writer: BatchWriter,
}

enum BatchOutcome {
    Committed {
        cursor: u64,
        delta: ImportStats,
        first_error: Option<ErrorInfo>,
        halt: bool,
    },
    ConnectionLost(StoreError),
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: SessionRegistry,
    connector: Arc<dyn StoreConnector>,
    checkpoints: Arc<dyn CheckpointStore>,
    reporter: Arc<dyn ProgressReporter>,
    catalog: Arc<Catalog>,
    settings: Arc<OrchestratorSettings>,
}

impl Orchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        connector: Arc<dyn StoreConnector>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            connector,
            checkpoints,
            reporter: Arc::new(NoopReporter),
            catalog: Arc::new(Catalog::default()),
            settings: Arc::new(settings),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    // ── Startup ───────────────────────────────────────────────────

    /// Reload persisted sessions. Sessions that were mid-run come back
    /// `Paused`; finished ones nobody can acknowledge any more are dropped.
    pub async fn recover(&self) -> Result<usize, ImportError> {
        let mut restored = 0;
        for cp in self.checkpoints.list().await? {
            let was = cp.status;
            let session = Arc::new(ImportSession::restore(cp));
            if session.status().is_terminal() && !session.is_resumable() {
                self.checkpoints.remove(session.id()).await?;
                continue;
            }
            if was != session.status() {
                self.checkpoints.save(&session.checkpoint()).await?;
            }
            info!(
                session_id = %session.id(),
                status = %session.status(),
                cursor = session.cursor(),
                "restored import session"
            );
            self.registry.insert(session);
            restored += 1;
        }
        Ok(restored)
    }

    // ── Operations ────────────────────────────────────────────────

    /// Start a fresh import and wait for its loop to stop.
    pub async fn run(&self, request: ImportRequest) -> Result<ImportOutcome, ImportError> {
        request.validate()?;
        let credential = StoredCredential::from_parts(
            request.redis_con_url.as_deref(),
            request.redis_con_url_encrypted.as_ref(),
        );

        let session_id = request
            .socket_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let config = SessionConfig {
            credential,
            id_field: request.id_field.clone().filter(|f| !f.trim().is_empty()),
            key_prefix: request.key_prefix.clone().unwrap_or_default(),
            stop_on_error: request.is_stop_on_error.unwrap_or(false),
            transform_code: request.js_function_string.clone(),
            upload_path: request.upload_path.clone(),
            upload_type: request.upload_type.clone(),
        };

        let session = self
            .registry
            .get_or_insert(Arc::new(ImportSession::new(&session_id, config.clone())));
        let guard = session.claim_loop()?;
        session.reset(config.clone());
        self.checkpoints.remove(&session_id).await?;
        self.persist(&session).await;
        info!(
            session_id = %session_id,
            upload_path = %config.upload_path,
            stop_on_error = config.stop_on_error,
            "import session created"
        );

        let prepared = async {
            let url = loader_credential::resolve(
                request.redis_con_url.as_deref(),
                request.redis_con_url_encrypted.as_ref(),
                self.settings.encryption_key.as_ref(),
            )?;
            let store = self.connector.connect(&url).await?;
            self.prepare(&config, store, 0).await
        }
        .await;
        let resources = match prepared {
            Ok(r) => r,
            Err(e) => return Err(self.fail_before_run(&session, e).await),
        };

        session.set_total(resources.source.total_hint());
        session.transition(ImportStatus::Running)?;
        self.spawn_loop(guard, resources).await
    }

    /// Continue a paused (or connection-failed) session from its cursor.
    pub async fn resume(&self, request: ResumeRequest) -> Result<ImportOutcome, ImportError> {
        request.validate()?;
        let credential = match (&request.redis_con_url, &request.redis_con_url_encrypted) {
            (Some(_), Some(_)) => return Err(CredentialError::Ambiguous.into()),
            (plain, encrypted) => StoredCredential::from_parts(plain.as_deref(), encrypted.as_ref()),
        };
        let session = self.lookup(&request.socket_id).await?;
        let guard = session.claim_loop()?;
        if !session.is_resumable() {
            return Err(SessionError::InvalidTransition {
                id: session.id().to_string(),
                from: session.status(),
                to: ImportStatus::Running,
            }
            .into());
        }

        session.update_config(|c| {
            c.upload_path = request.upload_path.clone();
            if request.upload_type.is_some() {
                c.upload_type = request.upload_type.clone();
            }
            if let Some(stop) = request.is_stop_on_error {
                c.stop_on_error = stop;
            }
            if credential.is_some() {
                c.credential = credential;
            }
        });
        let config = session.config();
        let cursor = session.cursor();

        let prepared = async {
            let (plain, encrypted) = config
                .credential
                .as_ref()
                .map(StoredCredential::parts)
                .unwrap_or((None, None));
            let url = loader_credential::resolve(plain, encrypted, self.settings.encryption_key.as_ref())?;
            let store = self.connector.connect(&url).await?;
            self.prepare(&config, store, cursor).await
        }
        .await;

        let resources = match prepared {
            Ok(r) => r,
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "resume failed before reading");
                // A stop that arrived while we were connecting still applies.
                if session.take_signal() == Signal::Stop && session.status() == ImportStatus::Paused {
                    session.transition(ImportStatus::Stopped)?;
                    self.persist(&session).await;
                    self.report(&session);
                    drop(guard);
                    self.retire_if_detached(&session).await;
                }
                return Err(e);
            }
        };

        session.set_total(resources.source.total_hint());
        session.transition(ImportStatus::Running)?;
        session.clear_error();
        info!(session_id = %session.id(), cursor, "import session resumed");
        self.spawn_loop(guard, resources).await
    }

    /// Ask a running import to pause after its current batch.
    pub fn pause(&self, session_id: &str) -> Result<ImportOutcome, ImportError> {
        validate_session_id(session_id)?;
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        match session.status() {
            ImportStatus::Running => {
                session.request(Signal::Pause);
                debug!(session_id, "pause requested");
                Ok(session.snapshot())
            }
            from => Err(SessionError::InvalidTransition {
                id: session_id.to_string(),
                from,
                to: ImportStatus::Paused,
            }
            .into()),
        }
    }

    /// Stop an import. A running loop stops at its next boundary; a paused
    /// session stops immediately.
    pub async fn stop(&self, session_id: &str) -> Result<ImportOutcome, ImportError> {
        validate_session_id(session_id)?;
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if session.is_loop_active() {
            session.request(Signal::Stop);
            debug!(session_id, "stop requested");
            return Ok(session.snapshot());
        }

        session.transition(ImportStatus::Stopped)?;
        self.persist(&session).await;
        self.report(&session);
        info!(session_id, cursor = session.cursor(), "import session stopped");
        let snapshot = session.snapshot();
        self.retire_if_detached(&session).await;
        Ok(snapshot)
    }

    pub async fn status(&self, session_id: &str) -> Result<ImportOutcome, ImportError> {
        validate_session_id(session_id)?;
        if let Some(session) = self.registry.get(session_id) {
            return Ok(session.snapshot());
        }
        match self.checkpoints.load(session_id).await? {
            Some(cp) => Ok(snapshot_of(&cp)),
            None => Err(SessionError::NotFound(session_id.to_string()).into()),
        }
    }

    /// Forget a finished session and its checkpoint.
    pub async fn acknowledge(&self, session_id: &str) -> Result<ImportOutcome, ImportError> {
        validate_session_id(session_id)?;
        let snapshot = match self.registry.get(session_id) {
            Some(session) => {
                let status = session.status();
                if !status.is_terminal() || session.is_loop_active() {
                    return Err(SessionError::NotFinished {
                        id: session_id.to_string(),
                        status,
                    }
                    .into());
                }
                self.registry.remove(session_id);
                session.snapshot()
            }
            None => match self.checkpoints.load(session_id).await? {
                Some(cp) => snapshot_of(&cp),
                None => return Err(SessionError::NotFound(session_id.to_string()).into()),
            },
        };
        self.checkpoints.remove(session_id).await?;
        info!(session_id, "import session acknowledged");
        Ok(snapshot)
    }

    /// The owning client went away: stop and forget the session.
    pub async fn disconnect(&self, session_id: &str) {
        let Some(session) = self.registry.get(session_id) else {
            return;
        };
        if session.is_loop_active() {
            // The loop retires the session once it observes the stop.
            session.request(Signal::Stop);
            return;
        }
        if session.status() == ImportStatus::Paused {
            if let Err(e) = session.transition(ImportStatus::Stopped) {
                warn!(session_id, error = %e, "could not stop session on disconnect");
            }
        }
        self.registry.remove(session_id);
        if !session.is_resumable() {
            if let Err(e) = self.checkpoints.remove(session_id).await {
                warn!(session_id, error = %e, "failed to remove checkpoint");
            }
        }
        info!(session_id, status = %session.status(), "client disconnected, session removed");
    }

    /// Import catalog data sources into the default store, one after another.
    pub async fn preload(&self, request: PreloadRequest) -> Result<Vec<PreloadOutcome>, ImportError> {
        request.validate()?;
        let sources: Vec<_> = self
            .catalog
            .select(&request)
            .map_err(|e| ValidationError(e.to_string()))?
            .into_iter()
            .cloned()
            .collect();

        let mut outcomes = Vec::with_capacity(sources.len());
        for ds in sources {
            let session_id = preload_session_id(&ds.id);
            info!(data_source = %ds.id, session_id = %session_id, "preloading data source");
            let request = ImportRequest {
                redis_con_url: Some(self.settings.default_store_url.clone()),
                socket_id: Some(session_id.clone()),
                id_field: ds.id_field.clone(),
                key_prefix: ds.key_prefix.clone(),
                js_function_string: ds.js_function_string.clone(),
                upload_type: ds.upload_type.clone(),
                upload_path: ds.upload_path.clone(),
                ..Default::default()
            };
            let outcome = match self.run(request).await {
                Ok(snapshot) => PreloadOutcome {
                    data_source_id: ds.id.clone(),
                    session_id: Some(snapshot.session_id),
                    status: snapshot.status,
                    stats: snapshot.stats,
                    error: snapshot.error,
                },
                Err(e) => {
                    warn!(data_source = %ds.id, error = %e, "preload failed");
                    PreloadOutcome {
                        data_source_id: ds.id.clone(),
                        session_id: None,
                        status: ImportStatus::Failed,
                        stats: ImportStats::default(),
                        error: Some(e.info()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    // ── Internals ─────────────────────────────────────────────────

    async fn lookup(&self, session_id: &str) -> Result<Arc<ImportSession>, ImportError> {
        if let Some(session) = self.registry.get(session_id) {
            return Ok(session);
        }
        match self.checkpoints.load(session_id).await? {
            Some(cp) => Ok(self.registry.get_or_insert(Arc::new(ImportSession::restore(cp)))),
            None => Err(SessionError::NotFound(session_id.to_string()).into()),
        }
    }

    /// Open the source at `cursor` and compile the transform.
    async fn prepare(
        &self,
        config: &SessionConfig,
        store: Arc<dyn loader_store::KeyValueStore>,
        cursor: u64,
    ) -> Result<RunResources, ImportError> {
        let upload_path = config.upload_path.clone();
        let upload_type = config.upload_type.clone();
        let upload_root = self.settings.upload_root.clone();
        let source = tokio::task::spawn_blocking(move || {
            let mut source = loader_ingest::open(&upload_path, upload_type.as_deref(), upload_root.as_deref())?;
            source.skip_to(cursor);
            Ok::<_, ImportError>(source)
        })
        .await
        .map_err(|e| ImportError::Internal(format!("source task failed: {}", e)))??;

        let transform = Transform::compile(config.transform_code.as_deref(), self.settings.limits)?;
        let writer = BatchWriter::new(store, self.settings.import.write_mode, self.settings.import.write_concurrency);
        Ok(RunResources {
            source,
            transform,
            writer,
        })
    }

    async fn fail_before_run(&self, session: &Arc<ImportSession>, err: ImportError) -> ImportError {
        warn!(session_id = %session.id(), kind = %err.kind(), error = %err, "import failed before reading");
        if let Err(e) = session.fail(err.info()) {
            warn!(session_id = %session.id(), error = %e, "could not mark session failed");
        }
        self.persist(session).await;
        self.report(session);
        self.retire_if_detached(session).await;
        err
    }

    async fn spawn_loop(&self, guard: LoopGuard, resources: RunResources) -> Result<ImportOutcome, ImportError> {
        let this = self.clone();
        let session = Arc::clone(guard.session());
        // The loop runs in its own task so an abandoned caller cannot cancel
        // it between a write and its checkpoint.
        match tokio::spawn(async move { this.drive(guard, resources).await }).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "import loop panicked");
                Err(ImportError::Internal(format!("import loop failed: {}", e)))
            }
        }
    }

    async fn drive(&self, guard: LoopGuard, resources: RunResources) -> ImportOutcome {
        let session = Arc::clone(guard.session());
        let RunResources {
            mut source,
            transform,
            writer,
        } = resources;
        let config = session.config();
        let batch_size = self.settings.import.batch_size.max(1);

        info!(
            session_id = %session.id(),
            cursor = session.cursor(),
            total = ?source.total_hint(),
            "import loop started"
        );
        self.report(&session);

        loop {
            match session.take_signal() {
                Signal::Pause => {
                    self.settle(&session, ImportStatus::Paused).await;
                    break;
                }
                Signal::Stop => {
                    self.settle(&session, ImportStatus::Stopped).await;
                    break;
                }
                Signal::None => {}
            }

            let started = Instant::now();
            let base = session.cursor();
            let read = tokio::task::spawn_blocking(move || {
                let batch = source.next_batch(batch_size);
                (source, batch)
            })
            .await;
            let batch = match read {
                Ok((returned, batch)) => {
                    source = returned;
                    batch
                }
                Err(e) => {
                    self.settle_failed(&session, ErrorInfo::new(ErrorKind::Internal, format!("source read failed: {}", e)))
                        .await;
                    break;
                }
            };

            if batch.is_empty() {
                if session.stats().total_files.is_none() {
                    session.set_total(Some(source.position()));
                }
                self.settle(&session, ImportStatus::Completed).await;
                break;
            }

            match self.process_batch(&session, &config, base, batch, &transform, &writer).await {
                BatchOutcome::ConnectionLost(err) => {
                    warn!(session_id = %session.id(), cursor = base, error = %err, "store connection lost");
                    self.settle_failed(&session, ImportError::Store(err).info()).await;
                    break;
                }
                BatchOutcome::Committed {
                    cursor,
                    mut delta,
                    first_error,
                    halt,
                } => {
                    delta.total_time_in_ms = started.elapsed().as_millis() as u64;
                    session.commit_batch(cursor, &delta);
                    if let Err(e) = self.checkpoints.save(&session.checkpoint()).await {
                        self.settle_failed(&session, ImportError::Checkpoint(e).info()).await;
                        break;
                    }
                    debug!(
                        session_id = %session.id(),
                        cursor,
                        processed = delta.processed,
                        failed = delta.failed,
                        skipped = delta.skipped,
                        "batch committed"
                    );
                    self.report(&session);

                    if halt {
                        let error = first_error
                            .unwrap_or_else(|| ErrorInfo::new(ErrorKind::Write, "record failed"));
                        self.settle_failed(&session, error).await;
                        break;
                    }
                }
            }
        }

        let stats = session.stats();
        info!(
            session_id = %session.id(),
            status = %session.status(),
            cursor = session.cursor(),
            processed = stats.processed,
            failed = stats.failed,
            skipped = stats.skipped,
            total_time_ms = stats.total_time_in_ms,
            "import loop finished"
        );
        let outcome = session.snapshot();
        drop(guard);
        self.retire_if_detached(&session).await;
        outcome
    }

    async fn process_batch(
        &self,
        session: &ImportSession,
        config: &SessionConfig,
        base: u64,
        batch: Vec<Result<serde_json::Value, RecordError>>,
        transform: &Transform,
        writer: &BatchWriter,
    ) -> BatchOutcome {
        let stop_on_error = config.stop_on_error;
        let id_field = config.id_field.as_deref();
        let mut end = base + batch.len() as u64;
        let mut pending = Vec::with_capacity(batch.len());
        let mut skipped: Vec<u64> = Vec::new();
        let mut failures: Vec<(u64, ErrorInfo)> = Vec::new();

        for (i, item) in batch.into_iter().enumerate() {
            let position = base + i as u64 + 1;
            let failure = match item {
                Err(e) => Some(ErrorInfo::new(ErrorKind::Source, e.to_string())),
                Ok(raw) => match transform.apply(raw, TransformContext { position, id_field }).await {
                    Ok(TransformOutcome::Record(record)) => {
                        let key = record_key(&record, id_field, position);
                        pending.push(PendingWrite { position, key, record });
                        None
                    }
                    Ok(TransformOutcome::Skip) => {
                        debug!(session_id = %session.id(), position, "record skipped by transform");
                        skipped.push(position);
                        None
                    }
                    Err(e) => Some(ErrorInfo::new(ErrorKind::Transform, e.to_string())),
                },
            };
            if let Some(info) = failure {
                warn!(session_id = %session.id(), position, kind = %info.kind, error = %info.message, "record failed");
                failures.push((position, info));
                if stop_on_error {
                    end = position;
                    break;
                }
            }
        }

        let result = writer.write_batch(pending, &config.key_prefix, stop_on_error).await;
        if let Some(err) = result.connection_error {
            return BatchOutcome::ConnectionLost(err);
        }
        for f in &result.failures {
            warn!(session_id = %session.id(), position = f.position, key = %f.key, error = %f.error, "write failed");
            failures.push((f.position, ErrorInfo::new(ErrorKind::Write, f.error.to_string())));
        }
        if let Some(at) = result.aborted_at() {
            end = end.min(at);
        }

        failures.retain(|(p, _)| *p <= end);
        failures.sort_by_key(|(p, _)| *p);
        let delta = ImportStats {
            total_files: None,
            processed: result.written,
            failed: failures.len() as u64,
            skipped: skipped.iter().filter(|p| **p <= end).count() as u64,
            total_time_in_ms: 0,
        };
        let halt = stop_on_error && !failures.is_empty();
        BatchOutcome::Committed {
            cursor: end,
            delta,
            first_error: failures.into_iter().next().map(|(_, e)| e),
            halt,
        }
    }

    /// Transition after the loop stops, then persist and report.
    async fn settle(&self, session: &ImportSession, to: ImportStatus) {
        if let Err(e) = session.transition(to) {
            warn!(session_id = %session.id(), error = %e, "unexpected session transition");
        }
        self.persist(session).await;
        self.report(session);
    }

    async fn settle_failed(&self, session: &ImportSession, error: ErrorInfo) {
        warn!(session_id = %session.id(), kind = %error.kind, error = %error.message, "import failed");
        if let Err(e) = session.fail(error) {
            warn!(session_id = %session.id(), error = %e, "unexpected session transition");
        }
        self.persist(session).await;
        self.report(session);
    }

    async fn persist(&self, session: &ImportSession) {
        if let Err(e) = self.checkpoints.save(&session.checkpoint()).await {
            warn!(session_id = %session.id(), error = %e, "failed to write checkpoint");
        }
    }

    fn report(&self, session: &ImportSession) {
        self.reporter.report(&session.snapshot());
    }

    /// Terminal sessions without a watching client are removed right away.
    async fn retire_if_detached(&self, session: &Arc<ImportSession>) {
        if !session.status().is_terminal() || self.reporter.is_connected(session.id()) {
            return;
        }
        if let Some(current) = self.registry.get(session.id()) {
            if Arc::ptr_eq(&current, session) {
                self.registry.remove(session.id());
            }
        }
        if !session.is_resumable() {
            if let Err(e) = self.checkpoints.remove(session.id()).await {
                warn!(session_id = %session.id(), error = %e, "failed to remove checkpoint");
            }
        }
        debug!(session_id = %session.id(), "detached session retired");
    }
}

fn snapshot_of(cp: &Checkpoint) -> ProgressSnapshot {
    ProgressSnapshot {
        session_id: cp.session_id.clone(),
        status: cp.status,
        cursor: cp.cursor,
        stats: cp.stats.clone(),
        error: cp.error.clone(),
    }
}

fn preload_session_id(data_source_id: &str) -> String {
    let slug: String = data_source_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("preload-{}-{}", slug, &suffix[..8])
}
