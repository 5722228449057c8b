// ── Portal facade ──
//
// Owns the session for one account/plant and turns fetch requests into
// readings. Cycles are single-flight: the session sits behind an async
// mutex, so concurrent callers queue instead of interleaving logins and
// cookie use. On top of that sit the minimum refresh interval, stale
// serving on transient failures, and an optional background poller.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use esolar_api::{ChartWindow, PortalClient};

use crate::config::PortalConfig;
use crate::document::AggregateDocument;
use crate::error::{CoreError, ErrorKind, ExtractionError, FetchStep};
use crate::field::{FieldSchema, extract};
use crate::sequencer::{CycleIds, FetchState, Sequencer};
use crate::snapshot::Snapshot;

// ── Reading ──────────────────────────────────────────────────────────

/// The product of one successful fetch cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub fetched_at: DateTime<Utc>,
    pub ids: CycleIds,
    pub fields: Snapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ExtractionError>,
    /// Merged raw responses, kept for diagnostics.
    #[serde(skip)]
    pub document: AggregateDocument,
}

/// Where the reading handed to a caller came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReadingSource {
    /// Produced by a cycle run for this request.
    Fresh,
    /// Served from cache because the last good cycle is younger than the
    /// minimum refresh interval.
    Cached,
    /// Served from cache because this cycle failed with a retryable error.
    Stale { kind: ErrorKind, error: String },
}

/// A reading plus its provenance.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub reading: Arc<Reading>,
    pub source: ReadingSource,
}

impl Fetched {
    pub fn is_fresh(&self) -> bool {
        self.source == ReadingSource::Fresh
    }
}

// ── Portal ───────────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<PortalInner>`; clones share the session,
/// the cache and the background poller.
#[derive(Clone)]
pub struct Portal {
    inner: Arc<PortalInner>,
}

struct PortalInner {
    config: PortalConfig,
    schema: FieldSchema,
    session: Mutex<Session>,
    latest: ArcSwapOption<Reading>,
    state: watch::Sender<FetchState>,
    readings: watch::Sender<Option<Arc<Reading>>>,
    cancel: CancellationToken,
}

/// Everything guarded by the single-flight lock.
struct Session {
    client: PortalClient,
    last_good: Option<(Arc<Reading>, Instant)>,
}

impl Portal {
    /// Build the session client and field schema. Makes no request.
    pub fn new(config: PortalConfig) -> Result<Self, CoreError> {
        let client = PortalClient::new(
            config.provider.clone(),
            config.credentials.clone(),
            &config.transport,
        )?;

        let mut schema = FieldSchema::for_variant(config.variant, config.plant_index);
        if let Some(ref keys) = config.fields {
            let unknown = schema.retain_keys(keys);
            if !unknown.is_empty() {
                warn!(
                    variant = %config.variant,
                    unknown = ?unknown,
                    "ignoring fields the plant variant does not report"
                );
            }
        }

        let (state, _) = watch::channel(FetchState::Idle);
        let (readings, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(PortalInner {
                config,
                schema,
                session: Mutex::new(Session {
                    client,
                    last_good: None,
                }),
                latest: ArcSwapOption::empty(),
                state,
                readings,
                cancel: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Fields every reading of this portal carries.
    pub fn schema(&self) -> &FieldSchema {
        &self.inner.schema
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Fetch a reading, bounded by the configured cycle timeout.
    pub async fn fetch(&self) -> Result<Fetched, CoreError> {
        self.fetch_with(self.inner.config.cycle_timeout, &CancellationToken::new())
            .await
    }

    /// Fetch a reading with an explicit timeout and cancellation token.
    ///
    /// Honors the minimum refresh interval. Aborting (timeout or
    /// cancellation) drops the partial document; the session and cache are
    /// left as they were.
    pub async fn fetch_with(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Fetched, CoreError> {
        self.run(timeout, cancel, false).await
    }

    /// Run a cycle now, ignoring the minimum refresh interval.
    pub async fn refresh(&self) -> Result<Fetched, CoreError> {
        self.run(self.inner.config.cycle_timeout, &CancellationToken::new(), true)
            .await
    }

    async fn run(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
        force: bool,
    ) -> Result<Fetched, CoreError> {
        let mut session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            guard = self.inner.session.lock() => guard,
        };

        let min_interval = self.inner.config.min_refresh_interval;
        if !force && !min_interval.is_zero() {
            if let Some((reading, at)) = &session.last_good {
                if at.elapsed() < min_interval {
                    debug!(age = ?at.elapsed(), "serving cached reading");
                    return Ok(Fetched {
                        reading: Arc::clone(reading),
                        source: ReadingSource::Cached,
                    });
                }
            }
        }

        let result = self.cycle(&session.client, timeout, cancel).await;

        match result {
            Ok(reading) => {
                let reading = Arc::new(reading);
                session.last_good = Some((Arc::clone(&reading), Instant::now()));
                self.inner.latest.store(Some(Arc::clone(&reading)));
                self.inner.readings.send_replace(Some(Arc::clone(&reading)));
                Ok(Fetched {
                    reading,
                    source: ReadingSource::Fresh,
                })
            }
            Err(err) => {
                if err.is_auth() {
                    session.client.invalidate();
                }
                self.serve_stale(&session, err)
            }
        }
    }

    async fn cycle(
        &self,
        client: &PortalClient,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Reading, CoreError> {
        let config = &self.inner.config;
        let sequencer = Sequencer::new(
            client,
            config.variant,
            config.plant_index,
            config.login_policy,
            ChartWindow::today(),
            &self.inner.state,
        );

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("fetch cycle cancelled");
                self.inner.state.send_replace(FetchState::Idle);
                return Err(CoreError::Cancelled);
            }
            outcome = tokio::time::timeout(timeout, sequencer.run()) => match outcome {
                Ok(result) => result?,
                Err(_) => {
                    let step = match *self.inner.state.borrow() {
                        FetchState::FetchingBase(step)
                        | FetchState::FetchingVariantExtras(step)
                        | FetchState::Failed(step) => step,
                        _ => FetchStep::Login,
                    };
                    self.inner.state.send_replace(FetchState::Failed(step));
                    return Err(CoreError::Timeout {
                        step,
                        timeout_secs: timeout.as_secs(),
                    });
                }
            },
        };

        let extraction = extract(&output.document, self.inner.schema.iter());
        if !extraction.errors.is_empty() {
            warn!(
                count = extraction.errors.len(),
                "some fields could not be read"
            );
        }

        Ok(Reading {
            fetched_at: Utc::now(),
            ids: output.ids,
            fields: extraction.snapshot,
            errors: extraction.errors,
            document: output.document,
        })
    }

    fn serve_stale(&self, session: &Session, err: CoreError) -> Result<Fetched, CoreError> {
        let Some(grace) = self.inner.config.stale_grace else {
            return Err(err);
        };
        if !err.is_retryable() {
            return Err(err);
        }
        match &session.last_good {
            Some((reading, at)) if at.elapsed() <= grace => {
                warn!(error = %err, age = ?at.elapsed(), "cycle failed, serving last good reading");
                Ok(Fetched {
                    reading: Arc::clone(reading),
                    source: ReadingSource::Stale {
                        kind: err.kind(),
                        error: err.to_string(),
                    },
                })
            }
            _ => Err(err),
        }
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Submit the login form once and report whether the portal accepted
    /// the credentials.
    pub async fn verify_login(&self) -> Result<(), CoreError> {
        let session = self.inner.session.lock().await;
        session.client.login().await?;
        info!(account = %self.inner.config.account_id(), "login verified");
        Ok(())
    }

    /// Drop the session cookies; the next cycle starts with a fresh login.
    pub async fn reset_session(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        session.client.reset()?;
        Ok(())
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Last good reading, without waiting for a running cycle.
    pub fn latest(&self) -> Option<Arc<Reading>> {
        self.inner.latest.load_full()
    }

    /// Subscribe to new readings.
    pub fn readings(&self) -> watch::Receiver<Option<Arc<Reading>>> {
        self.inner.readings.subscribe()
    }

    /// Subscribe to cycle progress.
    pub fn state(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Fetch every `period` until [`shutdown`](Self::shutdown).
    ///
    /// The first cycle runs immediately and new readings arrive through
    /// [`readings`](Self::readings). Transport and API failures are logged
    /// and the loop carries on, as does an expired session (the next cycle
    /// logs in again). A rejected login stops the loop:
    /// the task resolves to that error so the caller can ask for new
    /// credentials instead of resubmitting rejected ones every tick.
    pub fn spawn_polling(&self, period: Duration) -> JoinHandle<Result<(), CoreError>> {
        let portal = self.clone();
        let cancel = self.inner.cancel.child_token();
        tokio::spawn(poll_task(portal, period, cancel))
    }

    /// Stop background polling and abort any cycle it is running.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

async fn poll_task(
    portal: Portal,
    period: Duration,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let timeout = portal.inner.config.cycle_timeout;
                match portal.fetch_with(timeout, &cancel).await {
                    Ok(fetched) => {
                        debug!(source = ?fetched.source, "poll complete");
                    }
                    Err(CoreError::Cancelled) => break,
                    Err(e) if e.is_login_rejected() => {
                        warn!(error = %e, "poll stopped, credentials rejected");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(error = %e, kind = %e.kind(), "poll failed");
                    }
                }
            }
        }
    }
    debug!("poll task stopped");
    Ok(())
}
