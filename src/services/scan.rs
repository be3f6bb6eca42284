//! Scan-authorization workflow
//!
//! An operator submits a name and a plate, the service switches the shared
//! `scanMode` flag on and waits for the gate reader to publish a tag in
//! `lastScannedUID`. The tag is checked against the authorized collection
//! and, if it is new, authorized for that name and plate.
//!
//! ```text
//! Idle -> FormOpen -> Validating -> AwaitingScan -> Processing
//!      -> Success | DuplicateError | WriteError -> (display delay) -> Idle
//! ```
//!
//! Every terminal path, cancellation included, ends with `scanMode = false`,
//! `lastScannedUID = ""` and the listener dropped. At most one session
//! exists per service instance.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use validator::Validate;

use crate::{
    config::ScanConfig,
    error::{AppError, AppResult},
    models::{AuthorizedUid, Notice, ReservationRequest, ScanPhase, ScanStatus},
    realtime::Subscription,
    repository::{scan_channel::scanned_uid, Repository},
};

pub const FILL_ALL_FIELDS: &str = "Please fill all fields.";
pub const NAME_OR_PLATE_TAKEN: &str = "Name or plate already registered under a different UID.";
pub const PLEASE_SCAN: &str = "Please scan a tag to reserve.";
pub const START_FAILED: &str = "Failed to start scan mode.";
pub const AUTHORIZE_FAILED: &str = "Failed to authorize UID.";
pub const LISTENER_LOST: &str = "Lost connection while waiting for a scan.";

/// How long duplicate-error notices stay up before closing themselves
const ERROR_NOTICE_MS: u64 = 2500;

#[derive(Default)]
struct ScanSession {
    phase: ScanPhase,
    request: Option<ReservationRequest>,
    uid: Option<String>,
    notice: Option<Notice>,
    worker: Option<JoinHandle<()>>,
}

impl ScanSession {
    fn status(&self) -> ScanStatus {
        ScanStatus {
            phase: self.phase,
            name: self.request.as_ref().map(|r| r.name.clone()),
            plate: self.request.as_ref().map(|r| r.plate.clone()),
            uid: self.uid.clone(),
            notice: self.notice.clone(),
        }
    }

    fn reset(&mut self) {
        *self = ScanSession::default();
    }
}

#[derive(Clone)]
pub struct ScanService {
    repository: Repository,
    config: ScanConfig,
    session: Arc<Mutex<ScanSession>>,
    status: Arc<watch::Sender<ScanStatus>>,
}

impl ScanService {
    pub fn new(repository: Repository, config: ScanConfig) -> Self {
        let (status, _) = watch::channel(ScanStatus::default());
        Self {
            repository,
            config,
            session: Arc::new(Mutex::new(ScanSession::default())),
            status: Arc::new(status),
        }
    }

    /// Latest published status
    pub fn status(&self) -> ScanStatus {
        self.status.borrow().clone()
    }

    /// Follow status changes
    pub fn watch(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }

    fn publish(&self, session: &ScanSession) {
        self.status.send_replace(session.status());
    }

    /// Operator opens the reservation form
    pub async fn open_form(&self) -> AppResult<ScanStatus> {
        let mut session = self.session.lock().await;
        if session.phase.is_active() {
            return Err(AppError::ScanInProgress("A scan is already in progress.".to_string()));
        }
        session.reset();
        session.phase = ScanPhase::FormOpen;
        self.publish(&session);
        Ok(session.status())
    }

    /// Operator dismisses the reservation form; entered fields are dropped
    pub async fn close_form(&self) -> AppResult<ScanStatus> {
        let mut session = self.session.lock().await;
        match session.phase {
            ScanPhase::FormOpen | ScanPhase::Idle => {
                session.reset();
                self.publish(&session);
                Ok(session.status())
            }
            _ => Err(AppError::ScanInProgress(
                "A scan is in progress; cancel the scan instead.".to_string(),
            )),
        }
    }

    /// Operator confirms the form: validate, then wait for a tag
    pub async fn start(&self, request: ReservationRequest) -> AppResult<ScanStatus> {
        let request = request.trimmed();
        {
            let mut session = self.session.lock().await;
            if session.phase.is_active() {
                return Err(AppError::ScanInProgress(
                    "A scan is already in progress. Cancel it first.".to_string(),
                ));
            }
            if request.validate().is_err() {
                session.phase = ScanPhase::FormOpen;
                session.notice = Some(Notice::error(FILL_ALL_FIELDS));
                self.publish(&session);
                return Err(AppError::Validation(FILL_ALL_FIELDS.to_string()));
            }
            session.reset();
            session.phase = ScanPhase::Validating;
            session.request = Some(request.clone());
            self.publish(&session);
        }
        tracing::info!("Reservation requested: name={}, plate={}", request.name, request.plate);

        let existing = match self.repository.authorized_uids.all().await {
            Ok(existing) => existing,
            Err(e) => {
                self.cleanup(Some(Notice::error(START_FAILED))).await;
                return Err(AppError::remote(START_FAILED, e));
            }
        };
        if existing
            .values()
            .any(|r| r.name == request.name || r.plate == request.plate)
        {
            let mut session = self.session.lock().await;
            session.phase = ScanPhase::FormOpen;
            session.notice = Some(Notice::error(NAME_OR_PLATE_TAKEN).auto_close("Okay", ERROR_NOTICE_MS));
            self.publish(&session);
            tracing::info!("Reservation rejected: name or plate already registered");
            return Err(AppError::Conflict(NAME_OR_PLATE_TAKEN.to_string()));
        }

        let subscription = match self.enter_scan_mode().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.cleanup(Some(Notice::error(START_FAILED))).await;
                return Err(AppError::remote(START_FAILED, e));
            }
        };

        let mut session = self.session.lock().await;
        session.phase = ScanPhase::AwaitingScan;
        session.notice = Some(Notice::info(PLEASE_SCAN));
        let worker = self.clone();
        session.worker = Some(tokio::spawn(async move {
            worker.await_scan(subscription, request).await;
        }));
        self.publish(&session);
        tracing::info!("Scan mode enabled, waiting for a tag");
        Ok(session.status())
    }

    async fn enter_scan_mode(&self) -> Result<Subscription, crate::realtime::StoreError> {
        let channel = &self.repository.scan_channel;
        channel.clear_last_scanned().await?;
        channel.set_scan_mode(true).await?;
        channel.subscribe_last_scanned().await
    }

    /// Operator gives up waiting for a tag
    pub async fn cancel(&self) -> AppResult<ScanStatus> {
        {
            let mut session = self.session.lock().await;
            match session.phase {
                ScanPhase::AwaitingScan => {
                    if let Some(worker) = session.worker.take() {
                        worker.abort();
                    }
                }
                ScanPhase::Idle | ScanPhase::FormOpen => {
                    return Err(AppError::NotFound("No scan in progress.".to_string()));
                }
                _ => {
                    return Err(AppError::ScanInProgress(
                        "The scanned tag is already being processed.".to_string(),
                    ));
                }
            }
        }
        tracing::info!("Scan cancelled by operator");
        self.cleanup(None).await;
        Ok(self.status())
    }

    /// Wait for the first new tag, process it, show the outcome, clean up
    async fn await_scan(self, mut subscription: Subscription, request: ReservationRequest) {
        let (phase, notice) = loop {
            let Some(value) = subscription.next().await else {
                tracing::warn!("Listener on {} stopped while waiting for a scan", subscription.path());
                break (ScanPhase::WriteError, Notice::error(LISTENER_LOST));
            };
            let Some(uid) = scanned_uid(value.as_ref()) else {
                continue;
            };

            {
                let mut session = self.session.lock().await;
                if session.phase != ScanPhase::AwaitingScan {
                    return;
                }
                session.uid = Some(uid.clone());
                session.phase = ScanPhase::Processing;
                self.publish(&session);
            }
            tracing::info!("Tag {} scanned", uid);
            break self.authorize(&uid, &request).await;
        };

        {
            let mut session = self.session.lock().await;
            session.phase = phase;
            session.notice = Some(notice);
            self.publish(&session);
        }
        self.hold_outcome(&mut subscription).await;
        subscription.cancel();
        self.cleanup(None).await;
    }

    /// Keep the outcome up for the display delay
    ///
    /// The listener stays open so that tags scanned meanwhile, repeats of the
    /// processed one included, are consumed and ignored.
    async fn hold_outcome(&self, subscription: &mut Subscription) {
        let display = tokio::time::sleep(Duration::from_millis(self.config.result_display_ms));
        tokio::pin!(display);
        loop {
            tokio::select! {
                _ = &mut display => return,
                value = subscription.next() => match value {
                    Some(value) => {
                        if let Some(uid) = scanned_uid(value.as_ref()) {
                            tracing::debug!("Ignoring tag {} scanned after the outcome", uid);
                        }
                    }
                    None => {
                        (&mut display).await;
                        return;
                    }
                },
            }
        }
    }

    /// Check the scanned tag against the collection and write its record
    async fn authorize(&self, uid: &str, request: &ReservationRequest) -> (ScanPhase, Notice) {
        let existing = match self.repository.authorized_uids.all().await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!("Failed to read authorized UIDs: {}", e);
                return (ScanPhase::WriteError, Notice::error(AUTHORIZE_FAILED));
            }
        };

        if existing.contains_key(uid) {
            tracing::info!("Tag {} is already registered", uid);
            return (
                ScanPhase::DuplicateError,
                Notice::error(format!("UID {} is already registered.", uid)).auto_close("Okay", ERROR_NOTICE_MS),
            );
        }
        // Another operator may have registered the same name or plate since validation.
        if existing
            .iter()
            .any(|(key, r)| key != uid && (r.name == request.name || r.plate == request.plate))
        {
            return (
                ScanPhase::DuplicateError,
                Notice::error(NAME_OR_PLATE_TAKEN).auto_close("Okay", ERROR_NOTICE_MS),
            );
        }

        let record = AuthorizedUid::new(&request.name, &request.plate, Utc::now().timestamp_millis());
        match self.repository.authorized_uids.put(uid, &record).await {
            Ok(()) => {
                tracing::info!("Tag {} authorized for {} ({})", uid, request.name, request.plate);
                (ScanPhase::Success, Notice::success(format!("UID {} authorized", uid)))
            }
            Err(e) => {
                tracing::error!("Failed to write authorized UID {}: {}", uid, e);
                (ScanPhase::WriteError, Notice::error(AUTHORIZE_FAILED))
            }
        }
    }

    /// Leave scan mode and return to idle
    ///
    /// Remote failures are logged; the local session is reset regardless.
    async fn cleanup(&self, notice: Option<Notice>) {
        let channel = &self.repository.scan_channel;
        let (mode, last) = tokio::join!(channel.set_scan_mode(false), channel.clear_last_scanned());
        if let Err(e) = mode {
            tracing::error!("Failed to disable scan mode: {}", e);
        }
        if let Err(e) = last {
            tracing::error!("Failed to clear last scanned UID: {}", e);
        }

        let mut session = self.session.lock().await;
        session.reset();
        session.notice = notice;
        self.publish(&session);
        tracing::debug!("Scan session cleared");
    }
}
