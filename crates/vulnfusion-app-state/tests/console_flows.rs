//! Controller flows against a scripted in-memory gateway: the config
//! save cycle, the central 401 handling, and the list flow end to end.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use vulnfusion_app_state::{
    CatalogController, ConfigFormController, FilterEdit, GuardDecision, RouteGuard,
    SyncTaskEndpoint, VulnCatalog,
};
use vulnfusion_client_core::{
    ConsoleApi, ConsoleError, DingBotConfig, LoginResponse, NoticeSummary, Page,
    PluginDescriptor, SaveReceipt, SessionStore, Severity, SyncTaskConfig, VulnerabilityDetail,
    VulnerabilitySummary,
};

fn sample_vuln(id: i64, title: &str) -> VulnerabilitySummary {
    VulnerabilitySummary {
        id,
        key: format!("vuln-{id}"),
        title: title.to_string(),
        severity: Severity::Critical,
        cve: "CVE-2021-44228".to_string(),
        source: "avd".to_string(),
        tags: vec!["rce".to_string()],
        pushed: false,
        updated_at: Utc.with_ymd_and_hms(2021, 12, 10, 0, 0, 0).unwrap(),
    }
}

/// Scripted gateway. Mimics the real gateway's contract: on a 401-equivalent
/// it clears the session before surfacing `AuthExpired`.
#[derive(Default)]
struct FakeApi {
    session: Option<Arc<SessionStore>>,
    vulns: Mutex<Page<VulnerabilitySummary>>,
    sync_task: Mutex<Option<SyncTaskConfig>>,
    save_failure: Mutex<Option<ConsoleError>>,
    unauthorized: AtomicBool,
    block_saves: AtomicBool,
    save_gate: Notify,
    save_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeApi {
    fn expire_session(&self) -> ConsoleError {
        if let Some(session) = &self.session {
            session.clear();
        }
        ConsoleError::AuthExpired
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn authenticate(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<LoginResponse, ConsoleError> {
        Err(ConsoleError::RequestFailed {
            message: "not scripted".to_string(),
        })
    }

    async fn list_vulnerabilities(
        &self,
        _query: &[(String, String)],
    ) -> Result<Page<VulnerabilitySummary>, ConsoleError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(self.expire_session());
        }
        Ok(self.vulns.lock().unwrap().clone())
    }

    async fn get_vulnerability(&self, _id: i64) -> Result<VulnerabilityDetail, ConsoleError> {
        Err(ConsoleError::NotFound)
    }

    async fn list_notices(
        &self,
        _query: &[(String, String)],
    ) -> Result<Page<NoticeSummary>, ConsoleError> {
        Ok(Page::default())
    }

    async fn get_sync_task(&self) -> Result<Option<SyncTaskConfig>, ConsoleError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(self.expire_session());
        }
        Ok(self.sync_task.lock().unwrap().clone())
    }

    async fn save_sync_task(&self, cfg: &SyncTaskConfig) -> Result<SaveReceipt, ConsoleError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_saves.load(Ordering::SeqCst) {
            self.save_gate.notified().await;
        }
        if let Some(err) = self.save_failure.lock().unwrap().clone() {
            return Err(err);
        }
        // server-side normalization: names are stored trimmed
        let mut stored = cfg.clone();
        stored.name = stored.name.trim().to_string();
        *self.sync_task.lock().unwrap() = Some(stored);
        Ok(SaveReceipt { id: 1 })
    }

    async fn get_bot_config(&self) -> Result<Option<DingBotConfig>, ConsoleError> {
        Ok(None)
    }

    async fn save_bot_config(&self, _cfg: &DingBotConfig) -> Result<SaveReceipt, ConsoleError> {
        Ok(SaveReceipt { id: 1 })
    }

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, ConsoleError> {
        Ok(Vec::new())
    }

    async fn list_notice_sources(&self) -> Result<Vec<PluginDescriptor>, ConsoleError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn list_flow_applies_latest_response() {
    let api = FakeApi::default();
    *api.vulns.lock().unwrap() = Page {
        data: vec![sample_vuln(1, "Log4j RCE"), sample_vuln(2, "Log4j DoS")],
        total_count: 2,
    };

    let mut controller = CatalogController::<VulnCatalog>::new();
    let ticket = controller.edit(FilterEdit::Title("Log4j".to_string())).unwrap();
    controller.run(&api, ticket).await;

    assert_eq!(controller.rows().len(), 2);
    assert_eq!(controller.total_count(), 2);
    assert_eq!(controller.total_pages(), 1);
    assert!(!controller.can_next());
    assert!(!controller.can_prev());
    assert!(controller.error().is_none());
}

#[tokio::test]
async fn authorization_failure_forces_login_from_any_controller() {
    let session = Arc::new(SessionStore::in_memory());
    session.set_token("tok").unwrap();
    let navigated = Arc::new(AtomicBool::new(false));
    let flag = navigated.clone();
    session.set_on_cleared(move || {
        flag.store(true, Ordering::SeqCst);
    });

    let api = FakeApi {
        session: Some(session.clone()),
        ..FakeApi::default()
    };
    api.unauthorized.store(true, Ordering::SeqCst);

    // originating from the catalog controller
    let mut catalog = CatalogController::<VulnCatalog>::new();
    let ticket = catalog.refresh();
    catalog.run(&api, ticket).await;

    assert!(navigated.load(Ordering::SeqCst), "hook must hard-navigate");
    assert!(!session.is_authenticated());
    assert!(catalog.error().is_none(), "auth expiry is not a view error");

    // the next guarded render lands on login
    let mut guard = RouteGuard::new();
    guard.resolve(&session);
    assert_eq!(guard.decision(), GuardDecision::RedirectToLogin);

    // originating from a config controller behaves the same
    session.set_token("tok2").unwrap();
    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.load(&api).await;
    assert!(!session.is_authenticated());
    assert!(form.error().is_none());
}

#[tokio::test]
async fn config_cycle_reloads_normalized_record_on_success() {
    let api = FakeApi::default();
    *api.sync_task.lock().unwrap() = Some(SyncTaskConfig {
        name: "daily".to_string(),
        interval_minutes: 120,
        status: true,
    });

    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.load(&api).await;
    assert_eq!(form.draft().name, "daily");
    assert_eq!(form.draft().interval_minutes, 120);

    form.draft_mut().name = "  hourly  ".to_string();
    form.draft_mut().interval_minutes = 9999;
    form.submit(&api).await;

    assert_eq!(form.success(), Some("saved"));
    assert!(form.error().is_none());
    // client clamp + server trim both reconciled into the draft
    assert_eq!(form.draft().name, "hourly");
    assert_eq!(form.draft().interval_minutes, 1440);
}

#[tokio::test]
async fn failed_save_preserves_submitted_draft() {
    let api = FakeApi::default();
    *api.save_failure.lock().unwrap() = Some(ConsoleError::ValidationRejected {
        message: "Name is invalid: must not be empty".to_string(),
    });

    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.draft_mut().name = String::new();
    form.draft_mut().interval_minutes = 30;
    form.submit(&api).await;

    assert_eq!(form.error(), Some("Name is invalid: must not be empty"));
    assert!(form.success().is_none());
    assert_eq!(form.draft().name, "");
    assert_eq!(form.draft().interval_minutes, 30);

    // retry after the failure goes back out unchanged
    *api.save_failure.lock().unwrap() = None;
    form.draft_mut().name = "fixed".to_string();
    form.submit(&api).await;
    assert_eq!(form.success(), Some("saved"));
}

#[tokio::test]
async fn submit_is_a_no_op_while_a_save_is_in_flight() {
    let api = FakeApi::default();
    api.block_saves.store(true, Ordering::SeqCst);

    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.draft_mut().name = "task".to_string();

    {
        let mut pending = Box::pin(form.submit(&api));
        assert!(futures::poll!(pending.as_mut()).is_pending());
        // abandon the in-flight submit; the saving flag stays set
    }

    form.submit(&api).await;
    assert_eq!(api.save_calls.load(Ordering::SeqCst), 1);
    assert!(form.saving(), "first save is still considered in flight");
}
