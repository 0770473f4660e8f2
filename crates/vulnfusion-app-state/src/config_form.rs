use async_trait::async_trait;

use vulnfusion_client_core::{ConsoleApi, ConsoleError, DingBotConfig, SyncTaskConfig};

pub const SYNC_INTERVAL_MINUTES: std::ops::RangeInclusive<u32> = 1..=1440;

/// One singleton configuration record on the backend, seen through the
/// gateway. `normalize` is the client-side clamp applied right before a save;
/// the backend stays the final validator.
#[async_trait]
pub trait ConfigEndpoint: Send + Sync {
    type Record: Clone + Default + PartialEq + Send + Sync;
    const NAME: &'static str;

    async fn load(api: &dyn ConsoleApi) -> Result<Option<Self::Record>, ConsoleError>;
    async fn save(api: &dyn ConsoleApi, record: &Self::Record) -> Result<(), ConsoleError>;

    fn normalize(_record: &mut Self::Record) {}
}

pub struct SyncTaskEndpoint;

#[async_trait]
impl ConfigEndpoint for SyncTaskEndpoint {
    type Record = SyncTaskConfig;
    const NAME: &'static str = "sync_data_task";

    async fn load(api: &dyn ConsoleApi) -> Result<Option<Self::Record>, ConsoleError> {
        api.get_sync_task().await
    }

    async fn save(api: &dyn ConsoleApi, record: &Self::Record) -> Result<(), ConsoleError> {
        api.save_sync_task(record).await.map(|_| ())
    }

    fn normalize(record: &mut Self::Record) {
        record.interval_minutes = record
            .interval_minutes
            .clamp(*SYNC_INTERVAL_MINUTES.start(), *SYNC_INTERVAL_MINUTES.end());
    }
}

pub struct DingBotEndpoint;

#[async_trait]
impl ConfigEndpoint for DingBotEndpoint {
    type Record = DingBotConfig;
    const NAME: &'static str = "ding_bot_config";

    async fn load(api: &dyn ConsoleApi) -> Result<Option<Self::Record>, ConsoleError> {
        api.get_bot_config().await
    }

    async fn save(api: &dyn ConsoleApi, record: &Self::Record) -> Result<(), ConsoleError> {
        api.save_bot_config(record).await.map(|_| ())
    }
}

/// Load-on-mount, edit, submit, reload-on-success. One save in flight at a
/// time; a failed save leaves the draft exactly as submitted so the operator
/// can retry without retyping.
pub struct ConfigFormController<E: ConfigEndpoint> {
    draft: E::Record,
    loading: bool,
    saving: bool,
    error: Option<String>,
    success: Option<String>,
}

impl<E: ConfigEndpoint> Default for ConfigFormController<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ConfigEndpoint> ConfigFormController<E> {
    pub fn new() -> Self {
        Self {
            draft: E::Record::default(),
            loading: false,
            saving: false,
            error: None,
            success: None,
        }
    }

    /// Fetches the authoritative record and replaces the draft with it. An
    /// absent record (the singleton may not exist yet) keeps the defaults.
    pub async fn load(&mut self, api: &dyn ConsoleApi) {
        self.loading = true;
        self.error = None;
        match E::load(api).await {
            Ok(Some(record)) => {
                self.draft = record;
            }
            Ok(None) => {}
            Err(ConsoleError::AuthExpired) => {}
            Err(err) => {
                self.error = Some(err.user_message());
            }
        }
        self.loading = false;
    }

    /// Submits the full draft. No-op while a save is already in flight. On
    /// success the authoritative record is re-fetched immediately so any
    /// server-side normalization lands in the draft.
    pub async fn submit(&mut self, api: &dyn ConsoleApi) {
        if self.saving {
            return;
        }
        self.saving = true;
        self.error = None;
        self.success = None;

        E::normalize(&mut self.draft);
        match E::save(api, &self.draft).await {
            Ok(()) => {
                self.success = Some("saved".to_string());
                match E::load(api).await {
                    Ok(Some(record)) => {
                        self.draft = record;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(
                            endpoint = E::NAME,
                            error = %err,
                            "reload after save failed, keeping submitted draft"
                        );
                    }
                }
            }
            Err(ConsoleError::AuthExpired) => {}
            Err(err) => {
                self.error = Some(err.user_message());
            }
        }
        self.saving = false;
    }

    pub fn draft(&self) -> &E::Record {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut E::Record {
        &mut self.draft
    }

    pub fn set_draft(&mut self, record: E::Record) {
        self.draft = record;
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_interval_is_clamped_to_documented_range() {
        let mut record = SyncTaskConfig {
            name: "hourly".to_string(),
            interval_minutes: 0,
            status: true,
        };
        SyncTaskEndpoint::normalize(&mut record);
        assert_eq!(record.interval_minutes, 1);

        record.interval_minutes = 9999;
        SyncTaskEndpoint::normalize(&mut record);
        assert_eq!(record.interval_minutes, 1440);

        record.interval_minutes = 60;
        SyncTaskEndpoint::normalize(&mut record);
        assert_eq!(record.interval_minutes, 60);
    }

    #[test]
    fn bot_endpoint_has_no_client_side_normalization() {
        let mut record = DingBotConfig {
            access_token: "tok".to_string(),
            secret_token: "sec".to_string(),
            status: true,
        };
        let before = record.clone();
        DingBotEndpoint::normalize(&mut record);
        assert_eq!(record, before);
    }
}
