// Application facade driven by the view layer.
//
// Owns the context handle and the per-surface controllers, and manages
// the lifecycle of the quote fetch task: spawned on mount, cancelled on
// teardown, replaced on remount. All methods are async so embedding
// shells can call them from their own runtimes.
use crate::config::Config;
use crate::context::SharedContext;
use crate::model::{Habit, Progress};
use crate::quote::{CancelToken, FetchState, Quote, QuoteService, QuoteSlot, SharedQuoteSlot};
use crate::storage::LocalStorage;
use crate::store::{HabitStore, StoreError};
use crate::theme::{Palette, ThemeController};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct App {
    ctx: SharedContext,
    habits: Arc<Mutex<HabitStore>>,
    theme: Arc<Mutex<ThemeController>>,
    quote_slot: SharedQuoteSlot,
    quote_service: QuoteService,
    quote_token: Mutex<CancelToken>,
    quote_task: Mutex<Option<JoinHandle<()>>>,
    refreshing: Mutex<bool>,
}

impl App {
    /// Builds the facade over `ctx`, reading the quote endpoint from the
    /// stored configuration (defaults apply when no config file exists).
    pub fn new(ctx: SharedContext) -> Self {
        let config = Config::load_or_default(ctx.as_ref()).unwrap_or_else(|e| {
            log::warn!("Falling back to default config: {}", e);
            Config::default()
        });
        let service = QuoteService::from_config(&config);
        Self::with_service(ctx, service)
    }

    /// Builds the facade with an explicit quote service. Tests use this
    /// to point at a mock endpoint.
    pub fn with_service(ctx: SharedContext, quote_service: QuoteService) -> Self {
        Self {
            ctx,
            habits: Arc::new(Mutex::new(HabitStore::new())),
            theme: Arc::new(Mutex::new(ThemeController::new())),
            quote_slot: Arc::new(Mutex::new(QuoteSlot::new())),
            quote_service,
            quote_token: Mutex::new(CancelToken::new()),
            quote_task: Mutex::new(None),
            refreshing: Mutex::new(false),
        }
    }

    /// Startup sequence: theme preference first, then the habit list.
    pub async fn initialize(&self) {
        self.theme.lock().await.initialize(self.ctx.as_ref());
        self.habits.lock().await.initialize(self.ctx.as_ref());
    }

    // --- Habit surface ---

    /// Focus event on the habit screen. Reloads from storage so writes
    /// made from other surfaces (a settings reset) become visible.
    pub async fn focus_habits(&self) {
        self.habits.lock().await.initialize(self.ctx.as_ref());
    }

    pub async fn add_habit(&self, name: &str) -> Result<Habit, StoreError> {
        self.habits.lock().await.add(self.ctx.as_ref(), name)
    }

    pub async fn toggle_complete(&self, id: &str) -> Result<Option<bool>, StoreError> {
        self.habits.lock().await.toggle(self.ctx.as_ref(), id)
    }

    pub async fn delete_habit(&self, id: &str) -> Result<bool, StoreError> {
        self.habits.lock().await.delete(self.ctx.as_ref(), id)
    }

    /// Settings surface: empties the persisted list without touching the
    /// in-memory store. The habit screen picks the change up on its next
    /// focus reload; there is no push channel between the two.
    pub async fn reset_all(&self) -> Result<(), StoreError> {
        LocalStorage::save_habits(self.ctx.as_ref(), &[]).map_err(|e| {
            log::warn!("Failed to reset habit storage: {}", e);
            StoreError::Persist(e.to_string())
        })
    }

    pub async fn habits(&self) -> Vec<Habit> {
        self.habits.lock().await.habits().to_vec()
    }

    pub async fn progress(&self) -> Progress {
        self.habits.lock().await.progress()
    }

    pub async fn habits_loading(&self) -> bool {
        self.habits.lock().await.is_loading()
    }

    // --- Theme surface ---

    pub async fn toggle_theme(&self) -> Result<bool, StoreError> {
        self.theme.lock().await.toggle(self.ctx.as_ref())
    }

    pub async fn is_dark(&self) -> Option<bool> {
        self.theme.lock().await.is_dark()
    }

    pub async fn palette(&self) -> Option<&'static Palette> {
        self.theme.lock().await.palette()
    }

    pub async fn theme_loading(&self) -> bool {
        self.theme.lock().await.is_loading()
    }

    // --- Quote surface ---

    /// Mount path: invalidates whatever fetch the previous mount left
    /// behind and spawns the retrying fetch for this one.
    pub async fn fetch_quote(&self) {
        let token = {
            let mut current = self.quote_token.lock().await;
            current.cancel();
            *current = CancelToken::new();
            current.clone()
        };
        let mut task_guard = self.quote_task.lock().await;
        if let Some(handle) = task_guard.take() {
            handle.abort();
        }
        let service = self.quote_service.clone();
        let slot = Arc::clone(&self.quote_slot);
        let handle = tokio::spawn(async move {
            service.fetch_with_retry(slot, token).await;
        });
        *task_guard = Some(handle);
    }

    /// Manual refresh: a single attempt under the current mount's token,
    /// so a torn-down screen cannot resurrect quote state.
    pub async fn refresh_quote(&self) {
        let token = self.quote_token.lock().await.clone();
        self.quote_service
            .refresh(Arc::clone(&self.quote_slot), token)
            .await;
    }

    /// Teardown for the quote surface. After this returns, no further
    /// quote state commit can land.
    pub async fn shutdown(&self) {
        {
            let token = self.quote_token.lock().await;
            // Cancel while holding the slot lock: a commit that already
            // passed its token check finishes before we acquire the lock,
            // and every later commit observes the cancelled token.
            let _slot = self.quote_slot.lock().await;
            token.cancel();
        }
        if let Some(handle) = self.quote_task.lock().await.take() {
            handle.abort();
        }
    }

    /// Waits for the in-flight mount fetch, if any, to settle.
    pub async fn wait_for_quote(&self) {
        let handle = self.quote_task.lock().await.take();
        if let Some(handle) = handle {
            // Cancelled tasks surface a JoinError here; that is fine.
            let _ = handle.await;
        }
    }

    pub async fn quote(&self) -> Quote {
        self.quote_slot.lock().await.state.quote()
    }

    pub async fn quote_loading(&self) -> bool {
        self.quote_slot.lock().await.state.is_loading()
    }

    pub async fn quote_error(&self) -> bool {
        self.quote_slot.lock().await.state.is_offline()
    }

    /// Raw fetch state plus its revision counter, for diffing observers.
    pub async fn quote_state(&self) -> (FetchState, u64) {
        let slot = self.quote_slot.lock().await;
        (slot.state.clone(), slot.revision)
    }

    // --- Pull to refresh ---

    /// Reloads the habit list and refreshes the quote in one gesture.
    pub async fn refresh(&self) {
        *self.refreshing.lock().await = true;
        self.habits.lock().await.initialize(self.ctx.as_ref());
        self.refresh_quote().await;
        *self.refreshing.lock().await = false;
    }

    pub async fn is_refreshing(&self) -> bool {
        *self.refreshing.lock().await
    }
}
