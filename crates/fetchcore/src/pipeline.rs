//! Request and choice handling.
//!
//! A URL message either completes in one go (plan, download, deliver) or stops at a
//! quality menu and resumes when the owner presses a button. Both paths run under the
//! chat's gate; a busy chat gets a short notice and nothing else happens.

use std::sync::Arc;

use crate::core::config::{self, Settings};
use crate::core::error::{AppError, AppResult};
use crate::core::process::ProcessRunner;
use crate::core::types::{ConversationId, SenderId};
use crate::core::utils::{build_caption, extract_url};
use crate::delivery::dispatcher::Dispatcher;
use crate::delivery::transport::{StatusHandle, Transport};
use crate::download::executor::Executor;
use crate::download::planner::{DownloadMode, DownloadPlan, Planner};
use crate::download::platform::{classify, ClassifiedUrl};
use crate::download::quality::{menu_heights, parse_callback, QualityChoice, QualityMenu};
use crate::jobs::{ChatLocks, JobRegistry, PendingChoice, Rejection};
use tokio::sync::OwnedMutexGuard;

/// User-facing texts.
pub mod messages {
    pub const IN_PROGRESS: &str = "🔄 In progress…";
    pub const DOWNLOADING: &str = "⬇️ Downloading…";
    pub const BUSY: &str = "⏳ Still downloading your previous link. Please wait until it finishes.";
    pub const CHOOSE_QUALITY: &str = "Choose quality:";
    pub const CANCELLED: &str = "🚫 Cancelled.";
    pub const DONE: &str = "✅ Done.";
    pub const EXPIRED: &str = "This menu has expired. Send the link again.";
    pub const INVALID_CHOICE: &str = "Invalid choice";
    pub const TRANSPORT_TIMEOUT: &str =
        "⚠️ Telegram took too long to answer. The file may have arrived anyway, please check the chat.";
}

/// What happened to a URL message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// No URL in the text
    Ignored,
    /// The chat already has a job running
    Busy,
    MenuPresented { token: String },
    Completed { files: usize },
    /// The user was told; details are in the log
    Failed,
}

/// What happened to a quality button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Malformed,
    Rejected(Rejection),
    Cancelled,
    /// The chat is busy; the menu stays valid
    Busy,
    Completed { files: usize },
    Failed,
}

/// A choice that passed validation. Holds the chat gate until dropped.
pub struct AcceptedChoice {
    _guard: OwnedMutexGuard<()>,
    pending: PendingChoice,
    choice: QualityChoice,
}

impl AcceptedChoice {
    pub fn choice(&self) -> QualityChoice {
        self.choice
    }

    pub fn chat(&self) -> ConversationId {
        self.pending.chat
    }
}

/// Result of [`FetchService::accept_choice`].
pub enum ChoiceResolution {
    Accepted(AcceptedChoice),
    /// Nothing to download; the outcome is final
    Done(ChoiceOutcome),
}

/// Everything needed to serve chats, shared by all handlers.
pub struct FetchService {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
    planner: Planner,
    executor: Executor,
    registry: JobRegistry,
    locks: ChatLocks,
}

impl FetchService {
    pub fn new(settings: Arc<Settings>, runner: Arc<dyn ProcessRunner>, transport: Arc<dyn Transport>) -> Self {
        Self {
            planner: Planner::new(runner.clone(), settings.clone()),
            executor: Executor::new(runner, settings.clone()),
            registry: JobRegistry::new(settings.quality_menu_ttl),
            locks: ChatLocks::new(),
            settings,
            transport,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &ChatLocks {
        &self.locks
    }

    /// Handles a text message from `user` in `chat`.
    pub async fn handle_url(&self, chat: ConversationId, user: SenderId, text: &str) -> AppResult<RequestOutcome> {
        let Some(url) = extract_url(text) else {
            return Ok(RequestOutcome::Ignored);
        };

        let Some(_guard) = self.locks.try_acquire(chat) else {
            log::info!("REQUEST | busy | chat={} user={}", chat, user);
            self.transport.send_text(chat, messages::BUSY).await?;
            return Ok(RequestOutcome::Busy);
        };

        let status = self.transport.send_text(chat, messages::IN_PROGRESS).await?;
        let classified = classify(url);
        log::info!(
            "REQUEST | chat={} user={} platform={} url={}",
            chat,
            user,
            classified.platform,
            classified.url
        );

        match self.plan_and_run(chat, user, status, &classified).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.report_failure(status, &classified.url, &e).await;
                Ok(RequestOutcome::Failed)
            }
        }
    }

    async fn plan_and_run(
        &self,
        chat: ConversationId,
        user: SenderId,
        status: StatusHandle,
        classified: &ClassifiedUrl,
    ) -> AppResult<RequestOutcome> {
        let plan = self.planner.precheck(classified, self.settings.max_file_bytes()).await?;
        log::info!(
            "PLAN | chat={} mode={:?} probed={} menu={}",
            chat,
            plan.mode,
            plan.probe.is_some(),
            classified.supports_quality_menu
        );

        if plan.mode == DownloadMode::Video && classified.supports_quality_menu {
            if let Some(probe) = &plan.probe {
                let entry = self
                    .registry
                    .register(chat, user, &classified.url, &plan.title, &plan.description)
                    .await;
                let menu = QualityMenu::new(entry.token.clone(), menu_heights(probe));
                if let Err(e) = self.transport.present_menu(status, messages::CHOOSE_QUALITY, &menu).await {
                    self.registry.remove(&entry.token).await;
                    return Err(e.into());
                }
                log::info!("PLAN | menu | token={} heights={:?}", entry.token, menu.heights);
                return Ok(RequestOutcome::MenuPresented { token: entry.token });
            }
        }

        let files = self.run_job(chat, status, classified, &plan, QualityChoice::Best).await?;
        Ok(RequestOutcome::Completed { files })
    }

    /// Handles a quality button press from start to finish.
    ///
    /// `menu` is the message carrying the keyboard. The bot crate uses
    /// [`accept_choice`](Self::accept_choice) and [`run_choice`](Self::run_choice)
    /// separately so it can answer the button press before the download starts.
    pub async fn handle_choice(&self, user: SenderId, data: &str, menu: Option<StatusHandle>) -> AppResult<ChoiceOutcome> {
        match self.accept_choice(user, data, menu).await {
            ChoiceResolution::Done(outcome) => Ok(outcome),
            ChoiceResolution::Accepted(accepted) => self.run_choice(accepted, menu).await,
        }
    }

    /// Validates a button press and, for a real choice, takes the chat gate and consumes the token.
    pub async fn accept_choice(&self, user: SenderId, data: &str, menu: Option<StatusHandle>) -> ChoiceResolution {
        let Some((choice, token)) = parse_callback(data) else {
            log::debug!("CHOICE | malformed callback {:?}", data);
            return ChoiceResolution::Done(ChoiceOutcome::Malformed);
        };

        let pending = match self.registry.check(&token, user).await {
            Ok(pending) => pending,
            Err(rejection) => {
                log::info!("CHOICE | rejected {:?} | token={} user={}", rejection, token, user);
                return ChoiceResolution::Done(ChoiceOutcome::Rejected(rejection));
            }
        };

        if choice == QualityChoice::Cancel {
            self.registry.remove(&token).await;
            if let Some(menu) = menu {
                self.edit_status(menu, messages::CANCELLED).await;
            }
            log::info!("CHOICE | cancelled | token={}", token);
            return ChoiceResolution::Done(ChoiceOutcome::Cancelled);
        }

        // Busy keeps the token so the user can press again later.
        let Some(guard) = self.locks.try_acquire(pending.chat) else {
            log::info!("CHOICE | busy | chat={} token={}", pending.chat, token);
            return ChoiceResolution::Done(ChoiceOutcome::Busy);
        };
        match self.registry.take(&token).await {
            Some(pending) => ChoiceResolution::Accepted(AcceptedChoice {
                _guard: guard,
                pending,
                choice,
            }),
            None => ChoiceResolution::Done(ChoiceOutcome::Rejected(Rejection::Unknown)),
        }
    }

    /// Downloads and delivers an accepted choice. The chat gate is released on return.
    pub async fn run_choice(&self, accepted: AcceptedChoice, menu: Option<StatusHandle>) -> AppResult<ChoiceOutcome> {
        let AcceptedChoice { _guard, pending, choice } = accepted;

        let status = match menu {
            Some(menu) => {
                self.edit_status(menu, messages::IN_PROGRESS).await;
                menu
            }
            None => self.transport.send_text(pending.chat, messages::IN_PROGRESS).await?,
        };

        let classified = classify(&pending.url);
        let plan = DownloadPlan::resumed(pending.title, pending.description);
        log::info!("CHOICE | chat={} choice={} url={}", pending.chat, choice, classified.url);

        match self.run_job(pending.chat, status, &classified, &plan, choice).await {
            Ok(files) => Ok(ChoiceOutcome::Completed { files }),
            Err(e) => {
                self.report_failure(status, &classified.url, &e).await;
                Ok(ChoiceOutcome::Failed)
            }
        }
    }

    /// Downloads, delivers and finishes the status message. Caller holds the chat gate.
    async fn run_job(
        &self,
        chat: ConversationId,
        status: StatusHandle,
        classified: &ClassifiedUrl,
        plan: &DownloadPlan,
        choice: QualityChoice,
    ) -> AppResult<usize> {
        self.edit_status(status, messages::DOWNLOADING).await;

        let files = self
            .executor
            .execute(
                classified,
                plan,
                &self.settings.download_dir,
                self.settings.max_file_bytes(),
                choice,
            )
            .await?;

        let caption = build_caption(&plan.title, &plan.description, config::caption::MAX_LEN);
        let sent = Dispatcher::new(self.transport.as_ref(), self.settings.max_upload_bytes())
            .deliver(chat, Some(status), files, &caption)
            .await?;

        self.edit_status(status, messages::DONE).await;
        log::info!(
            "DONE | chat={} url={} files={} quality={}",
            chat,
            classified.url,
            sent,
            choice
        );

        if self.settings.delete_status_on_success {
            tokio::time::sleep(self.settings.delete_status_delay).await;
            if let Err(e) = self.transport.delete_message(status).await {
                log::debug!("status delete failed: {}", e);
            }
        }
        Ok(sent)
    }

    async fn report_failure(&self, status: StatusHandle, url: &str, err: &AppError) {
        let text = if err.is_transport_timeout() {
            log::warn!("TIMEOUT | chat={} url={} | {}", status.chat, url, err);
            messages::TRANSPORT_TIMEOUT.to_string()
        } else {
            log::error!("FAIL | chat={} url={} category={} | {}", status.chat, url, err.category(), err);
            format!("❌ Failed: {}", err)
        };
        self.edit_status(status, &text).await;
    }

    async fn edit_status(&self, status: StatusHandle, text: &str) {
        if let Err(e) = self.transport.edit_text(status, text).await {
            log::debug!("status edit failed: {}", e);
        }
    }
}
