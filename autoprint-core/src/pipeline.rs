//! Wiring of the whole pipeline.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{
    NoPersistence, PipelineConfig, PipelineSettings, SettingsController, SettingsPersistence,
};
use crate::entities::{LedgerProcessor, ShowRegistry};
use crate::events::{NoticeSender, dispatch_request_channel, notice_channel};
use crate::payment::PendingHoldList;
use crate::processors::sinks::{
    ChatAnnouncer, ChatSink, LabelPrinter, PrinterSink, WheelForwarder, WheelSink,
};
use crate::processors::{AdmissionController, Dispatcher};
use crate::session::{SessionError, SessionManager};

/// Handles to the running pipeline.
#[derive(Clone)]
pub struct Pipeline {
    pub sessions: Arc<SessionManager>,
    pub settings: Arc<SettingsController>,
    pub admission: Arc<AdmissionController>,
    pub dispatcher: Arc<Dispatcher>,
    pub holds: Arc<PendingHoldList>,
    pub notices: NoticeSender,
}

/// Builds a [`Pipeline`]. Collaborators default to the ones described by
/// [`PipelineConfig`]; tests and embedders replace them with the `with_*`
/// methods.
pub struct PipelineBuilder {
    config: PipelineConfig,
    settings: PipelineSettings,
    registry: ShowRegistry,
    persistence: Arc<dyn SettingsPersistence>,
    printer: Option<Arc<dyn LabelPrinter>>,
    chat: Option<Arc<dyn ChatAnnouncer>>,
    wheel: Option<Arc<dyn WheelForwarder>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            settings: PipelineSettings::default(),
            registry: ShowRegistry::default(),
            persistence: Arc::new(NoPersistence),
            printer: None,
            chat: None,
            wheel: None,
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_registry(mut self, registry: ShowRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn SettingsPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_printer(mut self, printer: Arc<dyn LabelPrinter>) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn with_chat_announcer(mut self, announcer: Arc<dyn ChatAnnouncer>) -> Self {
        self.chat = Some(announcer);
        self
    }

    pub fn with_wheel_forwarder(mut self, forwarder: Arc<dyn WheelForwarder>) -> Self {
        self.wheel = Some(forwarder);
        self
    }

    /// Restore the active show, then spawn the dispatcher. The returned
    /// handle completes after `shutdown_rx` flips to `true` and in-flight
    /// dispatches finish.
    pub async fn start(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(Pipeline, JoinHandle<()>), SessionError> {
        let PipelineConfig {
            ledger,
            printer,
            chat,
            wheel,
        } = self.config;

        let notices = notice_channel();
        let settings = Arc::new(SettingsController::new(
            self.settings,
            Arc::clone(&self.persistence),
        ));

        let sessions = Arc::new(
            SessionManager::open(
                LedgerProcessor::new(ledger.dir, ledger.max_entries),
                self.registry,
                self.persistence,
                notices.clone(),
            )
            .await?,
        );

        let printer_sink = match self.printer {
            Some(p) => PrinterSink::new(p, printer.cooldown, printer.timeout),
            None => PrinterSink::from_config(&printer),
        };
        let chat_sink = match self.chat {
            Some(a) => ChatSink::new(Some(a), chat.template, chat.timeout),
            None => ChatSink::from_config(&chat),
        };
        let wheel_sink = match self.wheel {
            Some(f) => WheelSink::new(Some(f), wheel.marker, wheel.timeout),
            None => WheelSink::from_config(&wheel),
        };

        let dispatcher = Arc::new(Dispatcher::new(
            printer_sink,
            chat_sink,
            wheel_sink,
            settings.store().clone(),
            notices.clone(),
        ));
        let (dispatch_tx, dispatch_rx) = dispatch_request_channel();
        let handle = tokio::spawn(Arc::clone(&dispatcher).run(dispatch_rx, shutdown_rx));

        let holds = Arc::new(PendingHoldList::new());
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&sessions),
            settings.store().clone(),
            holds.clone(),
            dispatch_tx,
            Arc::clone(&dispatcher),
            notices.clone(),
        ));

        Ok((
            Pipeline {
                sessions,
                settings,
                admission,
                dispatcher,
                holds,
                notices,
            },
            handle,
        ))
    }
}
