//! Test doubles shared by the bootstrap, update and guard tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use mockall::mock;
use toml::{Table, Value};

use crate::guard::CriticalDialog;
use crate::model::config::ConfigAccessor;
use crate::plugin::{PluginError, PluginLoader};
use crate::report::{Notice, Reporter};
use crate::shell::Shell;
use crate::update::{
    UpdateArtifact, UpdateClient, UpdateError, UpdateInfo, UpdatePrompt, UpdateService,
    VersionString,
};

/// In-memory configuration that tests can edit between steps.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    table: RefCell<Table>,
}

impl MemoryConfig {
    pub fn from_toml(raw: &str) -> Self {
        Self {
            table: RefCell::new(toml::from_str(raw).expect("valid test config")),
        }
    }

    pub fn set(&self, section: &str, key: &str, value: impl Into<Value>) {
        let mut table = self.table.borrow_mut();
        let section = table
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if let Value::Table(section) = section {
            section.insert(key.to_string(), value.into());
        }
    }
}

impl ConfigAccessor for MemoryConfig {
    fn value(&self, section: &str, key: &str) -> Option<Value> {
        self.table
            .borrow()
            .get(section)
            .and_then(Value::as_table)
            .and_then(|section| section.get(key))
            .cloned()
    }
}

mock! {
    pub Client {}
    impl UpdateClient for Client {
        fn check(&self) -> Result<Option<UpdateInfo>, UpdateError>;
        fn download(&self, update: &UpdateInfo) -> Result<Option<UpdateArtifact>, UpdateError>;
        fn install(&self, artifact: &UpdateArtifact) -> Result<(), UpdateError>;
    }
}

/// Hands out queued clients in order and records what each was built for.
#[derive(Default)]
pub struct QueuedService {
    clients: RefCell<VecDeque<MockClient>>,
    pub requests: RefCell<Vec<(String, String)>>,
}

impl QueuedService {
    pub fn with(clients: impl IntoIterator<Item = MockClient>) -> Self {
        Self {
            clients: RefCell::new(clients.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl UpdateService for QueuedService {
    fn client(
        &self,
        current_version: &VersionString,
        manifest_url: &str,
    ) -> Result<Box<dyn UpdateClient>, UpdateError> {
        self.requests
            .borrow_mut()
            .push((current_version.to_string(), manifest_url.to_string()));
        let client = self
            .clients
            .borrow_mut()
            .pop_front()
            .expect("test queued enough update clients");
        Ok(Box::new(client))
    }
}

pub fn update_info(version: &str) -> UpdateInfo {
    UpdateInfo {
        version: VersionString::new(version),
        release_notes: Some("Faster exports.".to_string()),
        download_ref: format!("https://example.com/updates/mk_processor-{version}.zip"),
    }
}

pub fn artifact(version: &str) -> UpdateArtifact {
    UpdateArtifact {
        version: VersionString::new(version),
        path: format!("/tmp/mk_processor-{version}.zip").into(),
    }
}

pub fn install_error() -> UpdateError {
    UpdateError::MissingBinary("mk-processor".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Shown,
    Notice(Notice),
    Offer { version: String, running: String },
}

/// Shell that records calls; offered prompts are kept for the test to drive.
#[derive(Default)]
pub struct RecordingShell {
    pub events: Rc<RefCell<Vec<ShellEvent>>>,
    pub prompts: Vec<UpdatePrompt>,
}

impl RecordingShell {
    pub fn new(events: Rc<RefCell<Vec<ShellEvent>>>) -> Self {
        Self {
            events,
            prompts: Vec::new(),
        }
    }
}

impl Shell for RecordingShell {
    fn show(&mut self) -> anyhow::Result<()> {
        self.events.borrow_mut().push(ShellEvent::Shown);
        Ok(())
    }

    fn notify(&mut self, notice: Notice) {
        self.events.borrow_mut().push(ShellEvent::Notice(notice));
    }

    fn offer_update(&mut self, prompt: UpdatePrompt) {
        self.events.borrow_mut().push(ShellEvent::Offer {
            version: prompt.version().to_string(),
            running: prompt.running_version().to_string(),
        });
        self.prompts.push(prompt);
    }
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub installs: Rc<Cell<usize>>,
    pub warnings: RefCell<Vec<Notice>>,
    pub criticals: RefCell<Vec<Notice>>,
    pub panic_report: RefCell<Option<String>>,
}

impl Reporter for RecordingReporter {
    fn install(&self) {
        self.installs.set(self.installs.get() + 1);
    }

    fn warning(&self, notice: &Notice) {
        self.warnings.borrow_mut().push(notice.clone());
    }

    fn critical(&self, notice: &Notice) {
        self.criticals.borrow_mut().push(notice.clone());
    }

    fn take_panic_report(&self) -> Option<String> {
        self.panic_report.borrow_mut().take()
    }
}

/// Plugin loader that either succeeds with nothing or fails at manager level.
/// When given a reporter's install counter it records its value at load time.
#[derive(Debug, Default)]
pub struct StubPlugins {
    pub fail: bool,
    pub loads: usize,
    pub reporter_installs: Option<Rc<Cell<usize>>>,
    pub installs_at_load: Option<usize>,
}

impl PluginLoader for StubPlugins {
    fn load_plugins(&mut self) -> Result<(), PluginError> {
        self.loads += 1;
        self.installs_at_load = self.reporter_installs.as_ref().map(|installs| installs.get());
        if self.fail {
            return Err(PluginError::ReadDir {
                path: "/plugins".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}

/// Critical dialog that records what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingDialog {
    pub shown: Vec<Notice>,
    pub fail: bool,
}

impl CriticalDialog for RecordingDialog {
    fn show_critical(&mut self, notice: &Notice) -> anyhow::Result<()> {
        self.shown.push(notice.clone());
        if self.fail {
            anyhow::bail!("terminal unavailable");
        }
        Ok(())
    }
}
