mod app;
mod bootstrap;
mod deferred;
mod guard;
mod input;
mod logging;
mod model;
mod msg;
mod plugin;
mod report;
mod shell;
mod tui;
mod update;

#[cfg(test)]
mod test_support;

use std::process::ExitCode;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use app::App;
use bootstrap::{Bootstrap, Launch};
use guard::{Failure, report_fatal, run_guarded};
use input::InputThread;
use model::config::{AppConfig, ConfigAccessor};
use msg::Msg;
use plugin::PluginManager;
use report::{ConsoleReporter, Reporter};
use shell::TerminalShell;
use tui::TerminalDialog;
use update::UpdateService;
use update::http::HttpUpdateService;

const TICK_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> ExitCode {
    // Logs go to a file; the terminal belongs to the shell.
    let _log_guard = logging::init();
    let reporter = ConsoleReporter::new();

    let collaborators = match Collaborators::load() {
        Ok(collaborators) => collaborators,
        Err(err) => {
            return report_fatal(
                &reporter,
                Some(&mut TerminalDialog),
                Failure::Import,
                &format!("{err:#}"),
                format!("{err:?}"),
            );
        }
    };

    let exit = run_guarded(&reporter, &mut TerminalDialog, || {
        run(&reporter, collaborators)
    });
    tracing::info!("mk-processor exiting");
    exit
}

/// Everything that must exist before the bootstrap can start.
struct Collaborators {
    config: Rc<dyn ConfigAccessor>,
    updates: Rc<dyn UpdateService>,
}

impl Collaborators {
    fn load() -> Result<Self> {
        let config = AppConfig::load().context("load configuration")?;
        match config.user_path() {
            Some(path) => tracing::info!(path = %path.display(), "user configuration"),
            None => tracing::info!("no user configuration directory, using defaults"),
        }
        let updates = HttpUpdateService::new().context("initialise update service")?;
        Ok(Self {
            config: Rc::new(config),
            updates: Rc::new(updates),
        })
    }
}

fn run(reporter: &dyn Reporter, collaborators: Collaborators) -> Result<ExitCode> {
    let Collaborators { config, updates } = collaborators;
    let plugins = PluginManager::from_config(&*config);

    let launch = Bootstrap::new(Rc::clone(&config), reporter, Rc::clone(&updates))
        .run(plugins, move |plugins| {
            TerminalShell::new(App::new(plugins, config, updates))
        })?;

    tracing::debug!(storage = ?launch.storage, deferred = launch.deferred.len(), "shell launched");
    event_loop(launch)?;
    Ok(ExitCode::SUCCESS)
}

fn event_loop(launch: Launch<TerminalShell>) -> Result<()> {
    let Launch {
        mut shell,
        mut deferred,
        ..
    } = launch;
    let (tx, rx) = mpsc::channel::<Msg>();

    // Input thread: stopped and joined when the loop returns, error or not
    let _input = InputThread::spawn(tx.clone());

    // Tick thread: drives deferred tasks
    thread::spawn(move || {
        loop {
            thread::sleep(TICK_INTERVAL);
            if tx.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        shell.app.update(first);
        while let Ok(msg) = rx.try_recv() {
            shell.app.update(msg);
        }

        if !deferred.is_empty() {
            deferred.run_due(Instant::now(), &mut shell);
        }

        if shell.app.should_quit {
            break;
        }

        shell.draw()?;
    }

    Ok(())
}
