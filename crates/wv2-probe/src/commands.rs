//! Subcommand implementations.
//!
//! Every command writes its report to `out` so the same code serves the
//! binary and the tests.

use std::io::Write;

use tracing::info;
use wv2_common::{BridgeError, Bounds, ParentWindow, Wv2Error};
use wv2_config::{config_to_json, BridgeConfig};
use wv2_webview::native::mock::MockRuntime;
use wv2_webview::{oneshot, CompletionFuture, Runtime};

use crate::cli::{Backend, Command};

/// Window handle handed to the mock when it hosts a controller.
const MOCK_WINDOW: ParentWindow = ParentWindow(1);

/// The native backend a command runs against.
pub enum Host {
    Mock(MockRuntime),
    #[cfg(windows)]
    WebView2,
}

impl Host {
    pub fn new(backend: Backend) -> Result<Self, BridgeError> {
        match backend {
            Backend::Mock => Ok(Host::Mock(MockRuntime::new())),
            Backend::Webview2 => webview2_host(),
        }
    }

    pub fn runtime(&self) -> Runtime {
        match self {
            Host::Mock(mock) => mock.runtime(),
            #[cfg(windows)]
            Host::WebView2 => Runtime::webview2(),
        }
    }
}

#[cfg(windows)]
fn webview2_host() -> Result<Host, BridgeError> {
    Ok(Host::WebView2)
}

#[cfg(not(windows))]
fn webview2_host() -> Result<Host, BridgeError> {
    Err(BridgeError::Unsupported(
        "webview2 backend outside Windows".into(),
    ))
}

pub fn run(
    command: &Command,
    host: &Host,
    config: &BridgeConfig,
    out: &mut impl Write,
) -> Result<(), Wv2Error> {
    match command {
        Command::Version { folder } => {
            let folder = folder
                .as_deref()
                .unwrap_or(config.environment.browser_executable_folder.as_str());
            let version = host.runtime().get_available_browser_version(folder)?;
            writeln!(out, "{version}")?;
        }
        Command::Compare { version1, version2 } => {
            let ordering = host
                .runtime()
                .compare_browser_versions(version1.as_str(), version2.as_str())?;
            let relation = match ordering {
                std::cmp::Ordering::Less => "<",
                std::cmp::Ordering::Equal => "=",
                std::cmp::Ordering::Greater => ">",
            };
            writeln!(out, "{version1} {relation} {version2}")?;
        }
        Command::Config => {
            writeln!(out, "{}", config_to_json(config))?;
        }
        Command::Smoke { url } => match host {
            Host::Mock(mock) => smoke(mock, config, url, out)?,
            #[cfg(windows)]
            Host::WebView2 => {
                return Err(BridgeError::Unsupported(
                    "smoke needs --backend mock; the probe hosts no window".into(),
                )
                .into())
            }
        },
    }
    Ok(())
}

/// Drain the mock's queue and take what the continuation produced.
fn settle<T>(
    mock: &MockRuntime,
    mut future: CompletionFuture<T>,
    step: &str,
) -> Result<T, Wv2Error> {
    mock.run_until_idle();
    future
        .try_take()?
        .ok_or_else(|| Wv2Error::Other(format!("{step} still pending after the queue drained")))
}

fn smoke(
    mock: &MockRuntime,
    config: &BridgeConfig,
    url: &str,
    out: &mut impl Write,
) -> Result<(), Wv2Error> {
    let runtime = mock.runtime();
    let environment_config = &config.environment;

    let (done, created) = oneshot();
    runtime.create_environment_with_options(
        &environment_config.browser_executable_folder,
        &environment_config.user_data_folder,
        &environment_config.to_options(),
        done,
    )?;
    let environment = settle(mock, created, "environment")?
        .ok_or_else(|| Wv2Error::Other("environment creation failed".into()))?;
    writeln!(out, "environment: created")?;

    let (done, created) = oneshot();
    environment.create_controller(MOCK_WINDOW, done)?;
    let controller = settle(mock, created, "controller")?
        .ok_or_else(|| Wv2Error::Other("controller creation failed".into()))?;
    controller.set_bounds(Bounds::from_size(800, 600))?;
    writeln!(
        out,
        "controller: visible={} bounds={}",
        controller.visible()?,
        controller.bounds()?
    )?;

    let page = controller.page()?;
    page.set_settings(config.page.settings)?;
    let settings = page.settings()?;
    writeln!(
        out,
        "settings: {}",
        serde_json::to_string(&settings).map_err(|e| Wv2Error::Other(e.to_string()))?
    )?;

    let (done, completed) = oneshot();
    page.navigate(url, done)?;
    let navigation = settle(mock, completed, "navigation")?;
    writeln!(
        out,
        "navigate: id={} success={} web_error_status={}",
        navigation.navigation_id, navigation.is_success, navigation.web_error_status
    )?;

    let (done, result) = oneshot();
    page.execute_script("document.title", done)?;
    match settle(mock, result, "script")? {
        Some(json) => writeln!(out, "script: {json}")?,
        None => writeln!(out, "script: <no result>")?,
    }

    writeln!(out, "title: {}", page.document_title()?)?;
    writeln!(out, "source: {}", page.source()?)?;

    controller.close()?;
    info!("smoke run finished");
    writeln!(out, "closed")?;
    Ok(())
}
