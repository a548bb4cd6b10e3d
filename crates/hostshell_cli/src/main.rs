//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run the startup phases and register a demo extension twice against one
//!   registry, so core wiring can be checked without a host UI.
//! - Print route snapshots as JSON, one per line, in registration order.
//!
//! Set `HOSTSHELL_LOG_DIR` to an absolute directory to enable file logging.

use hostshell_core::{
    core_version, default_log_level, init_logging, register_tray_hooks, Extension,
    ExtensionRouteRegistrator, HookResult, LocationParamsNormalizer, MenuEntry,
    ObservableLocation, PageParams, PageRegistration, ParamValue, Registry, RenderOutput,
    Signal, StartupScheduler, TrayIcon, TrayIconState, ROUTE_TOKEN,
};
use std::error::Error;
use std::rc::Rc;

const LOG_DIR_ENV: &str = "HOSTSHELL_LOG_DIR";

struct StdoutTray;

impl TrayIcon for StdoutTray {
    fn start(&self) -> HookResult {
        println!("tray status=started");
        Ok(())
    }

    fn set_icon(&self, state: TrayIconState) {
        println!("tray icon={state:?}");
    }
}

fn demo_extension() -> Result<Extension, Box<dyn Error>> {
    let overview = PageRegistration::new("overview", |_: &PageParams| {
        RenderOutput::view("demo overview")
    });
    let settings = PageRegistration::new("settings", |params: &PageParams| {
        let section = params
            .value("section")
            .and_then(|value| value.as_text().map(str::to_string))
            .unwrap_or_default();
        RenderOutput::view(format!("demo settings: {section}"))
    })
    .with_param("section", ParamValue::text("general"));

    Ok(Extension::new("@hostshell/demo")?
        .with_cluster_page(overview)
        .with_cluster_page(settings)
        .with_menu_entry(MenuEntry::new("overview", "Overview"))
        .with_menu_entry(MenuEntry::new("settings", "Settings").with_parent("overview")))
}

fn main() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        init_logging(default_log_level(), &log_dir)?;
    }
    println!("hostshell_core version={}", core_version());

    let mut registry = Registry::new();
    let icon_state = Signal::new(TrayIconState::Normal);
    register_tray_hooks(&mut registry, Rc::new(StdoutTray), icon_state.clone())?;
    StartupScheduler::new().start_application(&registry)?;
    icon_state.set(TrayIconState::UpdateAvailable);

    let location = Rc::new(ObservableLocation::new());
    let mut registrator =
        ExtensionRouteRegistrator::new(LocationParamsNormalizer::new(location.clone()));
    let extension = demo_extension()?;
    for _ in 0..2 {
        let report = registrator.activate(&mut registry, &extension)?;
        log::info!(
            "event=cli_activation module=cli status=ok extension={} installation={} routes={}",
            report.extension_id,
            report.installation,
            report.registered.len()
        );
    }

    for route in registry.inject_all(&ROUTE_TOKEN)? {
        println!("{}", serde_json::to_string(&route.snapshot())?);
    }
    Ok(())
}
