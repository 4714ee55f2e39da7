//! CLI inspection entry point.
//!
//! # Responsibility
//! - Resolve config, open the state database and load the dashboard.
//! - Print a deterministic module/relationship summary for local checks.

use flowframe_core::db::open_db;
use flowframe_core::{
    core_version, init_from_config, ping, CoreConfig, Dashboard, ModuleRegistry, SqliteStateStore,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_from_config(&config) {
        eprintln!("file logging disabled: {err}");
    }

    println!("flowframe_core ping={}", ping());
    println!("flowframe_core version={}", core_version());

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{}`: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };
    let store = match SqliteStateStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("state store unavailable: {err}");
            return ExitCode::FAILURE;
        }
    };

    let dashboard = Dashboard::load(ModuleRegistry::builtin(), store);
    let state = dashboard.state();
    for module in &state.modules {
        let label = dashboard
            .registry()
            .get(module.kind)
            .map_or(module.kind.as_str(), |definition| definition.label());
        println!(
            "module id={} type={} name=\"{}\" items={}",
            module.id,
            module.kind.as_str(),
            module.display_name(label),
            module.data.len()
        );
    }
    println!(
        "density={} focus_mode={} snapshots={} links={}",
        state.density,
        state.focus_mode,
        state.snapshots.len(),
        state.relationships.link_count()
    );
    info!(
        "event=cli_inspect module=cli status=ok modules={}",
        state.modules.len()
    );
    ExitCode::SUCCESS
}
