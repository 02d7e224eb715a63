mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use serde_json::json;
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use tessera_core::kernel::bootstrap::{HostSettings, PluginHost, StartupReport};
use tessera_core::kernel::error::Result;
use tessera_core::plugin_system::LoadPlan;

use core_health::HealthPlugin;
use greeter_example::GreeterPlugin;

use cli::{CliArgs, Commands};

/// Routes `log` records from the core and plugins into a stderr tracing subscriber.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = LogTracer::init();
    }
}

fn load_settings(args: &CliArgs) -> Result<HostSettings> {
    let mut settings = match &args.settings {
        Some(path) => HostSettings::from_file(path)?,
        None => HostSettings::default(),
    };
    if let Some(base_dir) = &args.base_dir {
        settings = settings.with_base_dir(base_dir.clone());
    }
    if args.fail_fast {
        settings = settings.with_fail_fast(true);
    }
    settings.disabled_plugins.extend(args.disabled.iter().cloned());
    Ok(settings)
}

fn build_host(settings: HostSettings) -> Result<PluginHost> {
    let mut host = PluginHost::new(settings);
    host.register_plugin(Arc::new(HealthPlugin::new()))?;
    host.register_plugin(Arc::new(GreeterPlugin::new()))?;
    info!("Registered plugins: {:?}", host.registry().names());
    Ok(host)
}

fn print_list(host: &PluginHost, as_json: bool) {
    let disabled = host.disabled();
    if as_json {
        let plugins: Vec<_> = host
            .registry()
            .iter()
            .map(|entry| {
                let descriptor = entry.descriptor();
                json!({
                    "name": descriptor.name,
                    "version": descriptor.version,
                    "dependencies": descriptor.dependencies,
                    "disabled": disabled.contains(&descriptor.name),
                })
            })
            .collect();
        println!("{}", json!(plugins));
        return;
    }

    for entry in host.registry().iter() {
        let descriptor = entry.descriptor();
        let status = if disabled.contains(&descriptor.name) { "Disabled" } else { "Enabled" };
        println!("{} {} [{}]", descriptor.name, descriptor.version, status);
        for (dependency, requirement) in &descriptor.dependencies {
            println!("  requires {} {}", dependency, requirement);
        }
    }
}

fn print_plan(plan: &LoadPlan, as_json: bool) {
    if as_json {
        println!("{}", json!(plan));
        return;
    }

    println!("Activation order:");
    for (position, name) in plan.order.iter().enumerate() {
        println!("  {}. {}", position + 1, name);
    }
    for (name, result) in plan.rejected() {
        let reason = result
            .to_error(name)
            .map(|err| err.to_string())
            .unwrap_or_default();
        println!("Rejected {} ({}): {}", name, result.stage(), reason);
    }
}

fn print_report(report: &StartupReport, as_json: bool) {
    if as_json {
        println!(
            "{}",
            json!({
                "activated": report.activated,
                "disabled": report.disabled,
                "lifecycle": report.lifecycle,
            })
        );
        return;
    }

    for (name, state) in report.lifecycle.iter() {
        println!("{}: {}", name, state);
    }
    for name in &report.disabled {
        println!("{}: Disabled", name);
    }
    println!("{} plugin(s) active", report.activated.len());
}

fn print_routes(report: &StartupReport, as_json: bool) {
    let routes = report.host.routes.routes();
    if as_json {
        let rows: Vec<_> = routes
            .iter()
            .map(|route| json!({ "method": route.method, "path": route.path, "owner": route.owner }))
            .collect();
        println!("{}", json!(rows));
        return;
    }

    for route in routes {
        println!("{:<6} {:<32} {}", route.method.to_string(), route.path, route.owner);
    }
}

async fn run(args: CliArgs) -> Result<bool> {
    let host = build_host(load_settings(&args)?)?;

    match args.command.unwrap_or(Commands::Start) {
        Commands::List => {
            print_list(&host, args.json);
            Ok(true)
        }
        Commands::Plan => {
            let plan = host.plan();
            print_plan(&plan, args.json);
            Ok(true)
        }
        Commands::Start => {
            let report = host.start().await?;
            print_report(&report, args.json);
            Ok(report.is_clean())
        }
        Commands::Routes => {
            let report = host.start().await?;
            print_routes(&report, args.json);
            Ok(report.is_clean())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
