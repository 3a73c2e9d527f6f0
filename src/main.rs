//! FunKeyMonkey - evdev event multiplexer and behavior-module host.
//!
//! Reads one or more input devices, merges their events into a single
//! role-tagged stream and feeds it to a behavior module until SIGINT/SIGTERM.

use clap::Parser;
use funkeymonkey::config::{Config, Overrides};
use funkeymonkey::device::{list_available, DeviceInfo, Multiplexer};
use funkeymonkey::dispatch::{
    control_channel, install_user_signals, Control, Dispatcher, RunStats,
};
use funkeymonkey::output::uinput_factory;
use funkeymonkey::plugin::load_plugin;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "funkeymonkey")]
#[command(version, about = "Evdev event multiplexer with pluggable behavior modules")]
struct Args {
    /// JSON config file (default: <config dir>/funkeymonkey/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device, optionally tagged with a role: PATH[:ROLE]
    #[arg(short, long = "input", value_name = "PATH[:ROLE]")]
    inputs: Vec<String>,

    /// Behavior module: builtin:<name> or a path to a shared library
    #[arg(short, long)]
    module: Option<String>,

    /// Argument passed to the module's init (repeatable)
    #[arg(short = 'p', long = "plugin-arg", value_name = "ARG")]
    plugin_args: Vec<String>,

    /// Grab the input devices for exclusive access
    #[arg(short, long)]
    grab: bool,

    /// List available input devices and exit
    #[arg(short, long)]
    list: bool,

    /// Print the device list as JSON
    #[arg(long, requires = "list")]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("funkeymonkey=info")),
        )
        .init();

    let args = Args::parse();

    if args.list {
        let devices = list_available()?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&devices)?);
        } else {
            print_devices(&devices);
        }
        return Ok(());
    }

    let overrides = Overrides {
        inputs: args.inputs,
        module: args.module,
        module_args: args.plugin_args,
        grab: args.grab,
    };
    let config = Config::resolve(args.config.as_deref())?.merge(&overrides)?;

    let mut mux = Multiplexer::with_timeout(config.poll_timeout());
    for input in &config.inputs {
        if let Err(e) = mux.add_source(&input.path, input.role) {
            tracing::error!(path = %input.path.display(), role = input.role, error = %e, "Skipping input");
        }
    }
    if !mux.ready() {
        return Err("no usable input devices".into());
    }

    if config.grab && !mux.set_exclusive(true) {
        tracing::warn!("Continuing without exclusive access");
    }

    let plugin = load_plugin(&config.module, uinput_factory())?;

    let (tx, rx) = control_channel(config.control_queue_capacity);
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        tx.send(Control::Terminate);
    })?;
    install_user_signals();

    let mut dispatcher = Dispatcher::new(mux, plugin, rx.forward_signals(true));
    let stats = dispatcher.run(&config.module_args)?;
    print_summary(&stats);
    Ok(())
}

fn print_devices(devices: &[DeviceInfo]) {
    println!(
        "{:<20} {:<6} {:<6} {:<6} NAME",
        "PATH", "BUS", "VENDOR", "PRODUCT"
    );
    for d in devices {
        println!(
            "{:<20} {:04x}   {:04x}   {:04x}    {}",
            d.path.display(),
            d.bus,
            d.vendor,
            d.product,
            d.name
        );
    }
}

fn print_summary(stats: &RunStats) {
    println!();
    println!("Events:    {}", stats.events);
    println!("Timeouts:  {}", stats.timeouts);
    println!("User1:     {}", stats.user1);
    println!("User2:     {}", stats.user2);
}
