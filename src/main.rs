// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

// Use library instead of local modules
use delivery_routes::{
    carrier_codes, load_records, plan_route, AddressResolver, AppConfig, GoogleDirectionsClient,
    LoginOutcome, PasswordGate, RouteError, RouteSummary, Session,
};

const USAGE: &str = "Usage:
  delivery-routes carriers <file>            List carriers in the file
  delivery-routes stops <file> <carrier>     Show origin and unique destinations
  delivery-routes route <file> <carrier>     Compute the optimized route
  delivery-routes [ui] <file>                Interactive dashboard";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Nothing is offered without a working routing client
    let client = match config.routing_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set {} and try again.", delivery_routes::config::ENV_API_KEY);
            std::process::exit(1);
        }
    };

    let session = authenticate(&PasswordGate::new(config.password.as_deref()))?;

    match args.iter().map(|s| s.as_str()).collect::<Vec<_>>().as_slice() {
        ["carriers", file] => run_carriers(Path::new(file)),
        ["stops", file, carrier] => run_stops(&config, Path::new(file), carrier),
        ["route", file, carrier] => run_route(&config, &client, Path::new(file), carrier),
        ["ui", file] | [file] if !file.starts_with('-') => {
            run_ui_mode(&config, &client, Path::new(file), session)
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

/// Prompt on stdin until the shared password is accepted (3 attempts)
fn authenticate(gate: &PasswordGate) -> Result<Session> {
    let mut session = Session::new(gate);
    let stdin = io::stdin();

    for _ in 0..3 {
        if session.is_authenticated() {
            return Ok(session);
        }

        print!("🔐 Enter the password to continue: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match session.login(gate, line.trim_end_matches(&['\r', '\n'][..])) {
            LoginOutcome::Accepted => println!("✓ Access granted\n"),
            LoginOutcome::Rejected => eprintln!("❌ Wrong password."),
            LoginOutcome::Empty => {}
        }
    }

    if session.is_authenticated() {
        Ok(session)
    } else {
        eprintln!("❌ Access denied");
        std::process::exit(1);
    }
}

/// Load the table, printing the validation message instead of a raw error
fn load_or_exit(file: &Path) -> Vec<delivery_routes::DeliveryRecord> {
    println!("📂 Loading {}...", file.display());
    match load_records(file) {
        Ok(records) => {
            println!("✓ Loaded {} delivery rows\n", records.len());
            records
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn build_resolver(config: &AppConfig) -> Result<AddressResolver> {
    let carriers = config
        .carrier_directory()
        .context("Failed to load carrier home bases")?;
    Ok(AddressResolver::new(carriers))
}

fn run_carriers(file: &Path) -> Result<()> {
    let records = load_or_exit(file);

    println!("🚚 Carriers");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for code in carrier_codes(&records) {
        let rows = records.iter().filter(|r| r.carrier_code == code).count();
        println!("  {:<8} {:>5} rows", code, rows);
    }

    Ok(())
}

fn run_stops(config: &AppConfig, file: &Path, carrier: &str) -> Result<()> {
    let resolver = build_resolver(config)?;
    let records = load_or_exit(file);
    let stops = resolver.stops_for(&records, carrier);

    println!("🚚 Carrier: {}", carrier);
    println!("📍 Start/end point: {}", stops.origin.location);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{} unique destinations ({} rows)\n", stops.stops.len(), stops.deliveries);

    for stop in &stops.stops {
        println!("  {}", stop.full_address);
    }

    Ok(())
}

fn run_route(
    config: &AppConfig,
    client: &GoogleDirectionsClient,
    file: &Path,
    carrier: &str,
) -> Result<()> {
    let resolver = build_resolver(config)?;
    let records = load_or_exit(file);
    let stops = resolver.stops_for(&records, carrier);

    println!("🚚 Carrier: {}", carrier);
    println!("📍 Start/end point: {}", stops.origin.location);

    if stops.stops.is_empty() {
        println!("\nNo destinations for this carrier: 0 km, 0 min.");
        return Ok(());
    }

    println!("\n⏳ Computing the best route for {} stops...", stops.stops.len());

    let plan = match plan_route(client, &stops.origin.location, &stops.destinations()) {
        Ok(plan) => plan,
        Err(e @ RouteError::Configuration(_)) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(());
        }
    };

    let summary = RouteSummary::from_plan(&plan);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Estimated total distance: {} km", summary.distance_km);
    println!("✅ Estimated travel time:    ~ {} min", summary.duration_min);
    println!("\nSuggested delivery order:");
    for label in &summary.stops {
        println!("  {}", label);
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(
    config: &AppConfig,
    client: &GoogleDirectionsClient,
    file: &Path,
    session: Session,
) -> Result<()> {
    let resolver = build_resolver(config)?;
    let records = load_or_exit(file);

    println!("Starting dashboard... (Press 'q' to quit)\n");

    let mut app = ui::App::new(records, session, &resolver, client);
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(
    _config: &AppConfig,
    _client: &GoogleDirectionsClient,
    _file: &Path,
    _session: Session,
) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the CLI: delivery-routes route <file> <carrier>");
    std::process::exit(1);
}
