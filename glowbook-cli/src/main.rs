//! Glowbook CLI
//!
//! Drives one booking attempt against the CityGlow widget in an
//! already-running Chrome. Start the browser yourself and bring the
//! booking page up first:
//!
//!   google-chrome --remote-debugging-port=9222
//!   cargo run --bin glowbook -- \
//!       --first-name Ross --last-name Massey --phone 123456 \
//!       --email ross@ross.com --category Facials \
//!       --service "HydraFacial FIRST TIME SPECIAL!" \
//!       --addon Extractions --addon Dermaplaning --staff Elena \
//!       --day 15 --month 8 --year 2025 --time "2:00 pm"

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glowbook::{
    BookingSelection, BookingSession, CatalogStore, ChromePage, ResponseInterceptor,
};

#[derive(Parser, Debug)]
#[command(name = "glowbook")]
#[command(about = "Automated appointment booking for the CityGlow online booking widget")]
struct Cli {
    /// DevTools port of the already-running Chrome
    #[arg(long, default_value_t = 9222, env = "GLOWBOOK_PORT")]
    port: u16,

    /// Substring of the page URL to attach to
    #[arg(long, default_value = "cityglowflorida")]
    page: String,

    /// Extra delay before every driven action, in milliseconds
    #[arg(long, default_value_t = 0)]
    slow_mo: u64,

    /// Pause for Enter before and after the flow (debug checkpoints)
    #[arg(long)]
    pause: bool,

    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: String,

    /// Service category as displayed by the widget
    #[arg(long)]
    category: String,

    /// Sub-service as displayed by the widget
    #[arg(long)]
    service: String,

    /// Add-on to select; repeat for several
    #[arg(long = "addon")]
    addons: Vec<String>,

    /// Staff member; omit for "no preference"
    #[arg(long)]
    staff: Option<String>,

    #[arg(long)]
    day: u32,
    #[arg(long)]
    month: u32,
    #[arg(long)]
    year: i32,

    /// Time slot as displayed, e.g. "2:00 pm"
    #[arg(long)]
    time: String,
}

impl Cli {
    fn selection(&self) -> BookingSelection {
        BookingSelection {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            category: self.category.clone(),
            sub_service: self.service.clone(),
            addons: self.addons.clone(),
            staff: self.staff.clone(),
            day: self.day,
            month: self.month,
            year: self.year,
            time: self.time.clone(),
        }
    }
}

fn pause_for_enter(label: &str) {
    eprintln!("paused ({label}) — press Enter to continue");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let selection = cli.selection();

    let catalog = Arc::new(CatalogStore::new());
    let interceptor = ResponseInterceptor::new(catalog.clone());

    let page = Arc::new(
        ChromePage::attach(
            cli.port,
            &cli.page,
            Duration::from_millis(cli.slow_mo),
            interceptor,
        )
        .await
        .context("could not attach to the booking page")?,
    );

    let session = BookingSession::with_catalog(page.clone(), catalog);

    if cli.pause {
        pause_for_enter("before the flow");
    }

    let result = session.make_appointment(&selection).await;

    if cli.pause {
        pause_for_enter("after the flow");
    }

    // The page is released on every exit path.
    page.close().await;

    let state = result.context("booking flow failed")?;
    info!(?state, "booking flow completed through the customer form");
    Ok(())
}
