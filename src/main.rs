mod claims;
mod data;
mod design;
mod error;
mod http;
mod pool;
mod scrape;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use settings::{Settings, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "claimgen", about = "Clinic/doctor directory scraper and synthetic claim generator")]
struct Cli {
    /// Settings file (TOML); missing file means built-in defaults
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the clinic directory into a CSV file
    ScrapeClinics {
        /// Output CSV (default: the configured clinic table)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Concurrent requests (default: one per core)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Search term for the directory listing
        #[arg(short, long, default_value = "mauritius")]
        query: String,
    },
    /// Scrape the medical council registers into a CSV file
    ScrapeDoctors {
        /// Output CSV (default: the configured doctor table)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Concurrent requests (default: one per core)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Render legitimate and fraudulent claim PDFs
    Generate {
        /// Legitimate claim slots
        #[arg(short, long)]
        legitimate: Option<usize>,
        /// Fraudulent claim slots
        #[arg(short, long)]
        fraudulent: Option<usize>,
        /// Seed for styles, selection and patients
        #[arg(short, long)]
        seed: Option<u64>,
        /// Rendering threads (default: one per core)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    let result = match cli.command {
        Commands::ScrapeClinics {
            output,
            workers,
            query,
        } => {
            let output = output.unwrap_or_else(|| settings.paths.clinics_csv.clone());
            let workers = workers
                .or(settings.scrape.workers)
                .unwrap_or_else(settings::default_workers);
            let client = http::HttpClient::new(&settings.scrape)?;
            let stats = scrape::clinics::scrape_clinics(&client, &query, workers, &output).await?;
            println!(
                "Scraped {} clinics from {} listing pages into {:?}",
                stats.records, stats.pages, output
            );
            Ok(())
        }
        Commands::ScrapeDoctors { output, workers } => {
            let output = output.unwrap_or_else(|| settings.paths.doctors_csv.clone());
            let workers = workers
                .or(settings.scrape.workers)
                .unwrap_or_else(settings::default_workers);
            let client = http::HttpClient::new(&settings.scrape)?;
            let stats = scrape::doctors::scrape_doctors(&client, workers, &output).await?;
            println!(
                "Scraped {} doctors and specialists from {} register pages into {:?}",
                stats.records, stats.pages, output
            );
            Ok(())
        }
        Commands::Generate {
            legitimate,
            fraudulent,
            seed,
            workers,
        } => {
            let g = &mut settings.generate;
            g.legitimate_count = legitimate.unwrap_or(g.legitimate_count);
            g.fraudulent_count = fraudulent.unwrap_or(g.fraudulent_count);
            g.seed = seed.or(g.seed);
            g.workers = workers.or(g.workers);

            let (paths, generate) = (settings.paths.clone(), settings.generate.clone());
            let stats =
                tokio::task::spawn_blocking(move || claims::generate(&paths, &generate)).await??;
            println!(
                "Generated {} claims ({} planned, {} requested) in {:?}",
                stats.rendered, stats.planned, stats.requested, settings.paths.output_dir
            );
            Ok(())
        }
    };

    info!("Finished in {}", format_duration(t0.elapsed()));
    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
