//! NFL Score Prediction CLI
//!
//! Scrapes season schedules, builds chronological rating and form features,
//! and trains a score regressor over them.

use clap::{Parser, Subcommand};
use gridiron::{Config, Result};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "NFL game score prediction from Elo and rolling form", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build the feature table for a range of seasons
    Features {
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        end_year: i32,
        /// Write CSV here instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
    /// Train the score model
    Train {
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        end_year: i32,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Predict scores for one week of a season
    Predict {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u32,
        /// Write CSV predictions to this file
        #[arg(long)]
        out: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Fetch season pages and store their games
    Sync {
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        end_year: i32,
        /// Re-download pages even when cached
        #[arg(long)]
        force: bool,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Parse a directory of saved season pages
    ParseCache {
        /// Directory containing cached HTML files
        dir: String,
        /// Season the pages belong to
        #[arg(long)]
        season: i32,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync {
                start_year,
                end_year,
                force,
                offline,
            } => commands::data_sync(&config, start_year, end_year, force, offline),
            DataCommands::ParseCache { dir, season } => {
                commands::parse_cache(&config, &dir, season)
            }
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features {
            start_year,
            end_year,
            out,
        } => commands::features(&config, start_year, end_year, out),
        Commands::Train {
            start_year,
            end_year,
            epochs,
            lr,
        } => commands::train(&config, start_year, end_year, epochs, lr),
        Commands::Predict {
            year,
            week,
            out,
            format,
        } => commands::predict(&config, year, week, out, format),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::scrapers::{PfrScraper, ScheduleSource};
    use gridiron::data::{load_games, Database};
    use gridiron::features::build_feature_table;
    use gridiron::GridironError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.cache_dir)?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!(
            "Created data/, {}/ and {}/ directories",
            config.data.cache_dir, config.data.model_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'gridiron data sync --start-year 2015 --end-year 2023' to fetch games");
        println!("  3. Run 'gridiron train --start-year 2015 --end-year 2023' to train the model");
        println!("  4. Run 'gridiron predict --year 2024 --week 1' to make predictions");

        Ok(())
    }

    fn build_scraper(config: &Config, force: bool, offline: bool) -> Result<PfrScraper> {
        Ok(PfrScraper::new(&config.data.base_url)?
            .with_cache(&config.data.cache_dir)
            .force_refresh(force)
            .offline_only(offline))
    }

    pub fn data_sync(
        config: &Config,
        start_year: i32,
        end_year: i32,
        force: bool,
        offline: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Syncing seasons {}-{}...", start_year, end_year);
        println!("Using cache directory: {}", config.data.cache_dir);
        if offline {
            println!("Offline mode: using cached files only");
        }

        let scraper = build_scraper(config, force, offline)?;
        let seasons = scraper.fetch_seasons(start_year, end_year)?;

        let mut total = 0;
        for (season, rows) in &seasons {
            let count = db.upsert_games(*season, rows)?;
            println!("  {}: {} rows, {} stored", season, rows.len(), count);
            total += count;
        }
        println!("Stored {} games in database", total);

        Ok(())
    }

    pub fn parse_cache(config: &Config, dir: &str, season: i32) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let scraper = PfrScraper::new(&config.data.base_url)?;

        println!("Parsing cached HTML files from {}...", dir);
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "html" || ext == "htm").unwrap_or(false))
            .collect();
        paths.sort();

        let mut total = 0;
        for path in &paths {
            match scraper.parse_file(path) {
                Ok(rows) => {
                    let count = db.upsert_games(season, &rows)?;
                    println!("  {}: {} rows", path.display(), rows.len());
                    total += count;
                }
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        if total == 0 {
            println!("No games found. Check the HTML files or parser logic.");
        } else {
            println!("Stored {} games in database", total);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Games:    {}", stats.game_count);
        println!("  Scored:   {}", stats.scored_count);
        if let (Some(first), Some(last)) = (stats.first_season, stats.last_season) {
            println!("  Seasons:  {} to {}", first, last);
        }

        Ok(())
    }

    pub fn features(
        config: &Config,
        start_year: i32,
        end_year: i32,
        out: Option<String>,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let games = load_games(&db, start_year, end_year)?;
        if games.is_empty() {
            return Err(GridironError::NoData(format!(
                "no games stored for {}-{}. Run 'gridiron data sync' first.",
                start_year, end_year
            )));
        }

        let (_, imputed) = build_feature_table(config, games);
        log::info!(
            "Built {} feature rows ({} with results)",
            imputed.len(),
            imputed.training_rows().len()
        );

        match out {
            Some(path) => {
                let file = std::fs::File::create(&path)?;
                imputed.write_csv(std::io::BufWriter::new(file))?;
                println!("Wrote {} rows to {}", imputed.len(), path);
            }
            None => imputed.write_csv(std::io::stdout().lock())?,
        }

        Ok(())
    }

    pub fn train(
        config: &Config,
        start_year: i32,
        end_year: i32,
        epochs: Option<usize>,
        lr: Option<f64>,
    ) -> Result<()> {
        use burn::backend::{Autodiff, NdArray};
        use gridiron::model::ScoreModelConfig;
        use gridiron::training::{ModelArtifacts, ScoreTrainer, TrainingSet, TrainingSummary};

        type MyBackend = NdArray<f32>;
        type MyAutodiffBackend = Autodiff<MyBackend>;

        let mut training_config = config.training.clone();
        if let Some(e) = epochs {
            training_config.epochs = e;
        }
        if let Some(lr) = lr {
            training_config.learning_rate = lr;
        }

        println!("Initializing training...");

        let db = Database::open(&config.data.database_path)?;
        let games = load_games(&db, start_year, end_year)?;
        if games.is_empty() {
            return Err(GridironError::Config(
                "No games in database. Run 'gridiron data sync' first.".to_string(),
            ));
        }
        println!("Loaded {} games from database", games.len());

        let (_, table) = build_feature_table(config, games);
        let dataset = TrainingSet::from_table(&table);
        let (train_set, val_set) =
            dataset.split(training_config.validation_fraction, training_config.seed);
        println!("  {} training samples", train_set.len());
        println!("  {} validation samples", val_set.len());

        let model_config = ScoreModelConfig {
            hidden_dims: training_config.hidden_dims.clone(),
            dropout: training_config.dropout,
            ..ScoreModelConfig::default()
        };

        let device = Default::default();
        let trainer = ScoreTrainer::<MyAutodiffBackend>::new(
            device,
            &model_config,
            training_config.learning_rate,
        );

        println!("Learning rate: {}", training_config.learning_rate);
        println!("\nStarting training...\n");

        let trained = trainer.train(&train_set, &val_set, &training_config)?;
        let history = &trained.history;

        let summary = TrainingSummary {
            start_season: start_year,
            end_season: end_year,
            train_games: train_set.len(),
            val_games: val_set.len(),
            epochs_run: history.epochs_run(),
            best_epoch: history.best_epoch,
            best_val_loss: history.best_val_loss,
            val_home_mae: trained.val_metrics.home_mae(),
            val_away_mae: trained.val_metrics.away_mae(),
            val_rmse: trained.val_metrics.rmse(),
        };
        let artifacts = ModelArtifacts::new(&trained, model_config, summary);

        println!("\nSaving model to {}...", config.data.model_dir);
        artifacts.save(&trained.model, &config.data.model_dir)?;

        println!("\nTraining complete!");
        println!("  Best epoch:     {}", history.best_epoch + 1);
        println!("  Best val loss:  {:.4}", history.best_val_loss);
        println!("  Val metrics:    {}", trained.val_metrics);

        Ok(())
    }

    pub fn predict(
        config: &Config,
        year: i32,
        week: u32,
        out: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        use burn::backend::NdArray;
        use gridiron::predict::{format_predictions, Predictor};

        type MyBackend = NdArray<f32>;

        let device = Default::default();
        let predictor = Predictor::<MyBackend>::load(&config.data.model_dir, device)?;

        let db = Database::open(&config.data.database_path)?;
        if db.get_season(year)?.is_empty() {
            log::info!("Season {} not stored, fetching schedule", year);
            let rows = build_scraper(config, false, false)?.fetch_season(year)?;
            db.upsert_games(year, &rows)?;
        }

        // Features for the whole season so each week sees all earlier results.
        // Ratings and games played restart here, while training carries them
        // across every season in its range, so predicted rows sit near 1500 Elo
        // and 0-17 games played.
        let games = load_games(&db, year, year)?;
        let (_, table) = build_feature_table(config, games);
        let predictions = predictor.predict_week(&table, week)?;

        if let Some(path) = &out {
            let file = std::fs::File::create(path)?;
            write_csv(std::io::BufWriter::new(file), &predictions)?;
            println!("Wrote predictions to {}", path);
        }

        match format {
            OutputFormat::Table => {
                println!("Week {} {}", week, year);
                print!("{}", format_predictions(&predictions));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&predictions)?);
            }
            OutputFormat::Csv => write_csv(std::io::stdout().lock(), &predictions)?,
        }

        Ok(())
    }

    fn write_csv<W: std::io::Write>(
        mut out: W,
        predictions: &[gridiron::predict::GamePrediction],
    ) -> Result<()> {
        writeln!(
            out,
            "date,home,away,pred_home_points,pred_away_points,pred_margin"
        )?;
        for p in predictions {
            writeln!(
                out,
                "{},{},{},{},{},{}",
                p.date, p.home, p.away, p.pred_home_points, p.pred_away_points, p.pred_margin
            )?;
        }
        Ok(())
    }
}
