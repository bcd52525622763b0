use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use qdispatch::config::{Backoff, Config, PoolConfig, Toolchain};
use qdispatch::db::store::SqliteStore;
use qdispatch::dispatch::pool::Dispatcher;
use qdispatch::dispatch::Engine;
use qdispatch::language::Language;
use qdispatch::report::render_status;
use qdispatch::request::processing::{ProcessResource, ProcessingRequest};
use qdispatch::WorkingDirectory;

#[derive(Parser, Debug)]
#[command(name = "qdispatch")]
#[command(author = "Research Computing")]
#[command(version = "0.1.0")]
#[command(about = "Submit processing requests to the cluster and track them")]
struct Args {
    /// Directory containing the request database
    #[arg(short, long, default_value = ".")]
    work_dir: PathBuf,
    /// Directory with one launch script template folder per language
    #[arg(short, long, default_value = "data/templates")]
    template_dir: PathBuf,
    /// Directory with one compile resource folder per language
    #[arg(short, long, default_value = "resources")]
    resource_dir: PathBuf,
    /// Cluster scheduler submission command
    #[arg(long, default_value = "qsub")]
    submit_command: String,
    #[arg(long, default_value = "python")]
    python: String,
    #[arg(long, default_value = "Rscript")]
    rscript: String,
    #[arg(long, default_value = "javac")]
    javac: String,
    #[arg(long, default_value = "java")]
    java: String,
    /// Seconds a worker waits before dispatching each request
    #[arg(long, default_value_t = 20)]
    backoff_secs: u64,
    #[arg(long, default_value_t = 2)]
    workers: usize,
    #[arg(long, default_value_t = 10)]
    queue_depth: usize,
    /// Record FINISHED_OK as soon as the scheduler accepts a script
    #[arg(long)]
    finish_on_handoff: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new request and copy its source file into the job directory
    Register {
        #[arg(long)]
        identifier: String,
        #[arg(long, value_enum)]
        language: Language,
        /// Source file to process
        #[arg(long)]
        source: PathBuf,
        /// Job directory, with a trailing separator
        #[arg(long)]
        base_path: String,
        #[arg(long)]
        investigator: Option<i64>,
        /// Compile resource, repeat for more than one
        #[arg(long = "resource")]
        resources: Vec<String>,
    },
    /// Dispatch registered requests and wait until each has been handed to the scheduler
    Submit {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Check whether a request's job has finished
    Poll {
        identifier: String,
        /// Keep polling every N seconds until the job ends
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Check the launch script template for a request's language exists
    Validate {
        identifier: String,
    },
    /// Show a request summary
    Status {
        identifier: String,
    },
    /// List requests as JSON lines
    List {
        #[arg(long)]
        investigator: Option<i64>,
    },
    /// Fail requests stuck in PROCESSING
    Expire {
        #[arg(long, default_value_t = 24)]
        max_age_hours: i64,
    },
}

impl Args {
    fn config(&self) -> Config {
        Config {
            template_dir: self.template_dir.clone(),
            resource_dir: self.resource_dir.clone(),
            toolchain: Toolchain {
                python: self.python.clone(),
                rscript: self.rscript.clone(),
                javac: self.javac.clone(),
                java: self.java.clone(),
                submit: self.submit_command.clone(),
            },
            backoff: match self.backoff_secs {
                0 => Backoff::None,
                secs => Backoff::Fixed(Duration::from_secs(secs)),
            },
            pool: PoolConfig { workers: self.workers, queue_depth: self.queue_depth },
            finish_on_handoff: self.finish_on_handoff,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("terve! starting up :)");

    let args = Args::parse();
    let wd = WorkingDirectory { path: args.work_dir.clone() };
    let store = Arc::new(SqliteStore::open(&wd).context("Opening request database")?);
    let engine = Arc::new(Engine::new(args.config(), store.clone()));

    match args.command {
        Command::Register { identifier, language, source, base_path, investigator, resources } => {
            let bytes = fs::read(&source).with_context(|| format!("Reading {}", source.display()))?;
            let file_name = source.file_name()
                .context("Source path has no file name")?
                .to_string_lossy()
                .into_owned();
            let request = ProcessingRequest::new(&identifier, &language.to_string(), bytes, &file_name,
                                                 &base_path, investigator);
            fs::create_dir_all(request.job_dir())?;
            fs::write(request.source_path(), &request.bytes)?;

            let resources: Vec<ProcessResource> = resources.into_iter().map(ProcessResource::new).collect();
            store.insert(&request, &resources)?;
            println!("{}", identifier);
        }
        Command::Submit { identifiers } => {
            let (dispatcher, mut notifications) = Dispatcher::start(engine.clone());
            let mut rejected = 0;
            for identifier in &identifiers {
                let submitted = engine.find_request(identifier)
                    .and_then(|request| Ok((request, engine.store().resources(identifier)?)))
                    .and_then(|(request, resources)| dispatcher.submit(request, resources));
                if let Err(err) = submitted {
                    warn!("Not submitting {}: {}", identifier, err);
                    rejected += 1;
                }
            }

            // accepted requests are dispatched even if others were rejected
            dispatcher.shutdown().await;
            while let Some(identifier) = notifications.try_recv() {
                let request = engine.find_request(&identifier)?;
                println!("{}\t{}", identifier, request.state);
            }
            if rejected > 0 {
                bail!("{} of {} requests were not submitted", rejected, identifiers.len());
            }
        }
        Command::Poll { identifier, interval } => {
            loop {
                let ended = engine.poll_completion(&identifier)?;
                match (ended, interval) {
                    (true, _) => {
                        println!("{}", engine.find_request(&identifier)?.state);
                        break;
                    }
                    (false, Some(secs)) => tokio::time::sleep(Duration::from_secs(secs)).await,
                    (false, None) => {
                        println!("not finished");
                        break;
                    }
                }
            }
        }
        Command::Validate { identifier } => {
            let request = engine.find_request(&identifier)?;
            engine.validate_language_template(&request)?;
            println!("ok");
        }
        Command::Status { identifier } => {
            let request = engine.find_request(&identifier)?;
            print!("{}", render_status(&request)?);
        }
        Command::List { investigator } => {
            let requests = match investigator {
                Some(id) => store.find_by_investigator(id)?,
                None => store.find_all()?,
            };
            for request in requests {
                println!("{}", serde_json::to_string(&request)?);
            }
        }
        Command::Expire { max_age_hours } => {
            if max_age_hours <= 0 {
                bail!("--max-age-hours must be positive");
            }
            for identifier in engine.expire_stale(chrono::Duration::hours(max_age_hours))? {
                println!("{}", identifier);
            }
        }
    }

    Ok(())
}
