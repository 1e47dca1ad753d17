use anyhow::Context;
use chordscope_client::analysis::AnalysisService;
use chordscope_client::api::ApiClient;
use chordscope_client::auth::AuthService;
use chordscope_client::config::ClientConfig;
use chordscope_client::error::ApiError;
use chordscope_client::playback::{ChordState, Timeline, TimelineFollower};
use chordscope_client::protocol::{AnalysisResult, HistoryItem};
use chordscope_client::store::{default_store_path, FileStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Playback display refresh period.
const TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "chordscope")]
struct Args {
    /// API base url (overrides CHORDSCOPE_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Preference file holding tokens and profile data.
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    /// Analyse a YouTube link or a local audio file.
    Analyze {
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Follow the chord timeline after the analysis finishes.
        #[arg(long, default_value_t = false)]
        play: bool,
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    History,
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Download the analysed audio of a job.
    Audio {
        job_id: String,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },
    /// Simulate playback of a history entry, printing each chord change.
    Play {
        id: String,
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url.as_deref() {
        config.base_url = url::Url::parse(url.trim())
            .with_context(|| format!("invalid --api-url {url:?}"))?;
    }

    let store_path = match args.store.clone() {
        Some(p) => p,
        None => default_store_path()?,
    };
    tracing::debug!(store = %store_path.display(), "using preference store");
    let store = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("failed to open store {}", store_path.display()))?,
    );

    let api = Arc::new(ApiClient::new(config, store)?);
    let auth = AuthService::new(Arc::clone(&api));
    let analysis = AnalysisService::new(Arc::clone(&api));

    match run(args.command, &auth, &analysis).await {
        Err(e) if is_session_expired(&e) => {
            eprintln!("session expired; run `chordscope login` again");
            Err(e)
        }
        other => other,
    }
}

async fn run(command: Command, auth: &AuthService, analysis: &AnalysisService) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let resp = auth.login(&email, &password).await?;
            eprintln!(
                "logged in as {}",
                resp.name.as_deref().unwrap_or(resp.email.as_deref().unwrap_or(&email))
            );
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let resp = auth.register(&name, &email, &password).await?;
            eprintln!("registered {}", resp.email);
        }
        Command::Logout => {
            auth.logout()?;
            eprintln!("logged out");
        }
        other => {
            if !auth.is_logged_in()? {
                return Err(anyhow::anyhow!("not logged in; run `chordscope login` first"));
            }
            run_authenticated(other, auth, analysis).await?;
        }
    }
    Ok(())
}

async fn run_authenticated(
    command: Command,
    auth: &AuthService,
    analysis: &AnalysisService,
) -> anyhow::Result<()> {
    match command {
        Command::Whoami => {
            let user = auth.user_data()?;
            println!("name:  {}", or_dash(&user.name));
            println!("email: {}", or_dash(&user.email));
        }
        Command::Analyze {
            url,
            file,
            play,
            speed,
        } => {
            let result = if let Some(path) = file {
                eprintln!("uploading {} ...", path.display());
                analysis.analyze_path(&path).await?
            } else {
                let url = url.ok_or_else(|| anyhow::anyhow!("missing --url or --file"))?;
                eprintln!("analysing {url} ...");
                analysis.analyze_link(&url).await?
            };
            print_analysis(&result);

            if play {
                let current = analysis
                    .analysis()
                    .ok_or_else(|| anyhow::anyhow!("no current analysis to play"))?;
                follow(Timeline::from_analysis(&current), speed).await;
            }
        }
        Command::History => {
            let items = analysis.history().await?;
            if items.is_empty() {
                eprintln!("history is empty");
            }
            for item in &items {
                print_history_row(item);
            }
        }
        Command::Show { id } => {
            let item = analysis.history_item(&id).await?;
            print_analysis(&analysis.load_from_history(&item));
        }
        Command::Delete { id } => {
            analysis.delete_history_id(&id).await?;
            eprintln!("deleted {id}");
        }
        Command::Audio { job_id, out } => {
            let bytes = analysis.audio(&job_id).await?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!("wrote {} bytes to {}", bytes.len(), out.display());
        }
        Command::Play { id, speed } => {
            let item = analysis.history_item(&id).await?;
            let current = analysis.load_from_history(&item);
            eprintln!("playing {}", current.title.as_deref().unwrap_or("untitled"));
            follow(Timeline::from_analysis(&current), speed).await;
        }
        Command::Login { .. } | Command::Register { .. } | Command::Logout => {}
    }

    Ok(())
}

/// Drives a simulated playback clock through the timeline.
async fn follow(timeline: Timeline, speed: f64) {
    if timeline.is_empty() {
        eprintln!("no chords to play");
        return;
    }
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    let end = timeline.duration();
    let step = TICK.as_secs_f64() * speed;

    let mut follower = TimelineFollower::new(timeline);
    let mut ticker = tokio::time::interval(TICK);
    let mut position = 0.0_f64;
    while position <= end {
        ticker.tick().await;
        if let Some(state) = follower.tick(position) {
            print_chord_state(position, &state);
        }
        position += step;
    }
}

fn print_chord_state(position: f64, state: &ChordState) {
    println!(
        "{:>7.2}s  {:<8} (prev {:<6} next {})",
        position,
        state.active.as_deref().unwrap_or("-"),
        state.previous.as_deref().unwrap_or("-"),
        state.next.as_deref().unwrap_or("-"),
    );
}

fn print_analysis(a: &AnalysisResult) {
    println!("title: {}", a.title.as_deref().unwrap_or("-"));
    println!("job:   {}", a.job_id.as_deref().unwrap_or("-"));
    println!("key:   {}", a.key.as_deref().unwrap_or("Unknown"));
    println!("tempo: {} bpm", a.tempo_bpm.unwrap_or(0.0).round());
    println!("chords: {}", a.chords.len());
    for c in &a.chords {
        println!(
            "  bar {:>3}  {:>7.2}-{:<7.2}  {}",
            c.bar, c.start_time, c.end_time, c.chord
        );
    }
}

fn print_history_row(item: &HistoryItem) {
    println!(
        "{:<38} {:<40} {:<6} {:>5} {}",
        item.identifier().unwrap_or("(no id)"),
        item.title,
        item.key.as_deref().unwrap_or("-"),
        item.tempo_bpm.map(|t| format!("{t:.0}")).unwrap_or_else(|| "-".to_string()),
        item.analyzed_at.as_deref().unwrap_or("")
    );
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn is_session_expired(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_session_expired)
}
