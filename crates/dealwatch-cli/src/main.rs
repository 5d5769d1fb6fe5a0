use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use dealwatch_core::normalize_keyword;
use dealwatch_worker::Worker;

#[derive(Debug, Parser)]
#[command(name = "dealwatch")]
#[command(about = "Hotdeal keyword watcher: crawl shopping boards, mail subscribers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one crawl-and-notify cycle and exit.
    Run,
    /// Run the recurring scheduler until interrupted.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Inspect registered keywords and their crawl state.
    Keyword {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Subscribe an email address to a keyword, creating both as needed.
    Subscribe {
        keyword: String,
        #[arg(long)]
        email: String,
        /// Display name used in notification emails; defaults to the part of
        /// the email before the @.
        #[arg(long)]
        nickname: Option<String>,
    },
    /// Remove a subscription; the keyword is deleted once nobody follows it.
    Unsubscribe {
        keyword: String,
        #[arg(long)]
        email: String,
    },
}

#[derive(Debug, Subcommand)]
enum KeywordCommands {
    /// List every registered keyword.
    List,
    /// Show the stored per-site anchor state for one keyword.
    Show { title: String },
}

impl Commands {
    /// Subcommands that apply pending migrations before doing their work.
    /// Inspection and subscription commands run against the schema as-is so
    /// that `migrate` stays the one place the schema changes deliberately.
    fn applies_migrations(&self) -> bool {
        matches!(self, Commands::Run | Commands::Serve | Commands::Migrate)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = dealwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let pool_config = dealwatch_db::PoolConfig::from_app_config(&config);
    let pool = dealwatch_db::connect_pool(&config.database_url, pool_config).await?;
    if cli.command.applies_migrations() {
        dealwatch_db::run_migrations(&pool).await?;
    }

    match cli.command {
        Commands::Run => run_once(&config, pool).await,
        Commands::Serve => serve(&config, pool).await,
        Commands::Migrate => {
            println!("database schema is up to date");
            Ok(())
        }
        Commands::Keyword { command } => match command {
            KeywordCommands::List => list_keywords(&pool).await,
            KeywordCommands::Show { title } => show_keyword(&pool, &title).await,
        },
        Commands::Subscribe {
            keyword,
            email,
            nickname,
        } => subscribe(&pool, &keyword, &email, nickname.as_deref()).await,
        Commands::Unsubscribe { keyword, email } => unsubscribe(&pool, &keyword, &email).await,
    }
}

async fn run_once(config: &dealwatch_core::AppConfig, pool: PgPool) -> anyhow::Result<()> {
    let worker = Worker::from_config(config, pool)?;
    let summary = worker.run_once().await?;
    println!(
        "crawled {} keywords, {} with new items ({} items), {} emails sent",
        summary.keywords_crawled,
        summary.keywords_with_new_items,
        summary.new_items,
        summary.emails_sent,
    );
    Ok(())
}

async fn serve(config: &dealwatch_core::AppConfig, pool: PgPool) -> anyhow::Result<()> {
    let worker = Arc::new(Worker::from_config(config, pool)?);
    let _scheduler = dealwatch_worker::build_scheduler(worker, config.env).await?;
    tracing::info!(env = %config.env, "scheduler started");

    shutdown_signal().await;
    Ok(())
}

async fn list_keywords(pool: &PgPool) -> anyhow::Result<()> {
    let keywords = dealwatch_db::list_keywords(pool).await?;
    if keywords.is_empty() {
        println!("no keywords registered");
        return Ok(());
    }
    for keyword in keywords {
        println!(
            "{:>6}  {}  (since {})",
            keyword.id,
            keyword.title,
            keyword.created_at.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

async fn show_keyword(pool: &PgPool, title: &str) -> anyhow::Result<()> {
    let normalized = normalize_keyword(title);
    let Some(keyword) = dealwatch_db::get_keyword_by_title(pool, &normalized).await? else {
        anyhow::bail!("keyword not found: {normalized}");
    };

    println!("keyword #{}: {}", keyword.id, keyword.title);
    let anchors = dealwatch_db::list_anchors(pool, keyword.id).await?;
    if anchors.is_empty() {
        println!("  not crawled yet");
        return Ok(());
    }
    for anchor in anchors {
        println!(
            "  {:<10} anchors=[{}] last={} updated {}",
            anchor.site,
            anchor.anchor_ids.join(", "),
            anchor.link.as_deref().unwrap_or("-"),
            anchor.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

async fn subscribe(
    pool: &PgPool,
    keyword: &str,
    email: &str,
    nickname: Option<&str>,
) -> anyhow::Result<()> {
    let normalized = normalize_keyword(keyword);
    if normalized.is_empty() {
        anyhow::bail!("keyword is empty after normalization: {keyword:?}");
    }

    let nickname = match nickname {
        Some(n) => n,
        None => email.split('@').next().unwrap_or(email),
    };

    let user = dealwatch_db::upsert_user(pool, email, nickname).await?;
    let keyword = dealwatch_db::insert_keyword(pool, &normalized).await?;
    dealwatch_db::link_user_keyword(pool, user.id, keyword.id).await?;

    println!("{} now follows \"{}\"", user.email, keyword.title);
    Ok(())
}

async fn unsubscribe(pool: &PgPool, keyword: &str, email: &str) -> anyhow::Result<()> {
    let normalized = normalize_keyword(keyword);
    let Some(user) = dealwatch_db::get_user_by_email(pool, email).await? else {
        anyhow::bail!("no user with email {email}");
    };
    let Some(keyword) = dealwatch_db::get_keyword_by_title(pool, &normalized).await? else {
        anyhow::bail!("keyword not found: {normalized}");
    };

    let removed = dealwatch_db::unlink_user_keyword(pool, user.id, keyword.id).await?;
    if !removed {
        println!("{} was not following \"{}\"", user.email, keyword.title);
        return Ok(());
    }

    println!("{} no longer follows \"{}\"", user.email, keyword.title);
    if dealwatch_db::delete_keyword_if_unused(pool, keyword.id).await? {
        println!("\"{}\" had no other followers and was removed", keyword.title);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, shutting down");
}
