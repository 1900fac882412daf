use clap::{Parser, Subcommand};
use diesel::r2d2::PoolError;
use diesel::PgConnection;
use rss_poller::config::{self, Config, ConfigError};
use rss_poller::db::{self, DbSetupError, PgFeedStore};
use rss_poller::http_client;
use rss_poller::models::User;
use rss_poller::sync::shutdown::{self, ShutdownTrigger};
use rss_poller::sync::{CycleOutcome, FeedSyncError, PollingLoop, RssReader, SyncFeedJob};
use thiserror::Error;

const DEFAULT_BROWSE_LIMIT: i64 = 2;

#[derive(Debug, Parser)]
#[command(name = "rss_poller")]
#[command(about = "Polls registered RSS feeds and stores their posts.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll feeds one at a time until interrupted.
    Agg {
        /// Time between polls, e.g. `30s`, `1m`, `1h30m`. Defaults to POLL_INTERVAL.
        interval: Option<String>,
    },
    /// Poll a single registered feed right away.
    #[command(arg_required_else_help = true)]
    Fetch { url: String },
    /// Register a user.
    #[command(arg_required_else_help = true)]
    Register { name: String },
    /// List registered users.
    Users,
    /// Register a feed for a user. The user follows it right away.
    #[command(arg_required_else_help = true)]
    Addfeed {
        user: String,
        name: String,
        url: String,
    },
    /// List registered feeds.
    Feeds,
    /// Follow a registered feed.
    #[command(arg_required_else_help = true)]
    Follow { user: String, url: String },
    /// List the feeds a user follows.
    #[command(arg_required_else_help = true)]
    Following { user: String },
    /// Stop following a feed.
    #[command(arg_required_else_help = true)]
    Unfollow { user: String, url: String },
    /// Show the most recent posts from the feeds a user follows.
    #[command(arg_required_else_help = true)]
    Browse {
        user: String,
        #[arg(short, long, default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: i64,
    },
    /// Delete all users, feeds and posts.
    Reset,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Setup(#[from] DbSetupError),
    #[error("failed to get a database connection: {0}")]
    Pool(#[from] PoolError),
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Sync(#[from] FeedSyncError),
    #[error("user {0} is not registered")]
    UnknownUser(String),
    #[error("no feed registered with url {0}")]
    UnknownFeed(String),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_env()?;
    let pool = db::create_connection_pool(&config)?;
    db::run_migrations(&pool)?;

    let store = PgFeedStore::new(pool);

    match cli.command {
        Commands::Agg { interval } => {
            let interval = match interval {
                Some(value) => config::parse_interval(&value)?,
                None => config.poll_interval(),
            };
            let reader = reader(&config)?;
            let (trigger, shutdown) = shutdown::channel();
            stop_on_interrupt(trigger);

            PollingLoop::new(&store, &reader, interval, shutdown)?
                .run()
                .await;
        }
        Commands::Fetch { url } => {
            let reader = reader(&config)?;
            let (trigger, shutdown) = shutdown::channel();
            stop_on_interrupt(trigger);

            let outcome = SyncFeedJob::new(&store, &reader, &shutdown)
                .sync_feed_by_url(&url)
                .await?;

            match outcome {
                CycleOutcome::Synced(report) => println!(
                    "{}: {} new, {} already stored, {} failed, {} skipped",
                    report.feed_url,
                    report.created,
                    report.duplicates,
                    report.failed,
                    report.skipped
                ),
                CycleOutcome::Cancelled(report) => println!(
                    "{}: interrupted after {} new posts",
                    report.feed_url, report.created
                ),
                CycleOutcome::NoFeeds => {}
            }
        }
        Commands::Register { name } => {
            let mut conn = store.pool().get()?;
            let user = db::users::create(&mut conn, &name)?;

            println!("Registered user {} ({})", user.name, user.id);
        }
        Commands::Users => {
            let mut conn = store.pool().get()?;

            for user in db::users::find_all(&mut conn)? {
                println!("* {}", user.name);
            }
        }
        Commands::Addfeed { user, name, url } => {
            let mut conn = store.pool().get()?;
            let owner = find_user(&mut conn, user)?;
            let feed = db::feeds::create(&mut conn, owner.id, &name, &url)?;
            db::feed_follows::create(&mut conn, owner.id, feed.id)?;

            println!("Added feed {} ({})", feed.name, feed.url);
            println!("Now following {} as {}", feed.name, owner.name);
        }
        Commands::Feeds => {
            let mut conn = store.pool().get()?;

            for (feed, owner) in db::feeds::find_all_with_owner(&mut conn)? {
                let last_fetched_at = feed
                    .last_fetched_at
                    .map(|time| time.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());

                println!(
                    "{} {} added by {} (fetched: {})",
                    feed.name, feed.url, owner, last_fetched_at
                );
            }
        }
        Commands::Follow { user, url } => {
            let mut conn = store.pool().get()?;
            let follower = find_user(&mut conn, user)?;
            let feed = db::feeds::find_by_url(&mut conn, &url)?.ok_or(CliError::UnknownFeed(url))?;
            db::feed_follows::create(&mut conn, follower.id, feed.id)?;

            println!("Now following {} as {}", feed.name, follower.name);
        }
        Commands::Following { user } => {
            let mut conn = store.pool().get()?;
            let follower = find_user(&mut conn, user)?;
            let feeds = db::feed_follows::find_feeds_for_user(&mut conn, follower.id)?;

            if feeds.is_empty() {
                println!("{} is not following any feeds", follower.name);
            }

            for feed in feeds {
                println!("* {} ({})", feed.name, feed.url);
            }
        }
        Commands::Unfollow { user, url } => {
            let mut conn = store.pool().get()?;
            let follower = find_user(&mut conn, user)?;

            match db::feed_follows::delete_by_user_and_url(&mut conn, follower.id, &url)? {
                0 => println!("{} does not follow {}", follower.name, url),
                _ => println!("Unfollowed {} for {}", url, follower.name),
            }
        }
        Commands::Browse { user, limit } => {
            let mut conn = store.pool().get()?;
            let follower = find_user(&mut conn, user)?;

            let posts = db::posts::find_recent_for_user(&mut conn, follower.id, limit)?;

            for (post, feed_name) in posts {
                let published_at = post
                    .published_at
                    .map(|time| time.to_rfc2822())
                    .unwrap_or_else(|| "undated".to_string());

                println!("[{}] {} ({})", feed_name, post.title, published_at);
                println!("    {}", post.url);
            }
        }
        Commands::Reset => {
            let mut conn = store.pool().get()?;

            let posts = db::posts::delete_all(&mut conn)?;
            let feeds = db::feeds::delete_all(&mut conn)?;
            let users = db::users::delete_all(&mut conn)?;

            println!("Deleted {} users, {} feeds and {} posts", users, feeds, posts);
        }
    }

    Ok(())
}

fn find_user(conn: &mut PgConnection, name: String) -> Result<User, CliError> {
    db::users::find_by_name(conn, &name)?.ok_or(CliError::UnknownUser(name))
}

fn stop_on_interrupt(trigger: ShutdownTrigger) {
    tokio::spawn(trigger.trigger_on(tokio::signal::ctrl_c()));
}

fn reader(config: &Config) -> Result<RssReader, CliError> {
    let client = http_client::client(config.user_agent(), config.request_timeout())?;

    Ok(RssReader::new(client))
}
