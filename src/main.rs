use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use krlife_console::config::ConsoleConfig;
use krlife_console::models::*;
use krlife_console::views::{self, ReleasedQuery, ReviewQuery, Timeframe};
use krlife_console::Console;

/// Moderation console for the KR Life content pipeline.
#[derive(Parser)]
#[command(name = "krlife", about = "Moderation console for KR Life sources and posts")]
struct Cli {
    /// Overrides KR_API_BASE_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an editor account and sign in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "KR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    #[command(subcommand)]
    Users(UserCommands),
    #[command(subcommand)]
    Sources(SourceCommands),
    #[command(subcommand)]
    Posts(PostCommands),
}

#[derive(Subcommand)]
enum UserCommands {
    /// List the team.
    List,
    /// Change a member's role (owner only).
    SetRole { id: String, role: Role },
    /// Rename yourself.
    Rename { name: String },
}

#[derive(Subcommand)]
enum SourceCommands {
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long = "type", default_value = "all")]
        kind: Selection<SourceType>,
        #[arg(long, default_value = "all")]
        status: Selection<SourceStatus>,
    },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        handle: String,
        #[arg(long = "type", default_value = "telegram")]
        kind: SourceType,
        #[arg(long, default_value = "")]
        filter_prompt: String,
        #[arg(long, default_value = "")]
        format_prompt: String,
    },
    Pause { id: String },
    Resume { id: String },
    Toggle { id: String },
    /// Replace both ingestion prompts.
    Prompts {
        id: String,
        #[arg(long)]
        filter_prompt: String,
        #[arg(long)]
        format_prompt: String,
    },
}

#[derive(Subcommand)]
enum PostCommands {
    /// Unpublished posts, newest first, grouped by day.
    Review {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        status: Selection<PostStatus>,
        #[arg(long, default_value = "all")]
        source: Selection<String>,
    },
    /// Published posts.
    Released {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        source: Selection<String>,
        /// all, 7d, 30d or 90d.
        #[arg(long, default_value = "30d")]
        timeframe: Timeframe,
    },
    /// A post with its history.
    Show { id: String },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Comma-separated.
        #[arg(long)]
        tags: Option<String>,
    },
    Approve {
        id: String,
        #[arg(long, default_value = "Post approved")]
        comment: String,
    },
    Publish {
        id: String,
        #[arg(long, default_value = "Sent to the channel")]
        comment: String,
    },
    Reject {
        id: String,
        #[arg(long, default_value = "Rejected")]
        comment: String,
    },
    /// Move to any status.
    Move {
        id: String,
        status: PostStatus,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is a development convenience only
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = ConsoleConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        cfg = cfg.with_api_base_url(url)?;
    }
    info!(api = %cfg.api_base_url, "console starting");

    let console = Console::from_config(&cfg);
    match cli.command {
        Commands::Login { email, password } => {
            let user = console.session.login(&email, &password).await?;
            println!("Signed in as {} <{}> ({})", user.name, user.email, user.role);
        }
        Commands::Register { email, name, password } => {
            let user = console.session.register(&email, &password, &name).await?;
            println!("Registered {} <{}> ({})", user.name, user.email, user.role);
        }
        Commands::Logout => {
            console.logout()?;
            println!("Signed out");
        }
        command => {
            if console.session.restore().await?.is_none() {
                bail!("not signed in; run `krlife login` first");
            }
            run_authenticated(&console, command).await?;
        }
    }
    Ok(())
}

async fn run_authenticated(console: &Console, command: Commands) -> Result<()> {
    match command {
        Commands::Whoami => {
            let user = console.session.user().context("session has no user")?;
            println!("{} <{}> ({}) id={}", user.name, user.email, user.role, user.id);
        }
        Commands::Users(cmd) => users(console, cmd).await?,
        Commands::Sources(cmd) => sources(console, cmd).await?,
        Commands::Posts(cmd) => posts(console, cmd).await?,
        Commands::Login { .. } | Commands::Register { .. } | Commands::Logout => {}
    }
    Ok(())
}

async fn users(console: &Console, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::List => {
            let users = console.session.fetch_users().await?;
            println!(
                "{} members, {} editors",
                users.len(),
                views::count_role(&users, Role::Editor)
            );
            for u in &users {
                println!("{:<38} {:<8} {:<24} {}", u.id, u.role, u.name, u.email);
            }
        }
        UserCommands::SetRole { id, role } => {
            let user = console.session.update_user_role(&id, role).await?;
            println!("{} is now {}", user.name, user.role);
        }
        UserCommands::Rename { name } => {
            let user = console.session.update_profile(&name).await?;
            println!("Renamed to {}", user.name);
        }
    }
    Ok(())
}

async fn sources(console: &Console, cmd: SourceCommands) -> Result<()> {
    let content = &console.content;
    match cmd {
        SourceCommands::List { query, kind, status } => {
            let all = content.fetch_sources().await?;
            let filters = content.update_filters(FilterUpdate {
                query: Some(query),
                source_type: Some(kind),
                source_status: Some(status),
                post_status: None,
            });
            let shown = views::filter_sources(&all, &filters);
            let totals = views::source_totals(&all);
            println!(
                "{} of {} sources ({} active, {} telegram, {} website)",
                shown.len(),
                totals.total,
                totals.active,
                totals.telegram,
                totals.website
            );
            for s in shown {
                print_source(s);
            }
        }
        SourceCommands::Add { title, handle, kind, filter_prompt, format_prompt } => {
            let new = NewSource { title, handle, kind, status: SourceStatus::Active, filter_prompt, format_prompt };
            let created = content.add_source(new).await?;
            print_source(&created);
        }
        SourceCommands::Pause { id } => print_source(&content.update_source_status(&id, SourceStatus::Paused).await?),
        SourceCommands::Resume { id } => print_source(&content.update_source_status(&id, SourceStatus::Active).await?),
        SourceCommands::Toggle { id } => {
            content.fetch_sources().await?;
            print_source(&content.toggle_source_status(&id).await?);
        }
        SourceCommands::Prompts { id, filter_prompt, format_prompt } => {
            let updated = content.update_source_prompts(&id, SourcePrompts { filter_prompt, format_prompt }).await?;
            print_source(&updated);
            println!("  filter: {}", updated.filter_prompt);
            println!("  format: {}", updated.format_prompt);
        }
    }
    Ok(())
}

async fn posts(console: &Console, cmd: PostCommands) -> Result<()> {
    let content = &console.content;
    match cmd {
        PostCommands::Review { query, status, source } => {
            let all = content.fetch_posts(&PostFilter::default()).await?;
            let q = ReviewQuery { query, status, source_id: source };
            let queue = views::sort_by_recent(views::review_queue(&all, &q));
            println!("{} posts to review", queue.len());
            for group in views::group_by_day(&queue, Utc::now().date_naive()) {
                println!("\n{}", group.label);
                for p in group.posts {
                    print_post_line(p);
                }
            }
        }
        PostCommands::Released { query, source, timeframe } => {
            let filter = PostFilter { status: Some(PostStatus::Published), ..Default::default() };
            let all = content.fetch_posts(&filter).await?;
            let q = ReleasedQuery { query, source_id: source, timeframe };
            let feed = views::released(&all, &q, Utc::now());
            let totals = views::released_totals(&feed);
            println!("{} published", totals.total);
            for (source_id, n) in &totals.by_source {
                println!("  {source_id}: {n}");
            }
            for p in feed {
                print_post_line(p);
            }
        }
        PostCommands::Show { id } => {
            let post = load_post(console, &id).await?;
            print_post_line(&post);
            println!("source: {} {}", post.source_id, post.source_handle.as_deref().unwrap_or(""));
            println!("tags: {}", post.tags.join(", "));
            println!("next: {}", post.status.forward_targets().iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "));
            println!("\n{}\n", post.content);
            for h in &post.history {
                println!(
                    "{} {:<9} {:<12} {}",
                    h.timestamp.format("%Y-%m-%d %H:%M"),
                    h.action,
                    h.author,
                    h.comment.as_deref().unwrap_or("")
                );
            }
        }
        PostCommands::Edit { id, title, content: body, tags } => {
            let post = load_post(console, &id).await?;
            let upd = UpdatePost {
                title: title.unwrap_or(post.title),
                content: body.unwrap_or(post.content),
                tags: tags.as_deref().map(views::parse_tags).unwrap_or(post.tags),
            };
            print_post_line(&content.update_post(&id, upd).await?);
        }
        PostCommands::Approve { id, comment } => move_post(console, &id, PostStatus::Approved, Some(comment)).await?,
        PostCommands::Publish { id, comment } => move_post(console, &id, PostStatus::Published, Some(comment)).await?,
        PostCommands::Reject { id, comment } => move_post(console, &id, PostStatus::Rejected, Some(comment)).await?,
        PostCommands::Move { id, status, comment } => move_post(console, &id, status, comment).await?,
    }
    Ok(())
}

async fn load_post(console: &Console, id: &str) -> Result<Post> {
    console.content.fetch_posts(&PostFilter::default()).await?;
    console.content.post(id).with_context(|| format!("no post with id '{id}'"))
}

async fn move_post(console: &Console, id: &str, status: PostStatus, comment: Option<String>) -> Result<()> {
    // cache the post so a non-forward move is reported
    load_post(console, id).await?;
    let post = console.content.move_to_status(id, status, comment).await?;
    print_post_line(&post);
    Ok(())
}

fn print_source(s: &Source) {
    println!("{:<38} {:<8} {:<7} {:<28} {}", s.id, s.kind, s.status, s.title, s.handle);
}

fn print_post_line(p: &Post) {
    println!(
        "{:<38} {:<9} {} {}  [{}]",
        p.id,
        p.status,
        p.activity_at().format("%Y-%m-%d %H:%M"),
        p.title,
        p.tags.join(", ")
    );
}
