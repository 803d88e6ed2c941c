use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_api::models::user::NewUser;
use notes_api::store::postgres::PgStore;
use notes_api::{api, cli, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "notes_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(&cfg, port).await,
        Some(cli::Commands::Client { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            handle_client_command(&db, &cfg, command).await
        }
        Some(cli::Commands::User { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            handle_user_command(&db, &cfg, command).await
        }
        None => run_server(&cfg, cfg.port).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: &config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = Arc::new(AppState::with_store(Arc::new(db)));

    let app = api::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Notes API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_client_command(
    db: &PgStore,
    cfg: &config::Config,
    cmd: cli::ClientCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::ClientCommands::Add {
            id,
            secret,
            redirect_uri,
            extra,
        } => {
            let secret_hash = bcrypt::hash(&secret, cfg.bcrypt_cost)?;
            db.insert_client(&id, &secret_hash, &redirect_uri, &extra)
                .await?;
            println!("Client registered:");
            println!("  ID:           {}", id);
            println!("  Redirect URI: {}", redirect_uri);
        }
        cli::ClientCommands::List => {
            let clients = db.list_clients().await?;
            if clients.is_empty() {
                println!("No clients registered.");
            } else {
                println!("{:<20} {:<40} CREATED", "ID", "REDIRECT URI");
                for c in clients {
                    println!(
                        "{:<20} {:<40} {}",
                        c.id,
                        c.redirect_uri,
                        c.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_user_command(
    db: &PgStore,
    cfg: &config::Config,
    cmd: cli::UserCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::UserCommands::Add {
            email,
            password,
            firstname,
            lastname,
            scope,
        } => {
            let password_hash = bcrypt::hash(&password, cfg.bcrypt_cost)?;
            let user = db
                .insert_user(&NewUser {
                    email,
                    password_hash,
                    firstname,
                    lastname,
                    scope,
                })
                .await?;
            println!("User created:");
            println!("  ID:    {}", user.id);
            println!("  Email: {}", user.email);
        }
    }
    Ok(())
}
