use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use fruitful_backend::manage::{self, AdminGate, CreateOutcome, CreateUser};

#[derive(Parser)]
#[command(name = "manage-users", about = "Manage Fruitful Lab users")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new user
    Create {
        email: String,
        password: String,
        /// Optional full name for the user
        #[arg(long = "name")]
        full_name: Option<String>,
        /// Create as admin (requires ADMIN_CREATION_SECRET)
        #[arg(long)]
        admin: bool,
        /// Comma-separated groups, e.g. "contractor,foo"
        #[arg(long)]
        groups: Option<String>,
    },
    /// Delete a user by email
    Delete { email: String },
    /// List all users
    List,
    /// Wipe ALL users from the database
    Wipe {
        /// Skip interactive confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn prompt(message: &str) -> io::Result<String> {
    eprint!("{message}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "Missing required environment variable: DATABASE_URL")?;

    // Check the admin secret before touching the database. The secret is read
    // without echo.
    if let Command::Create { admin: true, .. } = &cli.command {
        let expected = std::env::var("ADMIN_CREATION_SECRET").unwrap_or_default();
        let gate = manage::authorize_admin_creation(&expected, || {
            rpassword::prompt_password("Admin creation secret: ")
        })?;
        match gate {
            AdminGate::NotConfigured => {
                eprintln!(
                    "ADMIN_CREATION_SECRET is not set in the environment. \
                     Refusing to create an admin user."
                );
                return Ok(ExitCode::FAILURE);
            }
            AdminGate::Rejected => {
                eprintln!("Invalid admin creation secret. Aborting admin user creation.");
                return Ok(ExitCode::FAILURE);
            }
            AdminGate::Allowed => {}
        }
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    match cli.command {
        Command::Create {
            email,
            password,
            full_name,
            admin,
            groups,
        } => {
            let outcome = manage::create_user(
                &pool,
                CreateUser {
                    email: &email,
                    password: &password,
                    full_name: full_name.as_deref(),
                    is_admin: admin,
                    groups: manage::parse_groups(groups.as_deref()),
                },
            )
            .await?;

            match outcome {
                CreateOutcome::Created(user) => {
                    let tag = if user.is_admin { " [ADMIN]" } else { "" };
                    println!(
                        "Created user {} (id={}){tag} groups=[{}]",
                        user.email,
                        user.id,
                        user.groups.join(", ")
                    );
                }
                CreateOutcome::AlreadyExists(user) => {
                    println!("User with email {} already exists (id={}).", user.email, user.id);
                }
            }
        }
        Command::Delete { email } => {
            if manage::delete_user(&pool, &email).await? {
                println!("Deleted user {email}");
            } else {
                println!("User with email {email} not found.");
            }
        }
        Command::List => {
            for user in manage::list_users(&pool).await? {
                println!("{}", manage::describe(&user));
            }
        }
        Command::Wipe { yes } => {
            if !yes && prompt("This will DELETE ALL USERS. Type \"WIPE\" to confirm: ")? != "WIPE" {
                println!("Aborted. No changes made.");
                return Ok(ExitCode::SUCCESS);
            }
            let count = manage::wipe_users(&pool).await?;
            println!("Wiped users table. Deleted {count} user(s).");
        }
    }

    pool.close().await;
    Ok(ExitCode::SUCCESS)
}
