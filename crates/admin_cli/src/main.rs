use std::error::Error;

use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, MemberRole};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "famledger_admin")]
#[command(about = "Admin utilities for famledger (bootstrap families, members and tokens)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./famledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Family(Family),
    Member(Member),
    Token(Token),
}

#[derive(Args, Debug)]
struct Family {
    #[command(subcommand)]
    command: FamilyCommand,
}

#[derive(Subcommand, Debug)]
enum FamilyCommand {
    /// Creates a family and its first admin member.
    Create(FamilyCreateArgs),
}

#[derive(Args, Debug)]
struct FamilyCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    admin: String,
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Add(MemberAddArgs),
}

#[derive(Args, Debug)]
struct MemberAddArgs {
    /// Family id, as printed by `family create`.
    #[arg(long)]
    family: String,
    #[arg(long)]
    username: String,
    #[arg(long, default_value = "editor", value_parser = parse_role)]
    role: MemberRole,
}

#[derive(Args, Debug)]
struct Token {
    #[command(subcommand)]
    command: TokenCommand,
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    Issue(TokenIssueArgs),
    Revoke(TokenRevokeArgs),
}

#[derive(Args, Debug)]
struct TokenIssueArgs {
    #[arg(long)]
    username: String,
    /// Token lifetime in days; tokens never expire when omitted.
    #[arg(long)]
    expires_in_days: Option<i64>,
}

#[derive(Args, Debug)]
struct TokenRevokeArgs {
    #[arg(long)]
    token: String,
}

fn parse_role(raw: &str) -> Result<MemberRole, String> {
    MemberRole::try_from(raw.trim().to_lowercase().as_str()).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Family(Family {
            command: FamilyCommand::Create(args),
        }) => {
            let (family, admin) = engine.new_family(&args.name, &args.admin).await?;
            println!("created family: {} ({})", family.name, family.id);
            println!("admin member: {}", admin.username);
        }
        Command::Member(Member {
            command: MemberCommand::Add(args),
        }) => {
            let family_id = engine::parse_uuid(&args.family, "family")?;
            let member = engine
                .add_member(family_id, &args.username, args.role)
                .await?;
            println!(
                "added member: {} ({})",
                member.username,
                member.role.as_str()
            );
        }
        Command::Token(Token {
            command: TokenCommand::Issue(args),
        }) => {
            let expires_at = match args.expires_in_days {
                Some(days) if days <= 0 => {
                    eprintln!("--expires-in-days must be positive");
                    std::process::exit(2);
                }
                Some(days) => Some(Utc::now() + Duration::days(days)),
                None => None,
            };
            let token = engine.issue_token(&args.username, expires_at).await?;
            println!("{token}");
        }
        Command::Token(Token {
            command: TokenCommand::Revoke(args),
        }) => {
            engine.revoke_token(&args.token).await?;
            println!("token revoked");
        }
    }

    Ok(())
}
