// ICAF CLI - Volunteer and operator tool for the voting API

mod client;

use clap::{Parser, Subcommand};
use colored::Colorize;
use uuid::Uuid;

use client::{ApiClient, Artwork};

/// ICAF - Review submissions and inspect the vote tally
#[derive(Parser)]
#[command(name = "icaf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the ICAF server
    #[arg(long, env = "ICAF_SERVER", default_value = "http://localhost:3000", global = true)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review and manage submitted artworks
    Artworks {
        #[command(subcommand)]
        action: ArtworkAction,
    },
    /// Cast a vote on behalf of a user
    Vote {
        /// Artwork to vote for
        artwork_sk: Uuid,

        /// Voting user
        #[arg(short, long = "user")]
        user_sk: Uuid,
    },
    /// Show the total number of active votes
    Totals,
    /// Check vote counters against the users backing them
    Audit,
}

#[derive(Subcommand)]
enum ArtworkAction {
    /// List artworks
    List {
        /// Only approved (true) or pending (false) artworks
        #[arg(long)]
        approved: Option<bool>,
    },
    /// Show one artwork
    Show { sk: Uuid },
    /// Approve a submission
    Approve {
        sk: Uuid,

        /// Withdraw approval instead
        #[arg(long)]
        reject: bool,
    },
    /// Delete an artwork, releasing any votes it holds
    Delete { sk: Uuid },
}

fn main() {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server);

    let result = match cli.command {
        Commands::Artworks { action } => handle_artworks(&client, action),
        Commands::Vote {
            artwork_sk,
            user_sk,
        } => handle_vote(&client, user_sk, artwork_sk),
        Commands::Totals => handle_totals(&client),
        Commands::Audit => handle_audit(&client),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn handle_artworks(client: &ApiClient, action: ArtworkAction) -> anyhow::Result<()> {
    match action {
        ArtworkAction::List { approved } => {
            let artworks = client.list_artworks(approved)?;
            if artworks.is_empty() {
                println!("{}", "No artworks found".dimmed());
                return Ok(());
            }
            for artwork in &artworks {
                println!("{}", summary_line(artwork));
            }
            println!();
            println!("{} artwork(s)", artworks.len());
            Ok(())
        }
        ArtworkAction::Show { sk } => {
            let artwork = client.get_artwork(sk)?;
            println!("{}", summary_line(&artwork));
            println!("  Artist:      {} ({})", artwork.f_name, artwork.age);
            println!("  Location:    {}", artwork.location);
            println!("  Description: {}", artwork.description);
            println!("  AI assisted: {}", if artwork.is_ai_gen { "yes" } else { "no" });
            Ok(())
        }
        ArtworkAction::Approve { sk, reject } => {
            let artwork = client.approve_artwork(sk, !reject)?;
            let verdict = if artwork.is_approved {
                "approved".green()
            } else {
                "not approved".yellow()
            };
            println!("{} Artwork {} is now {}", "✓".green().bold(), sk, verdict);
            Ok(())
        }
        ArtworkAction::Delete { sk } => {
            let response = client.delete_artwork(sk)?;
            println!("{} {}", "✓".green().bold(), response.message);
            if response.released_votes > 0 {
                println!(
                    "  {} voter(s) released and may vote again",
                    response.released_votes.to_string().yellow()
                );
            }
            Ok(())
        }
    }
}

fn handle_vote(client: &ApiClient, user_sk: Uuid, artwork_sk: Uuid) -> anyhow::Result<()> {
    let response = client.vote(user_sk, artwork_sk)?;
    println!("{} {}", "✓".green().bold(), response.message);
    Ok(())
}

fn handle_totals(client: &ApiClient) -> anyhow::Result<()> {
    let total = client.total_votes()?;
    println!("Total votes: {}", total.to_string().bold());
    Ok(())
}

fn handle_audit(client: &ApiClient) -> anyhow::Result<()> {
    let audit = client.audit()?;

    if audit.consistent {
        println!("{} {}", "✓".green().bold(), "Tally is consistent".green());
    } else {
        println!("{} {}", "✗".red().bold(), "Tally is inconsistent".red());
    }
    println!();
    println!("  Total votes:      {}", audit.total_votes);
    println!("  Active voters:    {}", audit.active_voters);
    println!("  Dangling votes:   {}", audit.dangling_votes);
    println!("  Drifted artworks: {}", audit.drifted_artworks);

    if !audit.consistent {
        anyhow::bail!("vote tally failed audit");
    }
    Ok(())
}

/// One-line listing: status marker, id, sport and vote count.
fn summary_line(artwork: &Artwork) -> String {
    let status = if artwork.is_approved {
        "approved".green()
    } else {
        "pending".yellow()
    };
    format!(
        "{}  {:<8}  {:<20}  {} vote(s)",
        artwork.sk, status, artwork.sport, artwork.votes
    )
}
