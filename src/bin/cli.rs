use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use custom_league::api::openfootball_api::{matchday, OpenFootballClient};
use custom_league::config::LeagueConfig;
use custom_league::data::save_standings_to_csv;
use custom_league::{
    fetch_laliga_data, init_logging, open_ledger, DirectSubmission, EventKind, MatchEvent,
    PairedSubmission, TeamId, DEFAULT_UPCOMING_LIMIT,
};

#[derive(Parser)]
#[command(name = "cli", about = "Custom league standings and La Liga table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    League(LeagueCommand),
    /// La Liga table and fixtures from the openfootball feed
    Laliga {
        #[arg(long, default_value_t = DEFAULT_UPCOMING_LIMIT)]
        upcoming: usize,
        #[arg(long)]
        matchday: Option<u32>,
    },
}

#[derive(Subcommand)]
enum LeagueCommand {
    /// Print the current table
    Standings,
    /// Record a match between two league teams
    AddResult {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long)]
        home_goals: u32,
        #[arg(long)]
        away_goals: u32,
        /// Defaults to the next open round
        #[arg(long)]
        round: Option<u32>,
    },
    /// Award 0, 1 or 3 points to a single team
    AddPoints {
        #[arg(long)]
        team: String,
        #[arg(long)]
        points: u8,
        #[arg(long)]
        goals_for: u32,
        #[arg(long)]
        goals_against: u32,
        #[arg(long)]
        round: Option<u32>,
    },
    /// List recorded results
    Results {
        #[arg(long)]
        round: Option<u32>,
    },
    /// Show the round the next result will go into
    NextRound,
    /// Season summary
    Stats,
    /// Write the current table to a CSV file
    Export {
        #[arg(long, default_value = "standings.csv")]
        output: String,
    },
    /// Clear every result and zero the table
    Reset {
        /// Required, the reset cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

fn format_event(event: &MatchEvent) -> String {
    match &event.kind {
        EventKind::Paired {
            home_team,
            away_team,
            home_goals,
            away_goals,
        } => format!(
            "#{} R{} | {} {} - {} {}",
            event.id, event.round, home_team, home_goals, away_goals, away_team
        ),
        EventKind::Direct {
            team,
            points_awarded,
            goals_for,
            goals_against,
        } => format!(
            "#{} R{} | {} +{} pts ({}-{})",
            event.id, event.round, team, points_awarded, goals_for, goals_against
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = LeagueConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::League(command) => league(&config, command),
        Command::Laliga { upcoming, matchday } => laliga(&config, upcoming, matchday).await,
    }
}

fn league(config: &LeagueConfig, command: LeagueCommand) -> Result<()> {
    let ledger = open_ledger(config)?;

    match command {
        LeagueCommand::Standings => {
            println!("CUSTOM LEAGUE STANDINGS\n");
            for row in ledger.current_standings() {
                println!("{}", row.format());
            }
        }
        LeagueCommand::AddResult {
            home,
            away,
            home_goals,
            away_goals,
            round,
        } => {
            let submission = PairedSubmission {
                home_team: TeamId::new(home),
                away_team: TeamId::new(away),
                home_goals,
                away_goals,
                round: round.unwrap_or_else(|| ledger.next_round()),
            };
            let event = ledger.submit_paired(&submission)?;
            println!("Recorded {}", format_event(&event));
        }
        LeagueCommand::AddPoints {
            team,
            points,
            goals_for,
            goals_against,
            round,
        } => {
            let submission = DirectSubmission {
                team: TeamId::new(team),
                points,
                goals_for,
                goals_against,
                round: round.unwrap_or_else(|| ledger.next_round()),
            };
            let event = ledger.submit_direct(&submission)?;
            println!("Recorded {}", format_event(&event));
        }
        LeagueCommand::Results { round } => {
            let results = match round {
                Some(round) => ledger.results_for_round(round),
                None => ledger.all_results(),
            };
            if results.is_empty() {
                println!("No results recorded.");
            }
            for event in &results {
                println!("{}", format_event(event));
            }
        }
        LeagueCommand::NextRound => println!("{}", ledger.next_round()),
        LeagueCommand::Stats => {
            let stats = ledger.stats();
            println!("Matches: {}", stats.total_matches);
            println!("Rounds played: {}", stats.rounds_played);
            println!("Next round: {}", stats.next_round);
            println!("Total goals: {}\n", stats.total_goals);
            for row in &stats.standings {
                println!("{}", row.format());
            }
        }
        LeagueCommand::Export { output } => {
            save_standings_to_csv(&ledger.current_standings(), &output)
                .with_context(|| format!("Failed to write {}", output))?;
            println!("Saved standings to {}", output);
        }
        LeagueCommand::Reset { yes } => {
            if !yes {
                bail!("refusing to reset the season without --yes");
            }
            ledger.reset_season()?;
            println!("Season reset.");
        }
    }

    Ok(())
}

async fn laliga(config: &LeagueConfig, upcoming: usize, day: Option<u32>) -> Result<()> {
    if let Some(day) = day {
        let client = OpenFootballClient::new(config.laliga_feed_url.clone())
            .context("Failed to build HTTP client")?;
        let matches = client
            .fetch_matches()
            .await
            .context("Failed to fetch La Liga matches")?;
        println!("MATCHDAY {}\n", day);
        for m in matchday(&matches, day) {
            match m.full_time() {
                Some((home, away)) => println!("{} {} - {} {}", m.team1, home, away, m.team2),
                None => println!("{} {} vs {}", m.date, m.team1, m.team2),
            }
        }
        return Ok(());
    }

    let data = fetch_laliga_data(&config.laliga_feed_url, upcoming).await?;
    println!("LA LIGA STANDINGS\n");
    for row in &data.standings {
        println!("{}", row.format());
    }
    println!("\nUPCOMING MATCHES\n");
    for m in &data.upcoming {
        println!(
            "{} {} | {} vs {}",
            m.date,
            m.time.as_deref().unwrap_or("--:--"),
            m.team1,
            m.team2
        );
    }
    Ok(())
}
