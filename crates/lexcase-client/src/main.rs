//! lexcase: command-line case diary for advocates.
//!
//! Cases live in a local SQLite database. When `LEXCASE_API_URL` is set and
//! you are signed in, every edit is pushed to the remote directory and
//! startup pulls what other devices wrote.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use lexcase_client_lib::commands::cases::{self, CaseForm};
use lexcase_client_lib::commands::{dashboard, identity, sync};
use lexcase_client_lib::config::ClientConfig;
use lexcase_client_lib::{build_state, init_tracing, lifecycle};
use lexcase_shared::case::parse_date;
use lexcase_shared::{Attachment, CaseId, CasePatch, CaseRecord};

#[derive(Parser)]
#[command(name = "lexcase")]
#[command(author, version, about = "Case and hearing diary with cloud sync")]
#[command(propagate_version = true)]
struct Cli {
    /// Database file (overrides LEXCASE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = day)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all cases, soonest hearing first
    List,

    /// Show one case in full
    Show { id: String },

    /// Add a new case
    Add {
        #[command(flatten)]
        fields: CaseFields,
    },

    /// Change fields of an existing case
    Update {
        id: String,

        #[command(flatten)]
        fields: CaseFields,
    },

    /// Delete a case here and in the cloud
    Delete { id: String },

    /// Attach files to a case
    Attach {
        id: String,

        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },

    /// Roll lapsed hearings forward
    Advance,

    /// Push local changes, then pull
    Sync,

    /// Pull from the cloud without pushing
    Pull,

    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Register a new account
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Case counts and upcoming hearings
    Dashboard,
}

#[derive(clap::Args)]
struct CaseFields {
    #[arg(long)]
    number: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    client: Option<String>,

    #[arg(long)]
    contact: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    court: Option<String>,

    #[arg(long)]
    judge: Option<String>,

    #[arg(long)]
    remarks: Option<String>,

    /// Current hearing (YYYY-MM-DD)
    #[arg(long, value_parser = day)]
    current: Option<NaiveDate>,

    /// Next hearing (YYYY-MM-DD); defaults to current + 30 days
    #[arg(long, value_parser = day)]
    next: Option<NaiveDate>,
}

impl CaseFields {
    fn into_form(self) -> CaseForm {
        CaseForm {
            case_number: self.number.unwrap_or_default(),
            case_title: self.title.unwrap_or_default(),
            client_name: self.client.unwrap_or_default(),
            contact: self.contact.unwrap_or_default(),
            client_email: self.email.unwrap_or_default(),
            court_number: self.court.unwrap_or_default(),
            judge_name: self.judge.unwrap_or_default(),
            remarks: self.remarks.unwrap_or_default(),
            current_date: self.current,
            next_date: self.next,
            files: Vec::new(),
        }
    }

    fn into_patch(self, id: CaseId) -> CasePatch {
        CasePatch {
            case_number: self.number,
            case_title: self.title,
            client_name: self.client,
            contact: self.contact,
            client_email: self.email,
            court_number: self.court,
            judge_name: self.judge,
            remarks: self.remarks,
            current_date: self.current.map(Some),
            next_date: self.next.map(Some),
            ..CasePatch::new(id)
        }
    }
}

fn day(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if cli.db.is_some() {
        config.db_path = cli.db;
    }
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let state = build_state(config).context("failed to open local store")?;
    let advanced = lifecycle::startup(&state, today).await?;

    match cli.command {
        Commands::List => {
            let list = cases::list_cases(&state);
            if list.is_empty() {
                println!("No cases yet.");
            }
            for case in &list {
                println!(
                    "{:<8}  {:<10}  {:<10}  {}  ({})",
                    case.id.short(),
                    fmt_date(case.current_date),
                    fmt_date(case.next_date),
                    case.case_title,
                    case.client_name
                );
            }
        }
        Commands::Show { id } => {
            let case = cases::get_case(&state, &CaseId::from(id))?;
            print_case(&case);
        }
        Commands::Add { fields } => {
            let case = cases::add_case(&state, fields.into_form()).await?;
            println!("Added case {}", case.id);
        }
        Commands::Update { id, fields } => {
            let patch = fields.into_patch(CaseId::from(id));
            if patch.is_empty() {
                anyhow::bail!("nothing to update");
            }
            let case = cases::update_case(&state, patch).await?;
            print_case(&case);
        }
        Commands::Delete { id } => {
            let id = CaseId::from(id);
            cases::delete_case(&state, &id).await?;
            println!("Deleted case {id}");
        }
        Commands::Attach { id, files } => {
            let paths: Vec<&std::path::Path> = files.iter().map(PathBuf::as_path).collect();
            let case = cases::attach_files(&state, &CaseId::from(id), &paths).await?;
            println!(
                "{} file(s) on case, {} waiting for upload",
                case.files.len(),
                case.pending_files()
            );
        }
        Commands::Advance => {
            println!(
                "{} hearing(s) advanced, {} failed",
                advanced.applied, advanced.failed
            );
        }
        Commands::Sync => {
            let summary = sync::sync_now(&state).await?;
            println!(
                "Pushed {} case(s) ({} failed), uploaded {} file(s) ({} deferred); fetched {}, {} new",
                summary.pushed,
                summary.push_failed,
                summary.files_uploaded,
                summary.files_dropped,
                summary.fetched,
                summary.added
            );
        }
        Commands::Pull => {
            let report = sync::pull_now(&state).await?;
            println!(
                "Fetched {}: {} new, {} updated, {} local-only kept",
                report.fetched, report.added, report.overwritten, report.preserved
            );
        }
        Commands::Login { email, password } => {
            let account = identity::sign_in(&state, &email, &password).await?;
            println!("Signed in as {account}");
        }
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let account = identity::sign_up(&state, &name, &email, &password).await?;
            if state.current_account().is_some() {
                println!("Registered and signed in as {account}");
            } else {
                println!("Registered {account}; run `lexcase login` to sign in");
            }
        }
        Commands::Logout => {
            identity::sign_out(&state).await?;
            println!("Signed out");
        }
        Commands::Dashboard => {
            let board = dashboard::dashboard(&state, today);
            match state.current_account() {
                Some(account) => println!("Signed in as {account}"),
                None => println!("Not signed in"),
            }
            println!("Total cases:        {}", board.total_cases);
            println!("Upcoming hearings:  {}", board.upcoming);
            if board.pending_files > 0 {
                println!("Files to upload:    {}", board.pending_files);
            }
            for hearing in &board.next_hearings {
                println!(
                    "  {}  {}  ({})",
                    hearing.date, hearing.case_title, hearing.client_name
                );
            }
        }
    }

    Ok(())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

fn print_case(case: &CaseRecord) {
    println!("Id:            {}", case.id);
    println!("Case number:   {}", case.case_number);
    println!("Title:         {}", case.case_title);
    println!("Client:        {}", case.client_name);
    println!("Contact:       {}", case.contact);
    println!("Client email:  {}", case.client_email);
    println!("Court:         {}", case.court_number);
    println!("Judge:         {}", case.judge_name);
    println!("Hearing:       {}", fmt_date(case.current_date));
    println!("Next hearing:  {}", fmt_date(case.next_date));
    println!("Remarks:       {}", case.remarks);
    for file in &case.files {
        match file {
            Attachment::Pending { name, .. } => println!("File:          {name} (not uploaded)"),
            Attachment::Relayed { name, url } => println!("File:          {name} <{url}>"),
        }
    }
}
