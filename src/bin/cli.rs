use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};

use flashcard_forge::client::{ApiClient, ClientError};
use flashcard_forge::review::{ReviewError, ReviewSession};

const TOKEN_FILE: &str = ".flashcards_token";

#[derive(Parser)]
#[command(name = "flashcards-cli")]
#[command(about = "CLI for the flashcard generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:11111")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Generate cards once and print them (the batch is stored server-side)
    Generate {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        prompt: String,
    },
    /// List kept cards for a subject
    Saved {
        #[arg(short, long)]
        subject: String,
    },
    /// Interactive generate / keep / discard loop for a subject
    Review {
        #[arg(short, long)]
        subject: String,
    },
    Logout,
}

fn authorized_client(url: &str) -> ApiClient {
    let client = ApiClient::new(url);
    match fs::read_to_string(TOKEN_FILE) {
        Ok(token) => client.with_token(token.trim()),
        Err(_) => client,
    }
}

fn print_cards(title: &str, cards: &[String]) {
    println!("{title} ({}):", cards.len());
    for card in cards {
        println!("  {card}");
    }
}

fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

async fn review(client: ApiClient, subject: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ReviewSession::new(client, subject);
    session.mount().await?;
    print_cards("Saved flashcards", session.saved());

    loop {
        let Some(prompt) = read_line("\nPrompt (empty line to quit): ")? else {
            break;
        };
        if prompt.is_empty() {
            break;
        }

        println!("Generating...");
        if let Err(e) = session.generate(&prompt).await {
            println!("Generation failed: {e}");
            continue;
        }

        while let Some(card) = session.generated().first().cloned() {
            println!("\n{}", card.text);
            let answer = read_line("[k]eep / [d]iscard / [q]uit review: ")?;
            match answer.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("k") | Some("keep") => {
                    if let Err(e) = session.keep(card.id).await {
                        println!("Save failed: {e}");
                    }
                }
                Some("d") | Some("discard") => {
                    session.discard(card.id)?;
                }
                Some("q") | Some("quit") | None => break,
                Some(_) => println!("Please answer k, d or q."),
            }
        }

        print_cards("Saved flashcards", session.saved());
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Register { username, password } => {
            ApiClient::new(&cli.url).register(&username, &password).await?;
            println!("Registered {username}. Log in to get a token.");
            Ok(())
        }
        Commands::Login { username, password } => {
            match ApiClient::new(&cli.url).login(&username, &password).await {
                Ok(token) => {
                    fs::write(TOKEN_FILE, token)?;
                    println!("Logged in. Token saved to {TOKEN_FILE}");
                }
                Err(e) => println!("Login failed: {}", e.to_json()),
            }
            Ok(())
        }
        Commands::Generate { subject, prompt } => {
            let cards = authorized_client(&cli.url)
                .generate_flashcards(&prompt, &subject)
                .await?;
            print_cards("Generated flashcards", &cards);
            Ok(())
        }
        Commands::Saved { subject } => {
            let cards = authorized_client(&cli.url).saved_flashcards(&subject).await?;
            print_cards("Saved flashcards", &cards);
            Ok(())
        }
        Commands::Review { subject } => review(authorized_client(&cli.url), subject).await,
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
            Ok(())
        }
    }
}

fn is_unauthorized(error: &(dyn std::error::Error + 'static)) -> bool {
    let client_error = match error.downcast_ref::<ReviewError>() {
        Some(ReviewError::Backend(inner)) => Some(inner),
        _ => error.downcast_ref::<ClientError>(),
    };
    matches!(client_error, Some(ClientError::Status { status: 401, .. }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let result = run(Cli::parse()).await;
    if let Err(e) = &result {
        if is_unauthorized(e.as_ref()) {
            eprintln!("Not logged in or token expired; run `flashcards-cli login` first.");
        }
    }
    result
}
