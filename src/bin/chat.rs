//! Terminal chat client for a running MediGenius server
//!
//! Talks to the HTTP API at `MEDIGENIUS_URL` (default `http://localhost:8000`).
//! `reset` clears the conversation, `exit` clears it and quits.

use serde::Deserialize;
use serde_json::json;
use std::io::{self, BufRead, Write};

const DEFAULT_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    response: String,
    source: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

struct Client {
    base: String,
    session_id: String,
}

impl Client {
    fn connect(base: String) -> Result<Self, Box<dyn std::error::Error>> {
        let created: CreateSessionResponse = ureq::post(&format!("{base}/api/sessions"))
            .call()?
            .into_json()?;
        Ok(Self {
            base,
            session_id: created.session_id,
        })
    }

    fn ask(&self, question: &str) -> Result<AskResponse, Box<dyn std::error::Error>> {
        let url = format!("{}/api/sessions/{}/ask", self.base, self.session_id);
        match ureq::post(&url).send_json(json!({ "question": question })) {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<ErrorResponse>()
                    .map_or_else(|_| format!("HTTP {code}"), |e| e.error);
                Err(message.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reset(&self) -> Result<(), Box<dyn std::error::Error>> {
        let url = format!("{}/api/sessions/{}/reset", self.base, self.session_id);
        ureq::post(&url).call()?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let base = std::env::var("MEDIGENIUS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let base = base.trim_end_matches('/').to_string();

    let client = Client::connect(base)?;
    println!("=== MediGenius Consultation ===");
    println!("Type your question, 'reset' to start over, or 'exit' to quit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nYou: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => {
                client.reset()?;
                println!("=== Consultation Ended ===");
                return Ok(());
            }
            "reset" => {
                client.reset()?;
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        match client.ask(input) {
            Ok(answer) => println!("Doctor [{}]: {}", answer.source, answer.response),
            Err(e) => eprintln!("Request failed: {e}"),
        }
    }

    client.reset()?;
    println!("\n=== Consultation Ended ===");
    Ok(())
}
