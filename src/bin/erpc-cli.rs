use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use erpc::procedure::{encode_query, ENCODED_QUERY_FIELD};
use erpc::ws::Frame;

#[derive(Parser)]
#[command(name = "erpc-cli")]
#[command(about = "Call erpc procedures and socket events", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:2000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a request/response procedure
    Call {
        /// HTTP method (get, post, put, patch, delete)
        method: String,
        /// Route path, e.g. /user/42/msg/7
        path: String,
        /// JSON body
        #[arg(short, long)]
        body: Option<String>,
        /// Structured JSON query, sent as an encoded query blob
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Open a socket, send one event and print replies
    Ws {
        /// Socket route path, e.g. /gateway
        path: String,
        /// Event name
        event: String,
        /// JSON event data
        #[arg(short, long, default_value = "null")]
        data: String,
        /// Replies to wait for before closing
        #[arg(short, long, default_value_t = 1)]
        replies: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Call {
            method,
            path,
            body,
            query,
        } => {
            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut url = reqwest::Url::parse(&cli.url)?.join(&path)?;
            if let Some(query) = query {
                let query: Value = serde_json::from_str(&query)?;
                url.query_pairs_mut()
                    .append_pair(ENCODED_QUERY_FIELD, &encode_query(&query)?);
            }

            let mut request = reqwest::Client::new().request(method, url);
            if let Some(body) = body {
                let body: Value = serde_json::from_str(&body)?;
                request = request.json(&body);
            }
            print_response(request.send().await?).await?;
        }
        Commands::Ws {
            path,
            event,
            data,
            replies,
        } => {
            let mut url = reqwest::Url::parse(&cli.url)?.join(&path)?;
            let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
            url.set_scheme(scheme)
                .map_err(|_| format!("cannot use {scheme} with {url}"))?;

            let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
            let data: Value = serde_json::from_str(&data)?;
            let frame = Frame::new(event, data)?.to_text()?;
            socket.send(Message::Text(frame.into())).await?;

            let mut seen = 0;
            while seen < replies {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        println!("{}", pretty(text.as_str()));
                        seen += 1;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            socket.close(None).await?;
        }
    }

    Ok(())
}

fn pretty(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| text.to_string())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    println!("{}", pretty(&text));
    Ok(())
}
