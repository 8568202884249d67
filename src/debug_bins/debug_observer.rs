use chrono::Local;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "debug_observer")]
#[command(about = "Connect to a meterlink server as a dashboard observer", long_about = None)]
struct Args {
    /// Observer endpoint
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Stop after this many envelopes (0 = run until closed)
    #[arg(short, long, default_value = "0")]
    count: usize,

    /// JSON message to send after connecting (echoed back by the server)
    #[arg(short, long)]
    send: Option<String>,

    /// Pretty-print envelope payloads
    #[arg(short, long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    println!("Observer Debug Tool\n");
    println!("Connecting to {}...", args.url);

    let (mut stream, _) = timeout(Duration::from_secs(10), connect_async(args.url.as_str()))
        .await
        .map_err(|_| "Connection timed out".to_string())?
        .map_err(|e| format!("Failed to connect: {}", e))?;
    println!("Connected\n{}", "=".repeat(80));

    if let Some(message) = &args.send {
        stream
            .send(Message::Text(message.clone()))
            .await
            .map_err(|e| format!("Failed to send message: {}", e))?;
    }

    let mut received = 0;
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                received += 1;
                print_envelope(&text, args.pretty);
                if args.count > 0 && received >= args.count {
                    break;
                }
            }
            Ok(Message::Ping(_)) => {
                println!("{} heartbeat", Local::now().format("%H:%M:%S"));
            }
            Ok(Message::Close(frame)) => {
                println!("Server closed the connection: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                println!("Stream error: {}", e);
                break;
            }
        }
    }

    let _ = stream.close(None).await;
    println!("{}\nReceived {} envelopes", "=".repeat(80), received);
    Ok(())
}

fn print_envelope(text: &str, pretty: bool) {
    let time = Local::now().format("%H:%M:%S");
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        println!("{} [raw] {}", time, text);
        return;
    };

    let kind = value["type"].as_str().unwrap_or("?");
    let data = if pretty {
        serde_json::to_string_pretty(&value["data"]).unwrap_or_default()
    } else {
        value["data"].to_string()
    };
    println!("{} [{}] {}", time, kind, data);
}
