//! Interactive chat client - entry point
//!
//! Connects to the relay, registers with a name read from stdin, then runs
//! two tasks: a perpetual listen loop printing incoming envelopes, and a
//! stdin read-eval loop sending each non-empty line. The literal line
//! `quit` unregisters and exits.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use chat_relay::{AppError, EnvelopeKind, RelayClient, DEFAULT_ADDR};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let client = match RelayClient::connect(&addr).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error connecting to server: {}", e);
            return Ok(());
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("Enter your name: ");
    io::stdout().flush()?;
    let name = match lines.next_line().await? {
        Some(line) => line.trim().to_string(),
        None => return Ok(()),
    };

    let client_id = client.register(&name).await?;
    println!("Connected as {}\n", client_id);

    // Listen loop: perpetual long-poll, one envelope per call. Ends on the
    // first terminal error (unregistered, mailbox closed, or connection
    // failure - all treated as a clean disconnect).
    let listen_client = Arc::new(client);
    let listen_task = {
        let client = Arc::clone(&listen_client);
        let client_id = client_id.clone();
        tokio::spawn(async move {
            loop {
                match client.listen(&client_id).await {
                    Ok(envelope) => match envelope.kind {
                        EnvelopeKind::Join | EnvelopeKind::Leave => {
                            print!("\n[System] {}\n> ", envelope.text);
                            let _ = io::stdout().flush();
                        }
                        EnvelopeKind::Message => {
                            print!("\n{}: {}\n> ", envelope.sender_name, envelope.text);
                            let _ = io::stdout().flush();
                        }
                    },
                    Err(e) => {
                        if !e.is_terminal() {
                            eprintln!("listen failed: {}", e);
                        }
                        return;
                    }
                }
            }
        })
    };

    // Send loop: one message per non-empty stdin line.
    let client = listen_client;
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            // stdin EOF behaves like quit: unregistering closes the
            // mailbox, which unblocks the listen loop below.
            let _ = client.unregister(&client_id).await;
            break;
        };
        let text = line.trim();

        if text == "quit" {
            if let Err(e) = client.unregister(&client_id).await {
                if !matches!(e, AppError::ChannelSend) {
                    eprintln!("unregister failed: {}", e);
                }
            }
            break;
        }

        if !text.is_empty() {
            if let Err(e) = client.send_message(&client_id, &name, text).await {
                eprintln!("send failed: {}", e);
                break;
            }
        }
    }

    // Unregistering closed the mailbox, which ends the listen loop.
    let _ = listen_task.await;
    println!("\nDisconnected from chat.");
    Ok(())
}
