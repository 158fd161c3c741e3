use std::io::Write;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use scopone_core::{ClientMessage, JoinMode, PlayPayload, PlayerId, ServerMessage};

/// Line-command client for the Scopone server. Prints every server message.
#[derive(Parser, Debug)]
#[command(name = "scopone-client", version)]
struct Cli {
    /// Server address
    #[arg(default_value = "127.0.0.1:12345")]
    addr: String,
}

fn print_help() {
    println!("--- Scopone client ---");
    println!("Commands:");
    println!("  join <name>        - take a seat (or spectate if the table is full)");
    println!("  watch [name]       - join as spectator");
    println!("  name <name>        - rename while in the lobby");
    println!("  play <index>       - play the card at <index> in your hand (0-based)");
    println!("  ready              - ready for the next round");
    println!("  exit               - quit");
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Turns one input line into a message. `Err` carries a usage hint.
fn parse_command(line: &str, me: Option<PlayerId>) -> Result<Option<ClientMessage>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let need_id = || me.ok_or_else(|| "join as a player first".to_string());
    match parts.first().copied() {
        None => Ok(None),
        Some("join") => Ok(Some(ClientMessage::Join {
            nick: parts.get(1).unwrap_or(&"").to_string(),
            mode: JoinMode::Player,
        })),
        Some("watch") => Ok(Some(ClientMessage::Join {
            nick: parts.get(1).unwrap_or(&"Spectator").to_string(),
            mode: JoinMode::Spectator,
        })),
        Some("name") => match parts.get(1) {
            Some(nick) => Ok(Some(ClientMessage::SetName { nick: nick.to_string() })),
            None => Err("usage: name <name>".to_string()),
        },
        Some("play") => {
            let card_index = parts
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| "usage: play <index>".to_string())?;
            Ok(Some(ClientMessage::Play {
                payload: PlayPayload { player_id: need_id()?, card_index },
            }))
        }
        Some("ready") => Ok(Some(ClientMessage::RoundReady { player_id: need_id()? })),
        Some(other) => Err(format!("unknown command: {}", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    println!("Connecting to {}", cli.addr);
    let stream = TcpStream::connect(&cli.addr).await?;
    println!("Connected!");
    let mut framed = Framed::new(stream, LinesCodec::new());

    print_help();
    prompt();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut me: Option<PlayerId> = None;

    loop {
        tokio::select! {
            line = framed.next() => {
                let Some(line) = line else {
                    println!("\nServer closed the connection.");
                    break;
                };
                match serde_json::from_str::<ServerMessage>(&line?) {
                    Ok(msg) => {
                        if let ServerMessage::Welcome { payload } = &msg {
                            me = payload.id;
                        }
                        println!("\n<-- {:#?}\n", msg);
                        prompt();
                    }
                    Err(e) => eprintln!("Failed to decode server message: {}", e),
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == "exit" {
                    println!("Disconnecting...");
                    break;
                }
                match parse_command(&line, me) {
                    Ok(Some(msg)) => framed.send(serde_json::to_string(&msg)?).await?,
                    Ok(None) => {}
                    Err(hint) => println!("{}", hint),
                }
                prompt();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("join Ann", None),
            Ok(Some(ClientMessage::Join { nick: "Ann".into(), mode: JoinMode::Player }))
        );
        assert_eq!(
            parse_command("play 3", Some(2)),
            Ok(Some(ClientMessage::Play { payload: PlayPayload { player_id: 2, card_index: 3 } }))
        );
        assert_eq!(parse_command("ready", Some(4)), Ok(Some(ClientMessage::RoundReady { player_id: 4 })));
        assert_eq!(parse_command("   ", None), Ok(None));
        assert!(parse_command("play 3", None).is_err());
        assert!(parse_command("play x", Some(1)).is_err());
        assert!(parse_command("bid 3", Some(1)).is_err());
    }
}
