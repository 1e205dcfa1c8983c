//! A terminal chess client for a room-scoped relay.
//!
//! The client joins a room on the relay, waits for its color and then
//! plays moves typed at the prompt against whoever else joined the room.

use anyhow::{Context, Result};
use pico_args::Arguments;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use rc_client::{
    commands::{self, Command, parse_command},
    config::ClientConfig,
    display, logging,
    websocket_client::WebSocketConnector,
};
use relay_chess::{Client, Outcome, StandardRules, relay::RelayChannel};

const HELP: &str = "\
Play chess against another client in a relay room

USAGE:
  rc_client [OPTIONS]

OPTIONS:
  --relay URL           Relay WebSocket URL  [default: ws://127.0.0.1:4000/relay]
  --room ID             Room to join (or set ROOM_ID)

FLAGS:
  -h, --help            Print help information

Settings can also come from RELAY_URL and ROOM_ID in the environment or a
.env file.
";

struct Args {
    relay_url: Option<String>,
    room_id: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        relay_url: pargs.opt_value_from_str("--relay")?,
        room_id: pargs.opt_value_from_str("--room")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {remaining:?}");
    }

    dotenvy::dotenv().ok();
    logging::init();

    let config = ClientConfig::from_env(args.relay_url, args.room_id)?;
    run(config).await
}

async fn run(config: ClientConfig) -> Result<()> {
    let connector = WebSocketConnector::new(config.relay_url.clone());
    let client = Client::attach(
        &connector,
        config.room_id.clone(),
        Box::new(StandardRules::new()),
    )
    .await
    .with_context(|| format!("Failed to join room {}", config.room_id))?;

    print!("{}", display::render(&client.view()));
    println!("Type 'help' for commands.");

    let lines = BufReader::new(tokio::io::stdin()).lines();
    session(client, lines, shutdown_signal()).await
}

/// Plays until the user quits, the relay closes or `shutdown` fires, then
/// releases the subscription whichever way play ended.
async fn session<C, R>(
    mut client: Client<C>,
    mut lines: Lines<R>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    C: RelayChannel,
    R: AsyncBufRead + Unpin,
{
    let result = play(&mut client, &mut lines, shutdown).await;

    let room_id = client.room_id().clone();
    if let Err(e) = client.detach().await {
        tracing::warn!("Failed to close relay connection: {}", e);
    }
    println!("\nLeft room {room_id}.");
    result
}

/// Ctrl-C ends the session like 'quit'.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn play<C, R>(
    client: &mut Client<C>,
    lines: &mut Lines<R>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    C: RelayChannel,
    R: AsyncBufRead + Unpin,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => return Ok(()),
            received = client.recv() => {
                let Some((event, outcome)) = received? else {
                    println!("Relay closed the room.");
                    return Ok(());
                };
                logging::log_relay_event(client.room_id(), &event);
                if let Outcome::Ignored(rejection) = &outcome {
                    logging::log_rejection(client.room_id(), rejection);
                }
                print!("{}", display::render(&client.view()));
            }
            line = lines.next_line() => {
                // EOF on stdin leaves the room like 'quit'.
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => return Ok(()),
                    Ok(command) => handle_command(client, command).await?,
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }
}

async fn handle_command<C: RelayChannel>(client: &mut Client<C>, command: Command) -> Result<()> {
    let outcome = match command {
        Command::Move {
            origin,
            destination,
        } => client.make_move(origin, destination).await?,
        Command::PlayAgain => client.play_again().await?,
        Command::Board => {
            print!("{}", display::render(&client.view()));
            return Ok(());
        }
        Command::Moves => {
            let mut moves: Vec<String> = client
                .legal_moves()
                .iter()
                .map(|mv| format!("{}{}", mv.origin, mv.destination))
                .collect();
            moves.dedup();
            println!("{}", moves.join(" "));
            return Ok(());
        }
        Command::Help => {
            println!("{}", commands::HELP);
            return Ok(());
        }
        Command::Quit => return Ok(()),
    };

    match outcome {
        Outcome::Ignored(rejection) => logging::log_rejection(client.room_id(), &rejection),
        Outcome::Applied | Outcome::Publish(_) => {
            print!("{}", display::render(&client.view()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_chess::{
        Phase, RoomId,
        loopback::{LoopbackChannel, LoopbackRelay},
    };
    use tokio::io::{AsyncWriteExt, DuplexStream};

    async fn attach(relay: &LoopbackRelay, room: &str) -> Client<LoopbackChannel> {
        Client::attach(relay, RoomId::new(room), Box::new(StandardRules::new()))
            .await
            .unwrap()
    }

    fn input(script: &str) -> Lines<BufReader<&[u8]>> {
        BufReader::new(script.as_bytes()).lines()
    }

    #[tokio::test]
    async fn test_shutdown_signal_detaches() {
        let relay = LoopbackRelay::new();
        let room = RoomId::new("room");
        let client = attach(&relay, "room").await;

        // Stdin stays open so only the shutdown future can end the session.
        let (_keep_open, stdin): (DuplexStream, DuplexStream) = tokio::io::duplex(64);
        let lines = BufReader::new(stdin).lines();
        session(client, lines, std::future::ready(())).await.unwrap();

        assert_eq!(relay.subscriber_count(&room), 0);
    }

    #[tokio::test]
    async fn test_quit_detaches() {
        let relay = LoopbackRelay::new();
        let room = RoomId::new("room");
        let client = attach(&relay, "room").await;

        session(client, input("help\nquit\n"), std::future::pending())
            .await
            .unwrap();

        assert_eq!(relay.subscriber_count(&room), 0);
    }

    #[tokio::test]
    async fn test_typed_move_reaches_peer() {
        let relay = LoopbackRelay::new();
        let mut white = attach(&relay, "room").await;
        let mut black = attach(&relay, "room").await;
        white.recv().await.unwrap();
        black.recv().await.unwrap();

        let (mut typing, stdin) = tokio::io::duplex(64);
        typing.write_all(b"e2e4\n").await.unwrap();
        drop(typing);
        session(white, BufReader::new(stdin).lines(), std::future::pending())
            .await
            .unwrap();

        black.recv().await.unwrap();
        assert_eq!(black.view().phase, Phase::Active);
        assert_eq!(black.view().side_to_move, relay_chess::Color::Black);
    }
}
