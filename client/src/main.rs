use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use client::network::{connect, spawn_input_reader, Client, ClientError, Exit};
use client::INVALID_ARGS_EXIT_CODE;
use log::info;
use shared::{ClientCommand, Colour, Opponent};
use std::process;
use tokio::io::BufReader;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Versus {
    Computer,
    Human,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColourArg {
    White,
    Black,
}

/// Terminal client for the chess server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server port to connect to on localhost
    port: String,

    /// Play against the computer or another client
    #[arg(long, value_enum, default_value = "computer")]
    versus: Versus,

    /// Colour to play; white against the computer and either against a
    /// human when not given
    #[arg(long, value_enum)]
    colour: Option<ColourArg>,
}

impl Args {
    fn start_request(&self) -> ClientCommand {
        let colour = self.colour.map(|colour| match colour {
            ColourArg::White => Colour::White,
            ColourArg::Black => Colour::Black,
        });
        match self.versus {
            Versus::Computer => ClientCommand::Start {
                opponent: Opponent::Computer,
                colour: Some(colour.unwrap_or(Colour::White)),
            },
            Versus::Human => ClientCommand::Start {
                opponent: Opponent::Human,
                colour,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(INVALID_ARGS_EXIT_CODE);
        }
    };

    let stream = match connect(&args.port).await {
        Ok(stream) => stream,
        Err(e) => fail(e),
    };
    info!("Connected to port {}", args.port);
    println!("Welcome to the chess client");

    let (reader, writer) = stream.into_split();
    let input = spawn_input_reader(BufReader::new(tokio::io::stdin()));
    let client = Client::new(
        writer,
        tokio::io::stdout(),
        tokio::io::stderr(),
        args.start_request(),
    );

    // Exit explicitly: the stdin reader may still be blocked on a read
    match client.run(BufReader::new(reader), input).await {
        Exit::Quit => process::exit(0),
        Exit::ServerGone => fail(ClientError::ServerGone),
    }
}

fn fail(error: ClientError) -> ! {
    eprintln!("client: {}", error);
    process::exit(error.exit_code())
}
