use std::error;
use std::error::Error;
use std::fmt;
use std::fs;

use clap::{Parser, Subcommand};

use tilecodec::{decode, encode, RawMap};

#[derive(Debug)]
enum CliError {
    Codec(tilecodec::TileCodecError),
    Json(serde_json::Error),
}

impl error::Error for CliError {}
impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec error: {}", e),
            Self::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl From<tilecodec::TileCodecError> for CliError {
    fn from(e: tilecodec::TileCodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

#[derive(Parser)]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Reads a RawMap as JSON and writes the compressed codec bytes.
    Encode(Encode),
    /// Reads compressed codec bytes and writes the RawMap as JSON.
    Decode(Decode),
}

#[derive(Parser)]
struct Encode {
    input: String,
    output: String,
}

#[derive(Parser)]
struct Decode {
    input: String,
    output: String,
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();

    match opts.subcommand {
        SubCommand::Encode(c) => {
            let json = fs::read_to_string(&c.input)?;
            let map: RawMap = serde_json::from_str(&json).map_err(CliError::from)?;
            let bytes = encode(&map).map_err(CliError::from)?;
            fs::write(&c.output, bytes)?;
        }
        SubCommand::Decode(c) => {
            let bytes = fs::read(&c.input)?;
            let map = decode(&bytes).map_err(CliError::from)?;
            let json = serde_json::to_string_pretty(&map).map_err(CliError::from)?;
            fs::write(&c.output, json)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match run() {
        Err(e) => Err(e.to_string().into()),
        Ok(_) => Ok(()),
    }
}
