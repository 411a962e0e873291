use clap::Parser;

use rlcmac_block::{BlockDecoder, CodingScheme, FramingHints, Target};
use rlcmac_config::{DecoderConfig, toml_config};
use rlcmac_core::{BitString, Direction, debug};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "RLC/MAC Block Decoder",
    long_about = "Decodes one captured RLC/MAC radio block: framing, header or control message, data blocks and PDU segments"
)]
struct Args {
    /// Direction: uplink or downlink
    #[arg(
        help = "Direction: [ ul | dl ]"
    )]
    direction: String,

    /// Captured block
    #[arg(
        help = "Captured block as hex octets, or as a bitstring with --bits"
    )]
    block: String,

    #[arg(
        short = 'b',
        long = "bits",
        help = "Interpret the block as a bitstring of 0 and 1 characters"
    )]
    bits: bool,

    #[arg(
        short = 'c',
        long = "coding",
        help = "Known coding scheme, overriding the length lookup: [ cs1..cs4 | mcs1..mcs9 ]"
    )]
    coding: Option<String>,

    #[arg(
        short = 't',
        long = "target",
        default_value = "all",
        help = "Part of the block to decode: [ all | header | data1 | data2 ]"
    )]
    target: String,

    #[arg(
        long = "config",
        help = "TOML configuration file"
    )]
    config: Option<String>,

    #[arg(
        short = 'j',
        long = "json",
        help = "Print the report as JSON"
    )]
    json: bool,
}

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> DecoderConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

fn parse_block(input: &str, as_bits: bool) -> Result<Vec<u8>, String> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    if as_bits {
        if cleaned.len() % 8 != 0 {
            return Err(format!("bitstring of {} bits is not a whole number of octets", cleaned.len()));
        }
        let bits = BitString::parse_bitstr(&cleaned).ok_or("bitstring may only contain 0 and 1")?;
        Ok(bits.as_bytes().to_vec())
    } else {
        let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
        hex::decode(cleaned).map_err(|e| format!("invalid hex: {}", e))
    }
}

fn main() {
    let args = Args::parse();

    let cfg = match args.config {
        Some(ref path) => load_config_from_toml(path),
        None => DecoderConfig::default(),
    };
    let _log_guard = debug::setup_logging_default(cfg.debug_log.clone());

    let Some(direction) = Direction::from_name(&args.direction) else {
        eprintln!("Error: Unsupported direction '{}'. Use: ul, dl", args.direction);
        std::process::exit(1);
    };

    let coding = match args.coding.as_deref().map(CodingScheme::from_name) {
        None => None,
        Some(Some(cs)) => Some(cs),
        Some(None) => {
            eprintln!("Error: Unsupported coding scheme '{}'. Use: cs1..cs4, mcs1..mcs9", args.coding.unwrap_or_default());
            std::process::exit(1);
        }
    };

    let Some(target) = Target::from_name(&args.target) else {
        eprintln!("Error: Unsupported target '{}'. Use: all, header, data1, data2", args.target);
        std::process::exit(1);
    };

    let block = match parse_block(&args.block, args.bits) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("{} octets {} block", block.len(), direction);

    let decoder = BlockDecoder::new(&cfg);
    let report = decoder.decode(&block, direction, &FramingHints { coding, target });

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_block() {
        assert_eq!(parse_block("0x47 94:2b", false), Ok(vec![0x47, 0x94, 0x2B]));
        assert!(parse_block("4", false).is_err());
    }

    #[test]
    fn test_parse_bit_block() {
        assert_eq!(parse_block("01000111 10010100", true), Ok(vec![0x47, 0x94]));
        assert!(parse_block("0100", true).is_err());
        assert!(parse_block("0100011x", true).is_err());
    }
}
