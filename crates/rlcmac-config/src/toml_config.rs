use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::decoder_config::{CfgDecoder, CfgFraming, DecoderConfig};

pub const EXPECTED_CONFIG_VERSION: &str = "0.1";

/// Build `DecoderConfig` from a TOML configuration document
pub fn from_toml_str(toml_str: &str) -> Result<DecoderConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    if !root.config_version.eq(EXPECTED_CONFIG_VERSION) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, EXPECTED_CONFIG_VERSION
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref dec) = root.decoder {
        if !dec.extra.is_empty() {
            return Err(format!("Unrecognized fields in decoder: {:?}", sorted_keys(&dec.extra)).into());
        }
    }
    if let Some(ref fr) = root.framing {
        if !fr.extra.is_empty() {
            return Err(format!("Unrecognized fields in framing: {:?}", sorted_keys(&fr.extra)).into());
        }
    }

    // Build config from defaults and optional values
    let mut cfg = DecoderConfig {
        debug_log: root.debug_log,
        ..Default::default()
    };

    if let Some(dec) = root.decoder {
        apply_decoder_patch(&mut cfg.decoder, dec);
    }
    if let Some(fr) = root.framing {
        apply_framing_patch(&mut cfg.framing, fr);
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Build `DecoderConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<DecoderConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `DecoderConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DecoderConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_decoder_patch(dst: &mut CfgDecoder, src: DecoderDto) {
    if let Some(v) = src.max_depth {
        dst.max_depth = v;
    }
    if let Some(v) = src.max_array_elements {
        dst.max_array_elements = v;
    }
}

fn apply_framing_patch(dst: &mut CfgFraming, src: FramingDto) {
    if let Some(v) = src.decode_data_blocks {
        dst.decode_data_blocks = v;
    }
    if let Some(v) = src.accept_access_bursts {
        dst.accept_access_bursts = v;
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    decoder: Option<DecoderDto>,

    #[serde(default)]
    framing: Option<FramingDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct DecoderDto {
    pub max_depth: Option<usize>,
    pub max_array_elements: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct FramingDto {
    pub decode_data_blocks: Option<bool>,
    pub accept_access_bursts: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}


#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
config_version = "0.1"
debug_log = "/tmp/rlcmac.log"

[decoder]
max_depth = 8
max_array_elements = 40

[framing]
decode_data_blocks = false
accept_access_bursts = false
"#;

    #[test]
    fn test_full_config() {
        let cfg = from_toml_str(FULL).unwrap();
        assert_eq!(cfg.debug_log.as_deref(), Some("/tmp/rlcmac.log"));
        assert_eq!(cfg.decoder.max_depth, 8);
        assert_eq!(cfg.decoder.max_array_elements, 40);
        assert!(!cfg.framing.decode_data_blocks);
        assert!(!cfg.framing.accept_access_bursts);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = from_toml_str("config_version = \"0.1\"\n").unwrap();
        assert_eq!(cfg, DecoderConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg = from_toml_str("config_version = \"0.1\"\n[decoder]\nmax_depth = 4\n").unwrap();
        assert_eq!(cfg.decoder.max_depth, 4);
        assert_eq!(cfg.decoder.max_array_elements, CfgDecoder::default().max_array_elements);
    }

    #[test]
    fn test_wrong_version() {
        let err = from_toml_str("config_version = \"0.5\"\n").unwrap_err();
        assert!(err.to_string().contains("config_version"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = from_toml_str("config_version = \"0.1\"\nbogus = 1\n").unwrap_err();
        assert!(err.to_string().contains("bogus"));
        let err = from_toml_str("config_version = \"0.1\"\n[framing]\ncs = 2\n").unwrap_err();
        assert!(err.to_string().contains("framing"));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(from_toml_str("config_version = \"0.1\"\n[decoder]\nmax_depth = 0\n").is_err());
    }

    #[test]
    fn test_from_reader() {
        let cfg = from_reader(FULL.as_bytes()).unwrap();
        assert_eq!(cfg.decoder.max_depth, 8);
    }
}
