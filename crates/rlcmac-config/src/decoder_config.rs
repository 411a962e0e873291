use rlcmac_csn::DecoderLimits;

/// Bounds on schema evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgDecoder {
    /// Maximum nesting of schema references
    pub max_depth: usize,
    /// Maximum number of elements in one repeated array
    pub max_array_elements: usize,
}

impl Default for CfgDecoder {
    fn default() -> Self {
        let limits = DecoderLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_array_elements: limits.max_array_elements,
        }
    }
}

impl CfgDecoder {
    pub fn validate(&self) -> Result<(), &str> {
        if self.max_depth == 0 {
            return Err("decoder.max_depth must be at least 1");
        }
        if self.max_array_elements == 0 {
            return Err("decoder.max_array_elements must be at least 1");
        }
        Ok(())
    }

    pub fn limits(&self) -> DecoderLimits {
        DecoderLimits {
            max_depth: self.max_depth,
            max_array_elements: self.max_array_elements,
        }
    }
}

/// Block framing behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgFraming {
    /// Align, decode and segment data blocks after the header
    pub decode_data_blocks: bool,
    /// Treat 1 and 2 octet uplink captures as access bursts
    pub accept_access_bursts: bool,
}

impl Default for CfgFraming {
    fn default() -> Self {
        Self {
            decode_data_blocks: true,
            accept_access_bursts: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Optional verbose log file
    pub debug_log: Option<String>,

    pub decoder: CfgDecoder,

    pub framing: CfgFraming,
}

impl DecoderConfig {
    /// Validate that all configuration fields hold usable values.
    pub fn validate(&self) -> Result<(), &str> {
        self.decoder.validate()?;
        if let Some(ref path) = self.debug_log {
            if path.is_empty() {
                return Err("debug_log must not be empty when given");
            }
        }
        Ok(())
    }
}
