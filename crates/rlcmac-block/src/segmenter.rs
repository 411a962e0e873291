use core::fmt;

use serde::Serialize;

use rlcmac_core::{BitCursor, DecodeErr, let_field};

use crate::coding::CodingFamily;

/// Basic LI value announcing filler up to the end of the block
const GPRS_LI_FILLER: u8 = 63;
/// Enhanced LI value marking the first octet of the payload as the start of a new PDU
const EGPRS_LI_FRESH_START: u8 = 126;
/// Enhanced LI value announcing filler up to the end of the block
const EGPRS_LI_FILLER: u8 = 127;

const TLLI_OCTETS: usize = 4;

/// What a length indicator octet announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiMeaning {
    /// Value 0: the last PDU of the previous block ended exactly at its end
    PreviousFilled,
    /// A PDU segment of this many octets ends inside this block
    Length(usize),
    /// The first payload octet starts a new PDU
    FreshStart,
    /// Filler runs to the end of the block
    Filler,
}

/// One length indicator octet as found on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthIndicator {
    /// Position within the data area
    pub octet: usize,
    pub value: u8,
    /// M bit of the basic encoding, always set for the enhanced encoding which has none
    pub more: bool,
    /// E bit: set on the last indicator
    pub ext: bool,
    pub meaning: LiMeaning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    /// Ends a PDU inside this block
    Complete,
    /// Runs to the end of the block and continues in the next one
    Continuing,
    Filler,
}

/// Octet range of the data area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PduSegment {
    pub offset: usize,
    pub len: usize,
    pub kind: SegmentKind,
}

impl PduSegment {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.offset..self.end()).unwrap_or(&[])
    }
}

/// How the first payload octet of a block relates to earlier blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockStart {
    /// The first segment continues a PDU from an earlier block
    Continuation,
    /// The previous block ended a PDU exactly, a new PDU starts here
    PreviousFilled,
    /// A new PDU starts here
    FreshStart,
}

/// Successful segmentation of one data area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub start: BlockStart,
    pub indicators: Vec<LengthIndicator>,
    pub tlli: Option<u32>,
    pub pfi: Option<u8>,
    /// First octet after indicators, TLLI and PFI
    pub payload_offset: usize,
    pub segments: Vec<PduSegment>,
}

impl Segmentation {
    pub fn covered_len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbandonReason {
    /// The E bits announce more indicator octets than the data area holds
    IndicatorsTruncated,
    /// A reserved value appeared where it has no meaning
    MisplacedIndicator { octet: usize, value: u8 },
    /// A segment claims more octets than remain
    Overrun { octet: usize, len: usize, available: usize },
    /// TLLI or PFI do not fit after the indicators
    ExtrasOverrun,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::IndicatorsTruncated => write!(f, "length indicators run past the data area"),
            AbandonReason::MisplacedIndicator { octet, value } => {
                write!(f, "length indicator {} not allowed at octet {}", value, octet)
            }
            AbandonReason::Overrun { octet, len, available } => {
                write!(f, "length indicator at octet {} claims {} octets, {} available", octet, len, available)
            }
            AbandonReason::ExtrasOverrun => write!(f, "TLLI/PFI run past the data area"),
        }
    }
}

/// Outcome of one segmentation call. Abandoning keeps the indicators read so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SegmentOutcome {
    Segmented(Segmentation),
    Abandoned { reason: AbandonReason, indicators: Vec<LengthIndicator> },
}

impl SegmentOutcome {
    pub fn segmentation(&self) -> Option<&Segmentation> {
        match self {
            SegmentOutcome::Segmented(s) => Some(s),
            SegmentOutcome::Abandoned { .. } => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, SegmentOutcome::Abandoned { .. })
    }
}

/// Input of one segmentation call
#[derive(Debug, Clone, Copy)]
pub struct SegmentRequest<'a> {
    pub family: CodingFamily,
    /// Data area of one data block, indicators included
    pub data: &'a [u8],
    /// Header or data block head E bit: set when no indicators follow
    pub ext: bool,
    /// Uplink TI bit: a TLLI follows the indicators
    pub tlli: bool,
    /// Uplink PI bit: a PFI follows the indicators and the TLLI
    pub pfi: bool,
}

impl<'a> SegmentRequest<'a> {
    pub fn new(family: CodingFamily, data: &'a [u8], ext: bool) -> Self {
        SegmentRequest { family, data, ext, tlli: false, pfi: false }
    }

    pub fn with_extras(mut self, tlli: bool, pfi: bool) -> Self {
        self.tlli = tlli;
        self.pfi = pfi;
        self
    }
}

/// Splits a data area into PDU segments according to its length indicators.
/// Segments are contiguous and cover everything after indicators and extras, or the outcome is abandoned.
pub fn segment(req: &SegmentRequest<'_>) -> SegmentOutcome {
    let indicators = match read_indicators(req) {
        Ok(li) => li,
        Err(reason) => return abandon(reason, Vec::new()),
    };

    let mut pos = indicators.len();
    let (tlli, pfi) = match read_extras(req, &mut pos) {
        Ok(extras) => extras,
        Err(_) => return abandon(AbandonReason::ExtrasOverrun, indicators),
    };

    let walked = match req.family {
        CodingFamily::Gprs => walk_gprs(&indicators, pos, req.data.len()),
        CodingFamily::Egprs => walk_egprs(&indicators, pos, req.data.len()),
    };
    match walked {
        Ok((start, segments)) => {
            let seg = Segmentation { start, indicators, tlli, pfi, payload_offset: pos, segments };
            tracing::debug!(
                "{:?}: {} indicators, {} segments, {:?}",
                req.family,
                seg.indicators.len(),
                seg.segments.len(),
                seg.start
            );
            SegmentOutcome::Segmented(seg)
        }
        Err(reason) => abandon(reason, indicators),
    }
}

fn abandon(reason: AbandonReason, indicators: Vec<LengthIndicator>) -> SegmentOutcome {
    tracing::warn!("segmentation abandoned: {}", reason);
    SegmentOutcome::Abandoned { reason, indicators }
}

fn read_indicators(req: &SegmentRequest<'_>) -> Result<Vec<LengthIndicator>, AbandonReason> {
    let mut indicators = Vec::new();
    if req.ext {
        return Ok(indicators);
    }
    loop {
        let octet = indicators.len();
        let raw = *req.data.get(octet).ok_or(AbandonReason::IndicatorsTruncated)?;
        let li = match req.family {
            CodingFamily::Gprs => {
                let value = raw >> 2;
                let meaning = match value {
                    0 => LiMeaning::PreviousFilled,
                    GPRS_LI_FILLER => LiMeaning::Filler,
                    n => LiMeaning::Length(n as usize),
                };
                LengthIndicator { octet, value, more: (raw >> 1) & 1 == 1, ext: raw & 1 == 1, meaning }
            }
            CodingFamily::Egprs => {
                let value = raw >> 1;
                let meaning = match value {
                    0 => LiMeaning::PreviousFilled,
                    EGPRS_LI_FRESH_START => LiMeaning::FreshStart,
                    EGPRS_LI_FILLER => LiMeaning::Filler,
                    n => LiMeaning::Length(n as usize),
                };
                LengthIndicator { octet, value, more: true, ext: raw & 1 == 1, meaning }
            }
        };
        tracing::trace!("LI octet {}: {:#04x} {:?}", octet, raw, li.meaning);
        indicators.push(li);
        if li.ext {
            return Ok(indicators);
        }
    }
}

fn read_extras(req: &SegmentRequest<'_>, pos: &mut usize) -> Result<(Option<u32>, Option<u8>), DecodeErr> {
    let mut cursor = BitCursor::new(req.data.get(*pos..).unwrap_or(&[]));
    let tlli = if req.tlli {
        let_field!(cursor, tlli, 8 * TLLI_OCTETS);
        Some(tlli as u32)
    } else {
        None
    };
    let pfi = if req.pfi {
        let_field!(cursor, pfi, 7);
        cursor.skip(1, "e")?;
        Some(pfi as u8)
    } else {
        None
    };
    *pos += cursor.position() / 8;
    Ok((tlli, pfi))
}

/// Appends a complete segment of `len` octets at `*cursor`
fn take_complete(
    segments: &mut Vec<PduSegment>,
    li: &LengthIndicator,
    len: usize,
    cursor: &mut usize,
    end: usize,
) -> Result<(), AbandonReason> {
    let available = end - *cursor;
    if len > available {
        return Err(AbandonReason::Overrun { octet: li.octet, len, available });
    }
    segments.push(PduSegment { offset: *cursor, len, kind: SegmentKind::Complete });
    *cursor += len;
    Ok(())
}

fn walk_gprs(indicators: &[LengthIndicator], payload: usize, end: usize) -> Result<(BlockStart, Vec<PduSegment>), AbandonReason> {
    let mut start = BlockStart::Continuation;
    let mut segments = Vec::new();
    let mut cursor = payload;
    let mut more = true;

    for (i, li) in indicators.iter().enumerate() {
        let misplaced = AbandonReason::MisplacedIndicator { octet: li.octet, value: li.value };
        match li.meaning {
            LiMeaning::PreviousFilled if i == 0 => start = BlockStart::PreviousFilled,
            LiMeaning::Filler if i == 0 => {
                if indicators.len() > 1 {
                    return Err(misplaced);
                }
                more = false;
                break;
            }
            LiMeaning::Length(len) => take_complete(&mut segments, li, len, &mut cursor, end)?,
            _ => return Err(misplaced),
        }
        more = li.more;
    }

    if cursor < end {
        let kind = if more { SegmentKind::Continuing } else { SegmentKind::Filler };
        segments.push(PduSegment { offset: cursor, len: end - cursor, kind });
    }
    Ok((start, segments))
}

fn walk_egprs(indicators: &[LengthIndicator], payload: usize, end: usize) -> Result<(BlockStart, Vec<PduSegment>), AbandonReason> {
    let mut start = BlockStart::Continuation;
    let mut segments = Vec::new();
    let mut cursor = payload;
    let mut filler = false;

    for (i, li) in indicators.iter().enumerate() {
        let misplaced = AbandonReason::MisplacedIndicator { octet: li.octet, value: li.value };
        if filler {
            return Err(misplaced);
        }
        match li.meaning {
            LiMeaning::PreviousFilled if i == 0 => start = BlockStart::PreviousFilled,
            LiMeaning::FreshStart if i == 0 => start = BlockStart::FreshStart,
            LiMeaning::Filler => filler = true,
            LiMeaning::Length(len) => take_complete(&mut segments, li, len, &mut cursor, end)?,
            _ => return Err(misplaced),
        }
    }

    if cursor < end {
        let kind = if filler { SegmentKind::Filler } else { SegmentKind::Continuing };
        segments.push(PduSegment { offset: cursor, len: end - cursor, kind });
    }
    Ok((start, segments))
}

impl fmt::Display for SegmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentOutcome::Abandoned { reason, indicators } => {
                write!(f, "abandoned after {} indicators: {}", indicators.len(), reason)
            }
            SegmentOutcome::Segmented(seg) => {
                write!(f, "{:?}", seg.start)?;
                if let Some(tlli) = seg.tlli {
                    write!(f, ", TLLI {:#010x}", tlli)?;
                }
                if let Some(pfi) = seg.pfi {
                    write!(f, ", PFI {}", pfi)?;
                }
                for s in &seg.segments {
                    write!(f, "\n  {:?} octets {}..{}", s.kind, s.offset, s.end())?;
                }
                Ok(())
            }
        }
    }
}
