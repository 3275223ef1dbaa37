use core::cmp::Ordering;
use core::fmt;

use crate::encoding::{Reader, Writer};
use crate::pdu::{ExceptionResponse, FunctionCode};
use crate::{DecodeError, EncodeError};

pub const MBAP_HEADER_LEN: usize = 7;
pub const MAX_PDU_LEN: usize = 253;
/// Capacity of a frame buffer able to hold any conformant request or response.
pub const MAX_FRAME_LEN: usize = MBAP_HEADER_LEN + MAX_PDU_LEN;
pub const FUNCTION_OFFSET: usize = MBAP_HEADER_LEN;
pub const PAYLOAD_OFFSET: usize = FUNCTION_OFFSET + 1;
/// Header, function code and at least one payload (or exception) byte.
pub const MIN_RESPONSE_LEN: usize = PAYLOAD_OFFSET + 1;

/// Header bytes not covered by the length field.
const LENGTH_PREFIX_LEN: usize = 6;

/// One buffer shared by the request encode and the response decode.
pub type FrameBuf = [u8; MAX_FRAME_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Length includes unit-id byte + PDU length.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.transaction_id)?;
        w.write_be_u16(self.protocol_id)?;
        w.write_be_u16(self.length)?;
        w.write_u8(self.unit_id)?;
        Ok(())
    }

    /// Parses the header fields as-is; matching against the request is done by
    /// [`match_response`].
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            transaction_id: r.read_be_u16()?,
            protocol_id: r.read_be_u16()?,
            length: r.read_be_u16()?,
            unit_id: r.read_u8()?,
        })
    }

    /// Total frame size the header declares, header included.
    pub const fn frame_end(&self) -> usize {
        self.length as usize + LENGTH_PREFIX_LEN
    }

    pub const fn tag(&self, function: u8) -> FrameTag {
        FrameTag {
            transaction_id: self.transaction_id,
            protocol_id: self.protocol_id,
            unit_id: self.unit_id,
            function,
        }
    }
}

/// The identifying fields of a frame: everything but the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameTag {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub unit_id: u8,
    pub function: u8,
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[tid {:#06x}, protocol {:#06x}, unit {:#04x}, function {:#04x}]",
            self.transaction_id, self.protocol_id, self.unit_id, self.function
        )
    }
}

/// Writes header and function code into `buf[..8]` for a request of
/// `frame_len` bytes whose payload is already staged at [`PAYLOAD_OFFSET`].
pub fn encode_request_header(
    buf: &mut [u8],
    transaction_id: u16,
    unit_id: u8,
    function: FunctionCode,
    frame_len: usize,
) -> Result<MbapHeader, EncodeError> {
    if frame_len < PAYLOAD_OFFSET {
        return Err(EncodeError::FrameTooShort(frame_len));
    }
    if frame_len > MAX_FRAME_LEN {
        return Err(EncodeError::FrameTooLong(frame_len));
    }
    let length: u16 = (frame_len - LENGTH_PREFIX_LEN)
        .try_into()
        .map_err(|_| EncodeError::ValueOutOfRange)?;

    let header = MbapHeader {
        transaction_id,
        protocol_id: 0,
        length,
        unit_id,
    };
    let mut w = Writer::new(buf);
    header.encode(&mut w)?;
    w.write_u8(function.as_u8())?;
    Ok(header)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Regular,
    Exception(ExceptionResponse),
}

/// Checks a response start against the request it answers.
///
/// `received` holds everything read so far and must contain at least
/// [`MIN_RESPONSE_LEN`] bytes.
pub fn match_response(
    request: &MbapHeader,
    function: FunctionCode,
    received: &[u8],
) -> Result<(MbapHeader, ResponseKind), DecodeError> {
    if received.len() < MIN_RESPONSE_LEN {
        return Err(DecodeError::UnexpectedEof);
    }
    let mut r = Reader::new(received);
    let header = MbapHeader::decode(&mut r)?;
    let function_byte = r.read_u8()?;

    let same_conversation = header.transaction_id == request.transaction_id
        && header.protocol_id == request.protocol_id
        && header.unit_id == request.unit_id;

    if same_conversation && function_byte == function.as_u8() {
        return Ok((header, ResponseKind::Regular));
    }
    if same_conversation && function_byte == function.exception_byte() {
        if received.len() != MIN_RESPONSE_LEN {
            return Err(DecodeError::ExceptionFrameSize(received.len()));
        }
        let exception = ExceptionResponse::from_bytes(function_byte, r.read_u8()?);
        return Ok((header, ResponseKind::Exception(exception)));
    }

    Err(DecodeError::HeaderMismatch {
        request: request.tag(function.as_u8()),
        response: header.tag(function_byte),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameProgress {
    Complete,
    /// The frame continues up to `end`; more reads are needed.
    Partial { end: usize },
}

/// Compares the declared frame length with what has been received.
pub fn reconcile_length(
    header: &MbapHeader,
    received: usize,
    capacity: usize,
) -> Result<FrameProgress, DecodeError> {
    let end = header.frame_end();
    match end.cmp(&received) {
        Ordering::Equal => Ok(FrameProgress::Complete),
        Ordering::Less => Err(DecodeError::ExceedsDeclaredLength { end, received }),
        Ordering::Greater if end > capacity => {
            Err(DecodeError::ExceedsFrameCapacity { end, capacity })
        }
        Ordering::Greater => Ok(FrameProgress::Partial { end }),
    }
}
