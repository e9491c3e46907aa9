//! Typed records of the state blob, shared by import and `inspect`.

use serde::Serialize;

use super::wire::ByteReader;
use super::{INIT_DATA_VERSION, SANITY_BYTE};
use crate::command::sysex::opcode;
use crate::error::ProtocolError;
use crate::synth::{CHANNEL_COUNT, SEND_EFFECT_COUNT};

/// Stored controls of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRecord {
    pub volume: u8,
    pub pan: u8,
    pub noteoff_ignore: bool,
    pub on: bool,
    pub sends: [u8; SEND_EFFECT_COUNT],
    pub sample: Option<String>,
}

impl ChannelRecord {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, ProtocolError> {
        let volume = r.u8()?;
        let pan = r.u8()?;
        let noteoff_ignore = r.u8()? != 0;
        let on = r.u8()? != 0;
        let mut sends = [0; SEND_EFFECT_COUNT];
        for send in sends.iter_mut() {
            *send = r.u8()?;
        }
        let len = r.u8()?;
        let sample = if len > 0 {
            Some(r.sized_cstr(len)?)
        } else {
            None
        };
        Ok(Self {
            volume,
            pan,
            noteoff_ignore,
            on,
            sends,
            sample,
        })
    }
}

/// Stored plugin of one send-effect slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRecord {
    pub label: String,
    pub lib: String,
    pub return_ctrl: u8,
    pub params: Vec<u8>,
}

impl SlotRecord {
    /// `None` for an empty slot
    pub fn read(r: &mut ByteReader<'_>) -> Result<Option<Self>, ProtocolError> {
        let label_len = r.u8()?;
        if label_len == 0 {
            return Ok(None);
        }
        let label = r.sized_cstr(label_len)?;
        let lib_len = r.u8()?;
        let lib = r.sized_cstr(lib_len)?;
        let count = r.u8()? as usize;
        let return_ctrl = r.u8()?;
        let params = r.bytes(count)?.to_vec();
        Ok(Some(Self {
            label,
            lib,
            return_ctrl,
            params,
        }))
    }
}

/// Check the `[INIT_DATA, version]` header
pub fn read_header(r: &mut ByteReader<'_>) -> Result<(), ProtocolError> {
    let cmd = r.u8()?;
    if cmd != opcode::INIT_DATA {
        return Err(ProtocolError::NotInitData(cmd));
    }
    let version = r.u8()?;
    if version != INIT_DATA_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: INIT_DATA_VERSION,
            found: version,
        });
    }
    Ok(())
}

pub fn check_sanity(r: &mut ByteReader<'_>) -> Result<(), ProtocolError> {
    let sanity = r.u8()?;
    if sanity != SANITY_BYTE {
        return Err(ProtocolError::VersionMismatch {
            expected: SANITY_BYTE,
            found: sanity,
        });
    }
    Ok(())
}

/// Whole blob decoded without touching an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub channels: Vec<ChannelRecord>,
    pub master: u8,
    pub slots: Vec<Option<SlotRecord>>,
}

impl StateSummary {
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = ByteReader::new(data);
        read_header(&mut r)?;
        let channels = (0..CHANNEL_COUNT)
            .map(|_| ChannelRecord::read(&mut r))
            .collect::<Result<Vec<_>, _>>()?;
        let master = r.u8()?;
        check_sanity(&mut r)?;
        let slots = (0..SEND_EFFECT_COUNT)
            .map(|_| SlotRecord::read(&mut r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            channels,
            master,
            slots,
        })
    }
}
