//! Live sysex commands and GUI replies. Strings here are raw NUL-terminated;
//! the length-prefixed form only appears inside the state blob.

use crate::error::ProtocolError;
use crate::state::wire::{ByteReader, ByteWriter};

pub mod opcode {
    pub const LOAD_SAMPLE: u8 = 1;
    pub const LOAD_SAMPLE_OK: u8 = 2;
    pub const LOAD_SAMPLE_ERROR: u8 = 3;
    pub const CLEAR_SAMPLE: u8 = 4;
    pub const CLEAR_SAMPLE_OK: u8 = 5;
    pub const INIT_DATA: u8 = 6;
    pub const SEND_INIT_DATA: u8 = 7;
    pub const LOAD_SENDEFFECT: u8 = 8;
    pub const LOAD_SENDEFFECT_OK: u8 = 9;
    pub const CLEAR_SENDEFFECT: u8 = 10;
    pub const CLEAR_SENDEFFECT_OK: u8 = 11;
    pub const SET_PLUGIN_PARAMETER: u8 = 12;
    pub const SET_PLUGIN_PARAMETER_OK: u8 = 13;
    pub const ERROR_MESSAGE: u8 = 14;
    pub const GET_INIT_DATA: u8 = 15;
}

/// Inbound sysex command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysexCommand {
    LoadSample { channel: u8, filename: String },
    ClearSample { channel: u8 },
    /// Whole state blob, opcode byte included
    InitData(Vec<u8>),
    LoadSendEffect { slot: u8, lib: String, label: String },
    ClearSendEffect { slot: u8 },
    SetPluginParameter { slot: u8, parameter: u8, value: u8 },
    GetInitData,
}

impl SysexCommand {
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = ByteReader::new(data);
        let cmd = r.u8().map_err(|_| ProtocolError::Empty)?;
        let parsed = match cmd {
            opcode::LOAD_SAMPLE => SysexCommand::LoadSample {
                channel: r.u8()?,
                filename: r.cstr()?,
            },
            opcode::CLEAR_SAMPLE => SysexCommand::ClearSample { channel: r.u8()? },
            opcode::INIT_DATA => SysexCommand::InitData(data.to_vec()),
            opcode::LOAD_SENDEFFECT => SysexCommand::LoadSendEffect {
                slot: r.u8()?,
                lib: r.cstr()?,
                label: r.cstr()?,
            },
            opcode::CLEAR_SENDEFFECT => SysexCommand::ClearSendEffect { slot: r.u8()? },
            opcode::SET_PLUGIN_PARAMETER => SysexCommand::SetPluginParameter {
                slot: r.u8()?,
                parameter: r.u8()?,
                value: r.u8()?,
            },
            opcode::GET_INIT_DATA => SysexCommand::GetInitData,
            other => return Err(ProtocolError::UnknownCommand(other)),
        };
        Ok(parsed)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        match self {
            SysexCommand::LoadSample { channel, filename } => {
                w.u8(opcode::LOAD_SAMPLE).u8(*channel).cstr(filename);
            }
            SysexCommand::ClearSample { channel } => {
                w.u8(opcode::CLEAR_SAMPLE).u8(*channel);
            }
            SysexCommand::InitData(blob) => return blob.clone(),
            SysexCommand::LoadSendEffect { slot, lib, label } => {
                w.u8(opcode::LOAD_SENDEFFECT).u8(*slot).cstr(lib).cstr(label);
            }
            SysexCommand::ClearSendEffect { slot } => {
                w.u8(opcode::CLEAR_SENDEFFECT).u8(*slot);
            }
            SysexCommand::SetPluginParameter {
                slot,
                parameter,
                value,
            } => {
                w.u8(opcode::SET_PLUGIN_PARAMETER)
                    .u8(*slot)
                    .u8(*parameter)
                    .u8(*value);
            }
            SysexCommand::GetInitData => {
                w.u8(opcode::GET_INIT_DATA);
            }
        }
        w.finish()
    }
}

/// Outbound sysex reply to the GUI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysexReply {
    SampleLoaded { ok: bool, channel: u8, filename: String },
    SampleCleared { channel: u8 },
    /// State blob answering a GetInitData request
    InitData(Vec<u8>),
    SendEffectLoaded { slot: u8, plugin_index: u8 },
    SendEffectCleared { slot: u8 },
    PluginParameter { slot: u8, parameter: u8, value: u8 },
    Error(String),
}

impl SysexReply {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        match self {
            SysexReply::SampleLoaded {
                ok,
                channel,
                filename,
            } => {
                let cmd = if *ok {
                    opcode::LOAD_SAMPLE_OK
                } else {
                    opcode::LOAD_SAMPLE_ERROR
                };
                w.u8(cmd).u8(*channel).cstr(filename);
            }
            SysexReply::SampleCleared { channel } => {
                w.u8(opcode::CLEAR_SAMPLE_OK).u8(*channel);
            }
            SysexReply::InitData(blob) => {
                w.u8(opcode::SEND_INIT_DATA).bytes(blob);
            }
            SysexReply::SendEffectLoaded { slot, plugin_index } => {
                w.u8(opcode::LOAD_SENDEFFECT_OK).u8(*slot).u8(*plugin_index);
            }
            SysexReply::SendEffectCleared { slot } => {
                w.u8(opcode::CLEAR_SENDEFFECT_OK).u8(*slot);
            }
            SysexReply::PluginParameter {
                slot,
                parameter,
                value,
            } => {
                w.u8(opcode::SET_PLUGIN_PARAMETER_OK)
                    .u8(*slot)
                    .u8(*parameter)
                    .u8(*value);
            }
            SysexReply::Error(text) => {
                w.u8(opcode::ERROR_MESSAGE).cstr(text);
            }
        }
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_sample_without_length_prefix() {
        let msg = b"\x01\x05kick.wav\0";
        assert_eq!(
            SysexCommand::parse(msg),
            Ok(SysexCommand::LoadSample {
                channel: 5,
                filename: "kick.wav".into()
            })
        );
    }

    #[test]
    fn parses_load_send_effect_strings_in_order() {
        let msg = b"\x08\x02kitsynth\0reverb\0";
        assert_eq!(
            SysexCommand::parse(msg),
            Ok(SysexCommand::LoadSendEffect {
                slot: 2,
                lib: "kitsynth".into(),
                label: "reverb".into()
            })
        );
    }

    #[test]
    fn encoded_commands_parse_back() {
        let commands = [
            SysexCommand::ClearSample { channel: 9 },
            SysexCommand::ClearSendEffect { slot: 1 },
            SysexCommand::SetPluginParameter {
                slot: 3,
                parameter: 2,
                value: 90,
            },
            SysexCommand::GetInitData,
        ];
        for cmd in commands {
            assert_eq!(SysexCommand::parse(&cmd.encode()), Ok(cmd));
        }
    }

    #[test]
    fn init_data_keeps_whole_message() {
        let msg = [opcode::INIT_DATA, 1, 100, 64];
        assert_eq!(
            SysexCommand::parse(&msg),
            Ok(SysexCommand::InitData(msg.to_vec()))
        );
    }

    #[test]
    fn malformed_messages_are_rejected() {
        assert_eq!(SysexCommand::parse(&[]), Err(ProtocolError::Empty));
        assert_eq!(SysexCommand::parse(&[99]), Err(ProtocolError::UnknownCommand(99)));
        assert_eq!(
            SysexCommand::parse(&[opcode::SET_PLUGIN_PARAMETER, 0, 1]),
            Err(ProtocolError::Truncated(3))
        );
        assert_eq!(
            SysexCommand::parse(b"\x01\x00no-terminator"),
            Err(ProtocolError::Unterminated(2))
        );
    }

    #[test]
    fn replies_use_their_own_opcodes() {
        assert_eq!(
            SysexReply::SampleLoaded {
                ok: false,
                channel: 4,
                filename: "x".into()
            }
            .encode(),
            vec![opcode::LOAD_SAMPLE_ERROR, 4, b'x', 0]
        );
        assert_eq!(
            SysexReply::InitData(vec![opcode::INIT_DATA, 1]).encode(),
            vec![opcode::SEND_INIT_DATA, opcode::INIT_DATA, 1]
        );
        assert_eq!(
            SysexReply::Error("boom".into()).encode(),
            vec![opcode::ERROR_MESSAGE, b'b', b'o', b'o', b'm', 0]
        );
    }
}
