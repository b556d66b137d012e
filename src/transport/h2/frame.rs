//! HTTP/2 frame wire format (RFC 7540 §4 and §6).
//!
//! Frame shapes and flag layouts are grounded on `examples/carllerche-h2/src/frame/{mod,ping,
//! headers}.rs`: a 9-byte header (24-bit length, 8-bit type, 8-bit flags, 31-bit stream id with
//! a reserved high bit) followed by a type-specific payload. PRIORITY and PUSH_PROMISE frames
//! are parsed just enough to skip past them (push is disabled via SETTINGS_ENABLE_PUSH=0 and
//! this client never sends a PRIORITY frame or stream dependency).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

pub(super) const FRAME_HEADER_LEN: usize = 9;
pub(super) const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024;
pub(super) const CLIENT_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

const KIND_DATA: u8 = 0x0;
const KIND_HEADERS: u8 = 0x1;
const KIND_PRIORITY: u8 = 0x2;
const KIND_RST_STREAM: u8 = 0x3;
const KIND_SETTINGS: u8 = 0x4;
const KIND_PUSH_PROMISE: u8 = 0x5;
const KIND_PING: u8 = 0x6;
const KIND_GOAWAY: u8 = 0x7;
const KIND_WINDOW_UPDATE: u8 = 0x8;
const KIND_CONTINUATION: u8 = 0x9;

const FLAG_END_STREAM: u8 = 0x1;
const FLAG_ACK: u8 = 0x1;
const FLAG_END_HEADERS: u8 = 0x4;
const FLAG_PADDED: u8 = 0x8;
const FLAG_PRIORITY: u8 = 0x20;

/// RFC 7540 §5.4: error codes carried by RST_STREAM and GOAWAY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ErrorCode {
    NoError,
    ProtocolError,
    InternalError,
    FlowControlError,
    SettingsTimeout,
    StreamClosed,
    FrameSizeError,
    RefusedStream,
    Cancel,
    CompressionError,
    ConnectError,
    EnhanceYourCalm,
    InadequateSecurity,
    Http11Required,
    Unknown(u32),
}

impl ErrorCode {
    fn from_wire(code: u32) -> Self {
        match code {
            0x0 => Self::NoError,
            0x1 => Self::ProtocolError,
            0x2 => Self::InternalError,
            0x3 => Self::FlowControlError,
            0x4 => Self::SettingsTimeout,
            0x5 => Self::StreamClosed,
            0x6 => Self::FrameSizeError,
            0x7 => Self::RefusedStream,
            0x8 => Self::Cancel,
            0x9 => Self::CompressionError,
            0xa => Self::ConnectError,
            0xb => Self::EnhanceYourCalm,
            0xc => Self::InadequateSecurity,
            0xd => Self::Http11Required,
            other => Self::Unknown(other),
        }
    }

    pub(super) fn to_wire(self) -> u32 {
        match self {
            Self::NoError => 0x0,
            Self::ProtocolError => 0x1,
            Self::InternalError => 0x2,
            Self::FlowControlError => 0x3,
            Self::SettingsTimeout => 0x4,
            Self::StreamClosed => 0x5,
            Self::FrameSizeError => 0x6,
            Self::RefusedStream => 0x7,
            Self::Cancel => 0x8,
            Self::CompressionError => 0x9,
            Self::ConnectError => 0xa,
            Self::EnhanceYourCalm => 0xb,
            Self::InadequateSecurity => 0xc,
            Self::Http11Required => 0xd,
            Self::Unknown(other) => other,
        }
    }
}

/// A known `SETTINGS` parameter identifier, RFC 7540 §6.5.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SettingId {
    HeaderTableSize,
    EnablePush,
    MaxConcurrentStreams,
    InitialWindowSize,
    MaxFrameSize,
    MaxHeaderListSize,
}

impl SettingId {
    fn from_wire(id: u16) -> Option<Self> {
        match id {
            0x1 => Some(Self::HeaderTableSize),
            0x2 => Some(Self::EnablePush),
            0x3 => Some(Self::MaxConcurrentStreams),
            0x4 => Some(Self::InitialWindowSize),
            0x5 => Some(Self::MaxFrameSize),
            0x6 => Some(Self::MaxHeaderListSize),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(super) enum Frame {
    Data {
        stream_id: u32,
        end_stream: bool,
        data: Bytes,
    },
    Headers {
        stream_id: u32,
        end_stream: bool,
        end_headers: bool,
        block: Bytes,
    },
    Continuation {
        stream_id: u32,
        end_headers: bool,
        block: Bytes,
    },
    RstStream {
        stream_id: u32,
        error_code: ErrorCode,
    },
    Settings {
        ack: bool,
        params: Vec<(SettingId, u32)>,
    },
    Ping {
        ack: bool,
        payload: [u8; 8],
    },
    GoAway {
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: Bytes,
    },
    WindowUpdate {
        stream_id: u32,
        increment: u32,
    },
    /// A frame kind this client doesn't act on (PRIORITY, PUSH_PROMISE) but still has to
    /// consume from the stream to stay framed correctly.
    Ignored,
}

pub(super) async fn read_frame<R>(reader: &mut R, max_frame_size: u32) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(Error::network)?;
    let length = u32::from_be_bytes([0, header[0], header[1], header[2]]);
    let kind = header[3];
    let flags = header[4];
    let stream_id = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) & 0x7fff_ffff;

    if length > max_frame_size {
        return Err(Error::protocol(format!(
            "frame of {length} bytes exceeds the negotiated {max_frame_size} byte max"
        )));
    }
    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await.map_err(Error::network)?;
    let mut payload = Bytes::from(payload);

    if flags & FLAG_PADDED != 0 && matches!(kind, KIND_DATA | KIND_HEADERS | KIND_PUSH_PROMISE) {
        if payload.is_empty() {
            return Err(Error::protocol("PADDED frame missing its pad-length octet"));
        }
        let pad_len = payload[0] as usize;
        payload.advance(1);
        if pad_len > payload.len() {
            return Err(Error::protocol("padding length exceeds frame payload"));
        }
        payload.truncate(payload.len() - pad_len);
    }

    match kind {
        KIND_DATA => Ok(Frame::Data {
            stream_id,
            end_stream: flags & FLAG_END_STREAM != 0,
            data: payload,
        }),
        KIND_HEADERS => {
            if flags & FLAG_PRIORITY != 0 {
                if payload.len() < 5 {
                    return Err(Error::protocol("HEADERS with PRIORITY flag too short"));
                }
                payload.advance(5);
            }
            Ok(Frame::Headers {
                stream_id,
                end_stream: flags & FLAG_END_STREAM != 0,
                end_headers: flags & FLAG_END_HEADERS != 0,
                block: payload,
            })
        }
        KIND_CONTINUATION => Ok(Frame::Continuation {
            stream_id,
            end_headers: flags & FLAG_END_HEADERS != 0,
            block: payload,
        }),
        KIND_RST_STREAM => {
            if payload.len() != 4 {
                return Err(Error::protocol("RST_STREAM payload must be 4 bytes"));
            }
            Ok(Frame::RstStream {
                stream_id,
                error_code: ErrorCode::from_wire(u32::from_be_bytes(payload[..4].try_into().unwrap())),
            })
        }
        KIND_SETTINGS => {
            if payload.len() % 6 != 0 {
                return Err(Error::protocol("SETTINGS payload must be a multiple of 6 bytes"));
            }
            let ack = flags & FLAG_ACK != 0;
            if ack && !payload.is_empty() {
                return Err(Error::protocol("SETTINGS ACK must carry no parameters"));
            }
            let mut params = Vec::with_capacity(payload.len() / 6);
            let mut rest = &payload[..];
            while rest.has_remaining() {
                let id = u16::from_be_bytes([rest[0], rest[1]]);
                let value = u32::from_be_bytes(rest[2..6].try_into().unwrap());
                rest.advance(6);
                if let Some(id) = SettingId::from_wire(id) {
                    params.push((id, value));
                }
            }
            Ok(Frame::Settings { ack, params })
        }
        KIND_PING => {
            if payload.len() != 8 {
                return Err(Error::protocol("PING payload must be 8 bytes"));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&payload);
            Ok(Frame::Ping {
                ack: flags & FLAG_ACK != 0,
                payload: buf,
            })
        }
        KIND_GOAWAY => {
            if payload.len() < 8 {
                return Err(Error::protocol("GOAWAY payload too short"));
            }
            let last_stream_id = u32::from_be_bytes(payload[..4].try_into().unwrap()) & 0x7fff_ffff;
            let error_code = ErrorCode::from_wire(u32::from_be_bytes(payload[4..8].try_into().unwrap()));
            Ok(Frame::GoAway {
                last_stream_id,
                error_code,
                debug_data: payload.slice(8..),
            })
        }
        KIND_WINDOW_UPDATE => {
            if payload.len() != 4 {
                return Err(Error::protocol("WINDOW_UPDATE payload must be 4 bytes"));
            }
            let increment = u32::from_be_bytes(payload[..4].try_into().unwrap()) & 0x7fff_ffff;
            Ok(Frame::WindowUpdate { stream_id, increment })
        }
        KIND_PRIORITY | KIND_PUSH_PROMISE => Ok(Frame::Ignored),
        other => Err(Error::protocol(format!("unsupported frame type {other:#x}"))),
    }
}

pub(super) async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(64);
    match frame {
        Frame::Data { stream_id, end_stream, data } => {
            write_header(&mut buf, data.len(), KIND_DATA, flag(*end_stream, FLAG_END_STREAM), *stream_id);
            buf.put_slice(data);
        }
        Frame::Headers {
            stream_id,
            end_stream,
            end_headers,
            block,
        } => {
            let flags = flag(*end_stream, FLAG_END_STREAM) | flag(*end_headers, FLAG_END_HEADERS);
            write_header(&mut buf, block.len(), KIND_HEADERS, flags, *stream_id);
            buf.put_slice(block);
        }
        Frame::Continuation { stream_id, end_headers, block } => {
            write_header(&mut buf, block.len(), KIND_CONTINUATION, flag(*end_headers, FLAG_END_HEADERS), *stream_id);
            buf.put_slice(block);
        }
        Frame::RstStream { stream_id, error_code } => {
            write_header(&mut buf, 4, KIND_RST_STREAM, 0, *stream_id);
            buf.put_u32(error_code.to_wire());
        }
        Frame::Settings { ack, params } => {
            let payload_len = params.len() * 6;
            write_header(&mut buf, payload_len, KIND_SETTINGS, flag(*ack, FLAG_ACK), 0);
            for (id, value) in params {
                buf.put_u16(setting_wire_id(*id));
                buf.put_u32(*value);
            }
        }
        Frame::Ping { ack, payload } => {
            write_header(&mut buf, 8, KIND_PING, flag(*ack, FLAG_ACK), 0);
            buf.put_slice(payload);
        }
        Frame::GoAway {
            last_stream_id,
            error_code,
            debug_data,
        } => {
            write_header(&mut buf, 8 + debug_data.len(), KIND_GOAWAY, 0, 0);
            buf.put_u32(*last_stream_id & 0x7fff_ffff);
            buf.put_u32(error_code.to_wire());
            buf.put_slice(debug_data);
        }
        Frame::WindowUpdate { stream_id, increment } => {
            write_header(&mut buf, 4, KIND_WINDOW_UPDATE, 0, *stream_id);
            buf.put_u32(*increment & 0x7fff_ffff);
        }
        Frame::Ignored => return Ok(()),
    }
    writer.write_all(&buf).await.map_err(Error::network)?;
    Ok(())
}

fn flag(set: bool, bit: u8) -> u8 {
    if set { bit } else { 0 }
}

fn write_header(dst: &mut BytesMut, payload_len: usize, kind: u8, flags: u8, stream_id: u32) {
    let len = payload_len as u32;
    dst.put_u8((len >> 16) as u8);
    dst.put_u8((len >> 8) as u8);
    dst.put_u8(len as u8);
    dst.put_u8(kind);
    dst.put_u8(flags);
    dst.put_u32(stream_id & 0x7fff_ffff);
}

fn setting_wire_id(id: SettingId) -> u16 {
    match id {
        SettingId::HeaderTableSize => 0x1,
        SettingId::EnablePush => 0x2,
        SettingId::MaxConcurrentStreams => 0x3,
        SettingId::InitialWindowSize => 0x4,
        SettingId::MaxFrameSize => 0x5,
        SettingId::MaxHeaderListSize => 0x6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_headers_frame() {
        let mut buf = Vec::new();
        let original = Frame::Headers {
            stream_id: 1,
            end_stream: true,
            end_headers: true,
            block: Bytes::from_static(b"hpack-bytes"),
        };
        write_frame(&mut buf, &original).await.unwrap();
        let mut cursor = &buf[..];
        let decoded = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        match decoded {
            Frame::Headers { stream_id, end_stream, end_headers, block } => {
                assert_eq!(stream_id, 1);
                assert!(end_stream);
                assert!(end_headers);
                assert_eq!(&block[..], b"hpack-bytes");
            }
            _ => panic!("expected Headers"),
        }
    }

    #[tokio::test]
    async fn rejects_frames_over_the_negotiated_max_size() {
        let mut buf = Vec::new();
        write_frame(
            &mut buf,
            &Frame::Data {
                stream_id: 3,
                end_stream: false,
                data: Bytes::from(vec![0u8; 100]),
            },
        )
        .await
        .unwrap();
        let mut cursor = &buf[..];
        let err = read_frame(&mut cursor, 16).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn settings_ack_carries_no_parameters() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Frame::Settings { ack: true, params: vec![] }).await.unwrap();
        let mut cursor = &buf[..];
        match read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.unwrap() {
            Frame::Settings { ack, params } => {
                assert!(ack);
                assert!(params.is_empty());
            }
            _ => panic!("expected Settings"),
        }
    }

    #[tokio::test]
    async fn window_update_masks_the_reserved_bit() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Frame::WindowUpdate { stream_id: 0, increment: 0x7fff_ffff }).await.unwrap();
        let mut cursor = &buf[..];
        match read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.unwrap() {
            Frame::WindowUpdate { increment, .. } => assert_eq!(increment, 0x7fff_ffff),
            _ => panic!("expected WindowUpdate"),
        }
    }
}
