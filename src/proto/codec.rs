use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io::{self},
    str,
};
use tokio_util::codec::{Decoder, Encoder};

use super::response::{Response, ResponsePayload};
use crate::proto::command::Command;
use crate::proto::ProtoError;

#[derive(Default)]
pub struct ProtocolCodec {
    last_cmd: Option<Command>,
}

impl ProtocolCodec {
    pub(crate) fn get_payload(src: &BytesMut) -> Option<Vec<u8>> {
        let offset = src.as_ref().iter().skip(2).position(|b| *b == b'\r');
        offset.map(|n| Vec::from(&src[2..n + 2]))
    }

    fn convert_string(payload: impl AsRef<[u8]>) -> std::io::Result<String> {
        Ok(str::from_utf8(payload.as_ref())
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
            .to_string())
    }
}

impl Decoder for ProtocolCodec {
    type Item = Response;
    // The low level protocol error type: receiving a SyntaxError or the
    // like is a successful decode here. Whether a non-success acknowledge
    // aborts the run is decided by the Device layer.
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() >= 2 {
            if (src[1] as char) != '\r' {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "Device acknowledge terminator expected",
                )
                .into());
            }
            match src[0] as char {
                '0' => {
                    // Success

                    match self.last_cmd {
                        Some(Command::SetBaudRate(_)) | Some(Command::RequestScreendump) => {
                            let _ = src.split_to(2);
                            Ok(Some(Response::Success(None)))
                        }
                        Some(Command::QueryMeasurement(_)) => {
                            if let Some(payload) = Self::get_payload(src) {
                                let line = Self::convert_string(&payload)?;
                                let _ = src.split_to(2 + payload.len() + 1);
                                Ok(Some(Response::Success(Some(
                                    ResponsePayload::Measurement(line),
                                ))))
                            } else {
                                Ok(None)
                            }
                        }
                        None => panic!("No command called"),
                    }
                }
                '1' => {
                    let _ = src.split_to(2);
                    Ok(Some(Response::SyntaxError))
                }
                '2' => {
                    let _ = src.split_to(2);
                    Ok(Some(Response::ExecutionError))
                }
                '3' => {
                    let _ = src.split_to(2);
                    Ok(Some(Response::SynchronizationError))
                }
                '4' => {
                    let _ = src.split_to(2);
                    Ok(Some(Response::CommunicationsError))
                }
                code => Err(ProtoError::UnknownAcknowledge(code)),
            }
        } else {
            Ok(None)
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for ProtocolCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &item {
            Command::QueryMeasurement(source) => {
                write_fmt_guarded(dst, format_args!("QM {}", source.query_code()))?
            }
            Command::SetBaudRate(rate) => write_fmt_guarded(dst, format_args!("PC {}", rate))?,
            Command::RequestScreendump => write_fmt_guarded(dst, format_args!("QP 0,3"))?,
        }
        dst.write_str("\r")
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.last_cmd = Some(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::command::Source;

    fn encoded(cmd: Command) -> Vec<u8> {
        let mut codec = ProtocolCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(cmd, &mut dst).expect("encode");
        dst.to_vec()
    }

    #[test]
    fn command_framing() {
        assert_eq!(encoded(Command::QueryMeasurement(Source::AMain)), b"QM 11\r");
        assert_eq!(encoded(Command::QueryMeasurement(Source::ASub)), b"QM 12\r");
        assert_eq!(encoded(Command::QueryMeasurement(Source::BMain)), b"QM 21\r");
        assert_eq!(encoded(Command::QueryMeasurement(Source::BSub)), b"QM 22\r");
        assert_eq!(encoded(Command::SetBaudRate(19200)), b"PC 19200\r");
        assert_eq!(encoded(Command::SetBaudRate(1200)), b"PC 1200\r");
        assert_eq!(encoded(Command::RequestScreendump), b"QP 0,3\r");
    }

    fn codec_after(cmd: Command) -> ProtocolCodec {
        let mut codec = ProtocolCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(cmd, &mut dst).expect("encode");
        codec
    }

    #[test]
    fn decode_measurement_payload() {
        let mut codec = codec_after(Command::QueryMeasurement(Source::AMain));
        let mut src = BytesMut::from(&b"0\r+123.4E-3\r"[..]);
        let response = codec.decode(&mut src).expect("decode");
        assert_eq!(
            response,
            Some(Response::Success(Some(ResponsePayload::Measurement(
                "+123.4E-3".to_string()
            ))))
        );
        assert!(src.is_empty());
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut codec = codec_after(Command::QueryMeasurement(Source::AMain));
        let mut src = BytesMut::from(&b"0\r+123"[..]);
        assert_eq!(codec.decode(&mut src).expect("decode"), None);
        // Remaining bytes stay buffered until the terminator arrives.
        src.extend_from_slice(b".4E-3\r");
        let response = codec.decode(&mut src).expect("decode");
        assert_eq!(
            response,
            Some(Response::Success(Some(ResponsePayload::Measurement(
                "+123.4E-3".to_string()
            ))))
        );
    }

    #[test]
    fn decode_bare_acknowledge() {
        let mut codec = codec_after(Command::SetBaudRate(19200));
        let mut src = BytesMut::from(&b"0\r"[..]);
        let response = codec.decode(&mut src).expect("decode");
        assert_eq!(response, Some(Response::Success(None)));
        assert!(src.is_empty());
    }

    #[test]
    fn decode_screendump_acknowledge_leaves_image_bytes() {
        let mut codec = codec_after(Command::RequestScreendump);
        let mut src = BytesMut::from(&b"0\rimage data follows"[..]);
        let response = codec.decode(&mut src).expect("decode");
        assert_eq!(response, Some(Response::Success(None)));
        assert_eq!(&src[..], b"image data follows");
    }

    #[test]
    fn decode_error_acknowledges() {
        for (ack, expected) in [
            (b'1', Response::SyntaxError),
            (b'2', Response::ExecutionError),
            (b'3', Response::SynchronizationError),
            (b'4', Response::CommunicationsError),
        ] {
            let mut codec = codec_after(Command::SetBaudRate(19200));
            let mut src = BytesMut::from(&[ack, b'\r'][..]);
            let response = codec.decode(&mut src).expect("decode");
            assert_eq!(response, Some(expected));
            assert!(src.is_empty());
        }
    }

    #[test]
    fn decode_unknown_acknowledge() {
        let mut codec = codec_after(Command::SetBaudRate(19200));
        let mut src = BytesMut::from(&b"9\r"[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtoError::UnknownAcknowledge('9'))
        ));
    }

    #[test]
    fn decode_missing_terminator() {
        let mut codec = codec_after(Command::SetBaudRate(19200));
        let mut src = BytesMut::from(&b"0X"[..]);
        assert!(matches!(codec.decode(&mut src), Err(ProtoError::Io(_))));
    }

    #[test]
    fn decode_short_input() {
        let mut codec = codec_after(Command::SetBaudRate(19200));
        let mut src = BytesMut::from(&b"0"[..]);
        assert_eq!(codec.decode(&mut src).expect("decode"), None);
    }
}
