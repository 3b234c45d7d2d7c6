//! Wire transport: raw UDF/TCP byte translation to and from the
//! protocol-neutral `Question`/`QueryResult` pair (§4.9).
//!
//! This module owns no business logic. It is pure RFC 1035 encode/decode;
//! `query::QueryHandler` never sees wire bytes directly.

use crate::endpoint::RecordType;
use crate::error::Error;
use crate::query::{QType, Question, QueryResult};
use crate::zone::ResourceRecord;

const HEADER_LEN: usize = 12;
const MAX_POINTER_JUMPS: usize = 16;

/// Parsed DNS message header (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub fn is_query(&self) -> bool {
        self.flags & 0x8000 == 0
    }
}

fn record_type_to_qtype(value: u16) -> Option<QType> {
    match value {
        1 => Some(QType::Record(RecordType::A)),
        28 => Some(QType::Record(RecordType::Aaaa)),
        5 => Some(QType::Record(RecordType::Cname)),
        16 => Some(QType::Record(RecordType::Txt)),
        2 => Some(QType::Record(RecordType::Ns)),
        252 => Some(QType::Axfr),
        251 => Some(QType::Ixfr),
        _ => None,
    }
}

/// Wire-format qtype value for a record type (§4.9).
pub fn record_type_to_u16(rt: RecordType) -> u16 {
    match rt {
        RecordType::A => 1,
        RecordType::Aaaa => 28,
        RecordType::Cname => 5,
        RecordType::Txt => 16,
        RecordType::Ns => 2,
    }
}

/// Parses the 12-byte header (§4.9).
pub fn parse_header(buf: &[u8]) -> crate::Result<Header> {
    if buf.len() < HEADER_LEN {
        return Err(Error::format_error("message shorter than header length"));
    }
    Ok(Header {
        id: u16::from_be_bytes([buf[0], buf[1]]),
        flags: u16::from_be_bytes([buf[2], buf[3]]),
        qdcount: u16::from_be_bytes([buf[4], buf[5]]),
        ancount: u16::from_be_bytes([buf[6], buf[7]]),
        nscount: u16::from_be_bytes([buf[8], buf[9]]),
        arcount: u16::from_be_bytes([buf[10], buf[11]]),
    })
}

/// Parses a (possibly pointer-compressed) name starting at `offset`.
/// Returns the dotted, trailing-dot name and the offset immediately after
/// the name as it appeared in the original (non-jumped) stream.
pub fn parse_name(buf: &[u8], offset: usize) -> crate::Result<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor = offset;
    let mut end_offset: Option<usize> = None;
    let mut jumps = 0;

    loop {
        if cursor >= buf.len() {
            return Err(Error::format_error("name extends past end of message"));
        }
        let len = buf[cursor];

        if len == 0 {
            if end_offset.is_none() {
                end_offset = Some(cursor + 1);
            }
            break;
        }

        if len & 0xC0 == 0xC0 {
            if cursor + 1 >= buf.len() {
                return Err(Error::format_error("truncated compression pointer"));
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(Error::format_error("too many compression pointer jumps"));
            }
            if end_offset.is_none() {
                end_offset = Some(cursor + 2);
            }
            let pointer = (((len & 0x3F) as usize) << 8) | buf[cursor + 1] as usize;
            if pointer >= cursor {
                return Err(Error::format_error("compression pointer does not point backward"));
            }
            cursor = pointer;
            continue;
        }

        let len = len as usize;
        let start = cursor + 1;
        let stop = start + len;
        if stop > buf.len() {
            return Err(Error::format_error("label extends past end of message"));
        }
        let label = std::str::from_utf8(&buf[start..stop])
            .map_err(|_| Error::format_error("label is not valid utf-8"))?;
        labels.push(label.to_string());
        cursor = stop;
    }

    let name = if labels.is_empty() {
        ".".to_string()
    } else {
        format!("{}.", labels.join("."))
    };

    Ok((name.to_ascii_lowercase(), end_offset.unwrap_or(cursor)))
}

/// Parses the question section: exactly one question is accepted (§4.9).
pub fn parse_question(buf: &[u8]) -> crate::Result<Question> {
    let header = parse_header(buf)?;
    if header.qdcount != 1 {
        return Err(Error::format_error(format!(
            "unsupported qdcount {} (only single-question messages are accepted)",
            header.qdcount
        )));
    }

    let (name, offset) = parse_name(buf, HEADER_LEN)?;
    if offset + 4 > buf.len() {
        return Err(Error::format_error("question section truncated"));
    }
    let qtype_value = u16::from_be_bytes([buf[offset], buf[offset + 1]]);
    let qtype = record_type_to_qtype(qtype_value)
        .ok_or_else(|| Error::format_error(format!("unsupported qtype {qtype_value}")))?;

    Ok(Question {
        name,
        qtype,
        client_geo: None,
    })
}

/// Encodes a name without compression (responses here are small enough that
/// compression is an optimization, not a correctness requirement).
fn encode_name(buf: &mut Vec<u8>, name: &str) {
    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

fn encode_rr(buf: &mut Vec<u8>, rr: &ResourceRecord) {
    encode_name(buf, &rr.name);
    buf.extend_from_slice(&record_type_to_u16(rr.record_type).to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // class IN
    buf.extend_from_slice(&rr.ttl.to_be_bytes());

    let rdata = encode_rdata(rr);
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);
}

fn encode_rdata(rr: &ResourceRecord) -> Vec<u8> {
    match rr.record_type {
        RecordType::A => rr
            .target
            .parse::<std::net::Ipv4Addr>()
            .map(|ip| ip.octets().to_vec())
            .unwrap_or_default(),
        RecordType::Aaaa => rr
            .target
            .parse::<std::net::Ipv6Addr>()
            .map(|ip| ip.octets().to_vec())
            .unwrap_or_default(),
        RecordType::Cname | RecordType::Ns => {
            let mut out = Vec::new();
            encode_name(&mut out, &rr.target);
            out
        }
        RecordType::Txt => {
            let bytes = rr.target.as_bytes();
            let mut out = Vec::with_capacity(bytes.len() + 1);
            out.push(bytes.len().min(255) as u8);
            out.extend_from_slice(&bytes[..bytes.len().min(255)]);
            out
        }
    }
}

/// Serializes a response reusing the request id and question (§4.9).
pub fn encode_response(request_id: u16, question: &Question, qtype_value: u16, result: &QueryResult) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512);
    buf.extend_from_slice(&request_id.to_be_bytes());

    let mut flags: u16 = 0x8000; // QR=1 (response)
    flags |= 0x0400; // AA placeholder, corrected below
    if !result.authoritative {
        flags &= !0x0400;
    }
    flags |= (result.rcode as u16) & 0x000F;
    buf.extend_from_slice(&flags.to_be_bytes());

    buf.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    buf.extend_from_slice(&(result.answers.len() as u16).to_be_bytes());
    buf.extend_from_slice(&(result.authority.len() as u16).to_be_bytes());
    buf.extend_from_slice(&(result.additional.len() as u16).to_be_bytes());

    encode_name(&mut buf, &question.name);
    buf.extend_from_slice(&qtype_value.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // class IN

    for rr in &result.answers {
        encode_rr(&mut buf, rr);
    }
    for rr in &result.authority {
        encode_rr(&mut buf, rr);
    }
    for rr in &result.additional {
        encode_rr(&mut buf, rr);
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_query(name_labels: &[&str], qtype: u16) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[4] = 0;
        buf[5] = 1; // qdcount = 1
        for label in name_labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
        buf.extend_from_slice(&qtype.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf
    }

    #[test]
    fn parses_simple_question() {
        let buf = build_query(&["foo", "example", "com"], 1);
        let question = parse_question(&buf).unwrap();
        assert_eq!(question.name, "foo.example.com.");
        assert_eq!(question.qtype, QType::Record(RecordType::A));
    }

    #[test]
    fn rejects_short_header() {
        let buf = vec![0u8; 4];
        assert!(parse_header(&buf).is_err());
    }

    #[test]
    fn rejects_multi_question_messages() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[5] = 2; // qdcount = 2
        assert!(parse_question(&buf).is_err());
    }

    #[test]
    fn rejects_compression_pointer_loop() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[5] = 1;
        buf.push(0xC0);
        buf.push(HEADER_LEN as u8); // points at itself
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        assert!(parse_question(&buf).is_err());
    }

    #[test]
    fn encode_response_reuses_request_id() {
        let question = Question {
            name: "foo.example.com.".into(),
            qtype: QType::Record(RecordType::A),
            client_geo: None,
        };
        let result = QueryResult {
            rcode: 0,
            authoritative: true,
            answers: vec![],
            authority: vec![],
            additional: vec![],
        };
        let bytes = encode_response(0x1234, &question, 1, &result);
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 0x1234);
    }
}
