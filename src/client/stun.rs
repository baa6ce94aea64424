//! Minimal STUN (RFC 5389) binding request codec.
//!
//! Only what a server-reflexive candidate needs: a binding request with no
//! attributes and the mapped address out of the success response.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

const BIND_REQUEST: u16 = 0x0001;
const BIND_RESPONSE: u16 = 0x0101;
const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
const MAGIC_COOKIE: u32 = 0x2112_A442;
const HEADER_LEN: usize = 20;

const FAMILY_V4: u8 = 0x01;
const FAMILY_V6: u8 = 0x02;

/// Transaction identifier of one request.
pub type TransactionId = [u8; 12];

/// Build a binding request, returning the message and its transaction id.
#[must_use]
pub fn binding_request() -> (Vec<u8>, TransactionId) {
    let txn_id: TransactionId = rand::random();
    let mut msg = Vec::with_capacity(HEADER_LEN);
    msg.extend_from_slice(&BIND_REQUEST.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg.extend_from_slice(&txn_id);
    (msg, txn_id)
}

/// Extract the mapped address from a binding success response.
///
/// Returns `None` for anything that is not a response to `txn_id`.
/// XOR-MAPPED-ADDRESS wins over MAPPED-ADDRESS when both are present.
#[must_use]
pub fn parse_binding_response(data: &[u8], txn_id: &TransactionId) -> Option<SocketAddr> {
    if data.len() < HEADER_LEN {
        return None;
    }
    let msg_type = u16::from_be_bytes([data[0], data[1]]);
    let msg_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let cookie = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if msg_type != BIND_RESPONSE || cookie != MAGIC_COOKIE || &data[8..HEADER_LEN] != txn_id {
        return None;
    }
    let end = HEADER_LEN + msg_len;
    if data.len() < end {
        return None;
    }

    let mut mapped = None;
    let mut xor_mapped = None;
    let mut pos = HEADER_LEN;
    while pos + 4 <= end {
        let attr_type = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let attr_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;
        if pos + attr_len > end {
            break;
        }
        let value = &data[pos..pos + attr_len];
        match attr_type {
            ATTR_MAPPED_ADDRESS => mapped = parse_address(value),
            ATTR_XOR_MAPPED_ADDRESS => xor_mapped = parse_xor_address(value, txn_id),
            _ => {}
        }
        // attributes are padded to 4 bytes
        pos += (attr_len + 3) & !3;
    }

    xor_mapped.or(mapped)
}

fn parse_address(data: &[u8]) -> Option<SocketAddr> {
    if data.len() < 4 {
        return None;
    }
    let port = u16::from_be_bytes([data[2], data[3]]);
    let ip = match data[1] {
        FAMILY_V4 => {
            let octets: [u8; 4] = data.get(4..8)?.try_into().ok()?;
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        FAMILY_V6 => {
            let octets: [u8; 16] = data.get(4..20)?.try_into().ok()?;
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

fn parse_xor_address(data: &[u8], txn_id: &TransactionId) -> Option<SocketAddr> {
    let plain = parse_address(data)?;
    let port = plain.port() ^ ((MAGIC_COOKIE >> 16) as u16);

    // IPv4 is XORed with the cookie; IPv6 with cookie + transaction id
    let mut key = [0u8; 16];
    key[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    key[4..].copy_from_slice(txn_id);

    let ip = match plain.ip() {
        IpAddr::V4(v4) => {
            let mut octets = v4.octets();
            octets.iter_mut().zip(key).for_each(|(b, k)| *b ^= k);
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        IpAddr::V6(v6) => {
            let mut octets = v6.octets();
            octets.iter_mut().zip(key).for_each(|(b, k)| *b ^= k);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };
    Some(SocketAddr::new(ip, port))
}
