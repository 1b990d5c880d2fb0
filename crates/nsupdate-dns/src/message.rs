//! RFC 2136 message assembly
//!
//! Turns an [`UpdateTransaction`] into a wire-ready `Message`:
//!
//! - header: opcode UPDATE, recursion not desired, random ID
//! - zone section: one SOA question for the zone
//! - update section: a delete-all-RRsets directive for the owner name
//!   (class ANY, type ANY, TTL 0) followed by one A/AAAA insertion per
//!   address (class IN, configured TTL)
//! - additionals: the TSIG record, appended by [`sign`] when the
//!   transaction carries a signing request

use std::net::IpAddr;
use std::str::FromStr;

use hickory_client::rr::rdata::tsig::TsigAlgorithm as WireTsigAlgorithm;
use hickory_proto::op::{Message, MessageFinalizer, MessageType, OpCode, Query};
use hickory_proto::rr::dnssec::tsig::TSigner;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};

use nsupdate_core::config::TsigAlgorithm;
use nsupdate_core::transaction::{TsigRequest, UpdateTransaction};
use nsupdate_core::{Error, Result};

/// Assemble the unsigned update message for one transaction.
pub fn build_message(txn: &UpdateTransaction) -> Result<Message> {
    let zone = parse_name(&txn.zone)?;
    let name = parse_name(&txn.name)?;

    let mut message = Message::new();
    message
        .set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false);

    let mut query = Query::query(zone, RecordType::SOA);
    query.set_query_class(DNSClass::IN);
    message.add_query(query);

    let mut removal = Record::with(name.clone(), RecordType::ANY, 0);
    removal.set_dns_class(DNSClass::ANY);
    message.add_name_server(removal);

    for addr in &txn.addrs {
        let rdata = match addr {
            IpAddr::V4(v4) => RData::A((*v4).into()),
            IpAddr::V6(v6) => RData::AAAA((*v6).into()),
        };
        let mut record = Record::from_rdata(name.clone(), txn.ttl, rdata);
        record.set_dns_class(DNSClass::IN);
        message.add_name_server(record);
    }

    Ok(message)
}

/// Append the TSIG record for `request` to `message`.
///
/// The signature covers the message as assembled so far; nothing may be
/// added after this.
pub fn sign(message: &mut Message, request: &TsigRequest) -> Result<()> {
    let signer = TSigner::new(
        request.key.secret.clone(),
        wire_algorithm(request.key.algorithm),
        parse_name(&request.key.name)?,
        request.fudge,
    )
    .map_err(|e| Error::transport(format!("tsig signer: {e}")))?;

    // The TSIG time field is 48 bits on the wire, but the signer takes a
    // u32; refuse timestamps past 2106 rather than wrapping silently.
    let time_signed = u32::try_from(request.time_signed)
        .map_err(|_| Error::transport(format!("tsig timestamp out of range: {}", request.time_signed)))?;
    let (records, _verifier) = signer
        .finalize_message(message, time_signed)
        .map_err(|e| Error::transport(format!("tsig signing: {e}")))?;
    for record in records {
        message.add_additional(record);
    }
    Ok(())
}

fn wire_algorithm(algorithm: TsigAlgorithm) -> WireTsigAlgorithm {
    match algorithm {
        TsigAlgorithm::HmacSha1 => WireTsigAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha256 => WireTsigAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => WireTsigAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => WireTsigAlgorithm::HmacSha512,
    }
}

fn parse_name(name: &str) -> Result<Name> {
    Name::from_str(name).map_err(|e| Error::config(format!("invalid name {name}: {e}")))
}
