/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Every message a node sends or receives, and their wire encoding.
//!
//! On the wire, a message is a one-byte [`MessageCode`] followed by the Borsh encoding of its body.
//! Framing, encryption, and the peer-to-peer handshake belong to the library user's transport, so the
//! codes of those messages are recognized, but not decoded.

use crate::{
    bft::types::{Proof, Proposal, Vote},
    types::{
        block::{Block, BlockHeader},
        codec::{decode, encode, DecodeError},
        transaction::Transaction,
    },
};

/// The first byte of every message on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    Disconnect = 0x00,
    Hello = 0x01,
    World = 0x02,
    Ping = 0x03,
    Pong = 0x04,
    GetNodes = 0x05,
    Nodes = 0x06,
    Transaction = 0x07,

    GetBlock = 0x30,
    Block = 0x31,
    GetBlockHeader = 0x32,
    BlockHeader = 0x33,

    BftNewHeight = 0x40,
    BftNewView = 0x41,
    BftProposal = 0x42,
    BftVote = 0x43,
}

impl MessageCode {
    pub fn of(byte: u8) -> Option<MessageCode> {
        let code = match byte {
            0x00 => MessageCode::Disconnect,
            0x01 => MessageCode::Hello,
            0x02 => MessageCode::World,
            0x03 => MessageCode::Ping,
            0x04 => MessageCode::Pong,
            0x05 => MessageCode::GetNodes,
            0x06 => MessageCode::Nodes,
            0x07 => MessageCode::Transaction,
            0x30 => MessageCode::GetBlock,
            0x31 => MessageCode::Block,
            0x32 => MessageCode::GetBlockHeader,
            0x33 => MessageCode::BlockHeader,
            0x40 => MessageCode::BftNewHeight,
            0x41 => MessageCode::BftNewView,
            0x42 => MessageCode::BftProposal,
            0x43 => MessageCode::BftVote,
            _ => return None,
        };
        Some(code)
    }

    pub const fn to_byte(self) -> u8 {
        self as u8
    }
}

/// All message variants handled by the library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Request for the block with the given number.
    GetBlock(u64),
    Block(Block),
    /// Request for the header of the block with the given number.
    GetBlockHeader(u64),
    BlockHeader(BlockHeader),

    /// Announces that the sender entered the given height, so its latest block is the one before.
    NewHeight(u64),
    /// Announces that the sender entered the view justified by the proof.
    NewView(Proof),
    Proposal(Proposal),
    Vote(Vote),

    Transaction(Transaction),
}

impl Message {
    pub fn code(&self) -> MessageCode {
        match self {
            Message::GetBlock(_) => MessageCode::GetBlock,
            Message::Block(_) => MessageCode::Block,
            Message::GetBlockHeader(_) => MessageCode::GetBlockHeader,
            Message::BlockHeader(_) => MessageCode::BlockHeader,
            Message::NewHeight(_) => MessageCode::BftNewHeight,
            Message::NewView(_) => MessageCode::BftNewView,
            Message::Proposal(_) => MessageCode::BftProposal,
            Message::Vote(_) => MessageCode::BftVote,
            Message::Transaction(_) => MessageCode::Transaction,
        }
    }

    /// The message code, followed by the encoding of the body.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.code().to_byte()];
        bytes.extend(match self {
            Message::GetBlock(number) => encode(number),
            Message::Block(block) => encode(block),
            Message::GetBlockHeader(number) => encode(number),
            Message::BlockHeader(header) => encode(header),
            Message::NewHeight(height) => encode(height),
            Message::NewView(proof) => encode(proof),
            Message::Proposal(proposal) => encode(proposal),
            Message::Vote(vote) => encode(vote),
            Message::Transaction(tx) => encode(tx),
        });
        bytes
    }

    /// Decode a message from its wire encoding, rejecting unknown codes, codes of messages the
    /// library does not handle, and bodies that are truncated or have trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
        let (code, body) = bytes.split_first().ok_or(DecodeError::Empty)?;
        let code = MessageCode::of(*code).ok_or(DecodeError::UnknownCode(*code))?;

        let message = match code {
            MessageCode::GetBlock => Message::GetBlock(decode(body)?),
            MessageCode::Block => Message::Block(decode(body)?),
            MessageCode::GetBlockHeader => Message::GetBlockHeader(decode(body)?),
            MessageCode::BlockHeader => Message::BlockHeader(decode(body)?),
            MessageCode::BftNewHeight => Message::NewHeight(decode(body)?),
            MessageCode::BftNewView => Message::NewView(decode(body)?),
            MessageCode::BftProposal => Message::Proposal(decode(body)?),
            MessageCode::BftVote => Message::Vote(decode(body)?),
            MessageCode::Transaction => Message::Transaction(decode(body)?),
            other => return Err(DecodeError::UnsupportedCode(other.to_byte())),
        };
        Ok(message)
    }

    /// Whether the message is processed by the consensus engine.
    pub fn is_bft(&self) -> bool {
        matches!(
            self,
            Message::NewHeight(_) | Message::NewView(_) | Message::Proposal(_) | Message::Vote(_)
        )
    }
}

impl From<Vote> for Message {
    fn from(vote: Vote) -> Self {
        Message::Vote(vote)
    }
}

impl From<Proposal> for Message {
    fn from(proposal: Proposal) -> Self {
        Message::Proposal(proposal)
    }
}

impl From<Proof> for Message {
    fn from(proof: Proof) -> Self {
        Message::NewView(proof)
    }
}

impl From<Transaction> for Message {
    fn from(tx: Transaction) -> Self {
        Message::Transaction(tx)
    }
}
