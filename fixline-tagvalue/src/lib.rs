/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Tag-Value
//!
//! FIX tag=value codec for the fixline session engine.
//!
//! This crate provides:
//! - **Decoding**: raw message text to an ordered [`Message`]
//! - **Encoding**: [`Message`] to wire bytes with fixed header order,
//!   computed BodyLength and CheckSum
//! - **Framing**: [`FrameDecoder`], which cuts a byte stream into complete,
//!   checksum-verified messages

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod frame;

pub use checksum::{calculate_checksum, checksum};
pub use decoder::{Decoder, SOH, decode};
pub use encoder::{Encoder, encode, encode_lenient};
pub use fixline_core::message::Message;
pub use frame::{DEFAULT_MAX_MESSAGE_SIZE, FrameDecoder, decode_frame, decode_frame_with_limit};
