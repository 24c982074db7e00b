/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Well-known tag numbers used by the session layer.

/// BeginSeqNo.
pub const BEGIN_SEQ_NO: u32 = 7;
/// BeginString (protocol version).
pub const BEGIN_STRING: u32 = 8;
/// BodyLength.
pub const BODY_LENGTH: u32 = 9;
/// CheckSum.
pub const CHECKSUM: u32 = 10;
/// EndSeqNo.
pub const END_SEQ_NO: u32 = 16;
/// MsgSeqNum.
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType.
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo.
pub const NEW_SEQ_NO: u32 = 36;
/// PossDupFlag.
pub const POSS_DUP_FLAG: u32 = 43;
/// RefSeqNum.
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID.
pub const SENDER_COMP_ID: u32 = 49;
/// SendingTime.
pub const SENDING_TIME: u32 = 52;
/// TargetCompID.
pub const TARGET_COMP_ID: u32 = 56;
/// Text.
pub const TEXT: u32 = 58;
/// EncryptMethod.
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt.
pub const HEART_BT_INT: u32 = 108;
/// TestReqID.
pub const TEST_REQ_ID: u32 = 112;
/// GapFillFlag.
pub const GAP_FILL_FLAG: u32 = 123;

/// Tags every inbound message must carry to be sequenced.
pub const REQUIRED_ENVELOPE: [u32; 5] = [
    MSG_SEQ_NUM,
    MSG_TYPE,
    SENDER_COMP_ID,
    TARGET_COMP_ID,
    SENDING_TIME,
];

/// Header tags the encoder places in its fixed block, in wire order.
pub const HEADER_ORDER: [u32; 5] = [
    MSG_TYPE,
    SENDING_TIME,
    SENDER_COMP_ID,
    TARGET_COMP_ID,
    MSG_SEQ_NUM,
];
