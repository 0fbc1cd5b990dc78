pub mod resp;

pub use resp::{Frame, FrameDecoder, RespParser, MAX_ARRAY_LEN, MAX_BULK_LEN};
