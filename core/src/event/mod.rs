mod batch;
mod raw;

pub use batch::{
    ChunkInfo, DeliveryBatch, DomainEvent, EventMeta, FinalityStatus, TokenCreated, TokenUpgraded,
    Transfer,
};
pub use raw::{BlockHeader, BlockTimestamp, RawBlock, RawEvent, RawReceipt};
