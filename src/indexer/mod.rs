// Indexer module - THE READ MODEL
// Materializes browsable history from emitted events, eventually consistent

mod index;

pub use index::{feed, IndexedClaim, IndexedPacket, PacketIndex, PAGE_SIZE};
