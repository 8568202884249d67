/// Durable archive for classified samples
///
/// - `record`: the persisted row shape and sample defaulting
/// - `sink`: the `PersistenceSink` contract
/// - `sqlite`: SQLite-backed sink (data/power.db)
/// - `memory`: bounded in-process sink
pub mod memory;
pub mod record;
pub mod sink;
pub mod sqlite;

pub use memory::MemorySink;
pub use record::PowerRecord;
pub use sink::{persist_detached, PersistenceSink};
pub use sqlite::SqliteSink;
