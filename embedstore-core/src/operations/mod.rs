pub mod delete_item;
pub mod list_keys;
pub mod measure_size;
pub mod put_item;
pub mod read_item;

pub use delete_item::{DeleteItemOperation, DeleteItemOperationResult, FingerprintSource};
pub use list_keys::{KeyStream, ListKeysOperation};
pub use measure_size::{MeasureSizeOperation, total_size};
pub use put_item::{PutItemOperation, PutItemOperationRequest, PutItemOperationResult};
pub use read_item::{ReadItemOperation, Shard, StoredItem};
