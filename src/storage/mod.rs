mod call;
mod cursor;
mod error;
pub mod lookup;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use call::CallContext;
pub use cursor::{Cursor, CursorRow};
pub use error::{Cause, StorageError, StorageResult};
pub use lookup::{LookupKind, ANIMAL_TYPE, DOC_TYPE, LOOKUPS};
pub use sqlite::SqliteRepository;
pub use traits::{Batch, Record, RecordGetter, Repository, Statement, NOT_FOUND_ID};
