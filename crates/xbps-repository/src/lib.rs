//! Repository pool: an ordered set of package indexes with the lookup
//! primitives the resolver consults (component C).

mod error;
mod index;
mod pool;
mod sync;

pub use error::{Error, Result};
pub use index::{parse_index, render_index};
pub use pool::{FindKind, Repository, RepositoryPool};
pub use sync::{sync_index, SyncReport};
