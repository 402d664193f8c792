//! Delivery modes layered over the synchronous fetch engine.
//!
//! Every mode reuses the same strategies and cursor lifecycle, so an
//! asynchronous fetch fails with exactly the error its blocking form would.

pub mod future;
pub mod reactive;
pub mod stream;


pub use future::{FetchHandle, Job, WorkerPool, default_pool};
pub use reactive::{Subscriber, Subscription};
pub use stream::{LazyRows, RowStream};
