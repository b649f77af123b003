pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use memory::MemoryBackend;
pub use rest::RestBackend;
pub use traits::Backend;
pub use types::{
    decode_rows, decode_single, AuthSession, AuthUser, Embed, Filter, Order, Query, RowRange,
    Rows, Selection, SignUp,
};
