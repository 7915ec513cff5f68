mod account;
mod asset;
mod document;
mod inventory;
mod journal;
mod money;
mod payment;
mod rates;

pub use account::*;
pub use asset::*;
pub use document::*;
pub use inventory::*;
pub use journal::*;
pub use money::*;
pub use payment::*;
pub use rates::*;
