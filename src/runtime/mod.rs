pub mod runtime_error;
pub mod session;
pub mod slots;
pub mod vm;

pub use session::{Session, Snapshot};
pub use vm::{Vm, VmConfig};
