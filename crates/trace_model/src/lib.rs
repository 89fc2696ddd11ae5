pub mod example;
pub mod result;
pub mod step;
pub mod value;

pub use example::TraceExample;
pub use result::{TraceResult, VerificationResult};
pub use step::{ComputeOp, Operand, Step, Trace};
pub use value::{DEFAULT_TOLERANCE, State, Value};
