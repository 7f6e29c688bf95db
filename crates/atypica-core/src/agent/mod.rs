pub mod context;
pub mod invoker;

pub use context::{AgentRole, RunContext, RunScope};
pub use invoker::{AgentInvoker, AgentTurn, InvokeError, Invocation};
