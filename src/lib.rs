// vyos-api - run commands on VyOS devices and wait for their output
//
// Commands are sent over the VyOS HTTP API and re-sent on a fixed interval
// until a set of wait_for conditionals holds on the output, or the retry
// budget runs out.

pub mod config;
pub mod executor;
pub mod modules;
pub mod output;
pub mod parser;
pub mod runtime;

pub use executor::{ApiClient, ApiConfig, CommandExecutor, PollResult, PollerConfig, RetryPoller};
pub use modules::{ApiCommandModule, CommandBatch};
pub use output::{PlayRecap, TaskResult, VyosError};
pub use parser::{parse_conditional, parse_task_file, Conditional, MatchPolicy, TaskParams};
pub use runtime::{evaluate, Response};

/// Version of the vyos-api tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::executor::{ApiClient, ApiConfig, CommandExecutor, PollerConfig, RetryPoller};
    pub use crate::modules::{parse_commands, ApiCommandModule, CommandBatch};
    pub use crate::output::{PlayRecap, TaskResult, VyosError};
    pub use crate::parser::{parse_conditional, parse_conditionals, MatchPolicy, TaskParams};
    pub use crate::runtime::{evaluate, Response};
}
