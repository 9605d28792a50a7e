//! Command bodies (`run`/`status`/`stop`/`logs`), each wrapped in
//! `info!`/`error!` tracing spans around its main branch. `tracing` is
//! used here rather than a plain logger since these commands run several
//! services concurrently and benefit from span-scoped structured logs.

pub mod logs;
pub mod run;
pub mod status;
pub mod stop;
