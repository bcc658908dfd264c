//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `QuoteDispatcher`: generates, renders and delivers one letter
//! - `DailyTrigger` / `run_daily`: fires a dispatch once a day

pub mod dispatch;
pub mod schedule;

pub use dispatch::{
    DispatchError, DispatchLog, DispatchRecord, LetterRenderer, QuoteDispatcher, RenderError,
};
pub use schedule::{DailyTrigger, run_daily};
