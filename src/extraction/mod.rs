//! Token extraction: stage table, sequencer, parsers and outcomes

pub mod machine;
pub mod outcome;
pub mod parsers;
pub mod plan;

pub use machine::{
    StageVerdict, TokenHarvest, UNKNOWN_NAME, await_stage, harvest_overview, harvest_token,
    harvest_trending, persist_harvest, process_token,
};
pub use outcome::{ItemOutcome, ItemStatus, PoolReport, StageFailure};
pub use parsers::{TokenOverview, parse_token_overview, parse_trader_links, parse_trader_metrics};
pub use plan::{ExtractionPlan, StageSpec, TimeoutPolicy, TraderField, TriggerSpec, UrlTemplate};
