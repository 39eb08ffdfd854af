//! Integration tests: full agent cycles against an in-memory platform.

mod mock_platform;
mod reply_cycle;
mod spread_cycle;
