//! Bot engines: market scan → quote → order, and mention → reply, plus the
//! polling loop that drives them.

pub mod agent;
pub mod executor;
pub mod responder;
pub mod scanner;
