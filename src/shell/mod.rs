// Composition root for the recorded_events bounded context.
//
// Responsibilities
// - Instantiate the event log, the ingestion pump and the match query handler.
// - Serve the recording endpoint and tie every background task to one session's lifetime.

pub mod http;
pub mod session;
pub mod state;
