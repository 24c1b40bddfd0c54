pub mod aggregator;
pub mod export;
pub mod snapshot;
pub mod state;

pub use aggregator::ReportAggregator;
pub use export::{event_rows, render_json, render_preview, render_print_html, EventRow};
pub use snapshot::{sort_events_desc, AggregateReports, ReportPart, ReportSnapshot};
pub use state::{GenerationTicket, ReportPhase, ReportState};
