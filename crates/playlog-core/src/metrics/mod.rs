//! Observability events for playlog.
//!
//! Each event is a plain struct implementing [`events::InternalEvent`]; the
//! [`emit!`](crate::emit) macro records it through the `metrics` facade. No
//! exporter is installed here, so a run without a recorder costs nothing.

pub mod events;

/// Emit an internal event.
///
/// ```ignore
/// use playlog_core::emit;
/// use playlog_core::metrics::events::RowsWritten;
///
/// emit!(RowsWritten { count: 100, table: "songs".to_string() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
